use gatehouse_core::{AppResult, PrincipalId};
use gatehouse_domain::{
    Action, PermissionAuditRecord, RequestContext, ResourceKind, ResourceRef,
};

use crate::AuditStreamQuery;

use super::SecurityAdminService;

impl SecurityAdminService {
    /// Reads one page of the audit stream for a principal allowed to read the audit log.
    pub async fn export_audit_stream(
        &self,
        actor: &PrincipalId,
        query: AuditStreamQuery,
        context: &RequestContext,
    ) -> AppResult<Vec<PermissionAuditRecord>> {
        self.authorization_service
            .require(
                actor,
                Action::Read,
                &ResourceRef::kind_only(ResourceKind::AuditLog),
                context,
            )
            .await?;

        self.authorization_service
            .audit_logger()
            .export(query)
            .await
    }
}
