use chrono::SubsecRound;
use tracing::info;
use uuid::Uuid;

use gatehouse_core::{AppError, AppResult, NonEmptyString, PrincipalId};
use gatehouse_domain::{AccessRequest, AccessRequestStatus, RequestContext, Role, Scope};

use crate::security_admin_ports::{
    AccessRequestQuery, ReviewAccessRequestInput, ReviewTransition, SubmitAccessRequestInput,
};

use super::{SecurityAdminService, clamp_limit, optional_resource_id};

impl SecurityAdminService {
    /// Files a pending access request on behalf of the actor.
    ///
    /// Submission is self-service and not gated on `administer`; the outcome
    /// is audited either way.
    pub async fn submit_access_request(
        &self,
        actor: &PrincipalId,
        input: SubmitAccessRequestInput,
        context: &RequestContext,
    ) -> AppResult<AccessRequest> {
        const OPERATION: &str = "submit_access_request";

        let scope_type = input.scope_type;
        let scope_id = input.scope_id.clone();
        let result = self.insert_access_request(actor, input).await;

        self.record_administer_outcome(
            actor,
            scope_type,
            scope_id,
            OPERATION,
            result.as_ref().err(),
            context,
        )
        .await;
        result
    }

    /// Approves or rejects a pending access request.
    ///
    /// The reviewer must personally hold ADMIN or higher at the request's
    /// scope at review time. Of concurrent reviews exactly one succeeds; the
    /// others fail with `AlreadyReviewed`.
    pub async fn review_access_request(
        &self,
        actor: &PrincipalId,
        request_id: Uuid,
        input: ReviewAccessRequestInput,
        context: &RequestContext,
    ) -> AppResult<AccessRequest> {
        const OPERATION: &str = "review_access_request";

        let lookup = self.load_access_request(request_id).await;
        let request = self
            .finish(actor, &Scope::Global, OPERATION, context, lookup)
            .await?;

        let scope = self
            .require_administer(
                actor,
                request.scope.scope_type(),
                request.scope.scope_id(),
                OPERATION,
                context,
            )
            .await?;

        let result = self.apply_review(actor, request, input).await;
        self.finish(actor, &scope, OPERATION, context, result).await
    }

    /// Lists access requests.
    ///
    /// Listing one's own requests is always allowed.
    pub async fn list_access_requests(
        &self,
        actor: &PrincipalId,
        query: AccessRequestQuery,
        context: &RequestContext,
    ) -> AppResult<Vec<AccessRequest>> {
        let own_rows = query.requester_id.as_deref() == Some(actor.as_str());
        self.require_listing(
            actor,
            own_rows,
            query.scope.as_ref(),
            "list_access_requests",
            context,
        )
        .await?;

        self.repository
            .list_access_requests(&AccessRequestQuery {
                limit: clamp_limit(query.limit),
                ..query
            })
            .await
    }

    async fn insert_access_request(
        &self,
        actor: &PrincipalId,
        input: SubmitAccessRequestInput,
    ) -> AppResult<AccessRequest> {
        let scope = Scope::from_parts(input.scope_type, input.scope_id.as_deref())?;
        let justification = NonEmptyString::new(input.justification)?;
        let resource_id = optional_resource_id(input.resource_id)?;

        let now = self.authorization_service.clock().now();
        let expires_at = input
            .expires_at
            .unwrap_or(now + self.authorization_service.config().access_request_ttl)
            .trunc_subsecs(6);
        if expires_at <= now {
            return Err(AppError::Validation(
                "access request expiry must be in the future".to_owned(),
            ));
        }

        let request = AccessRequest {
            request_id: Uuid::new_v4(),
            requester_id: actor.to_string(),
            resource: input.resource,
            action: input.action,
            resource_id,
            scope,
            justification: justification.into(),
            requested_at: now,
            status: AccessRequestStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            review_reason: None,
            expires_at,
        };
        self.repository.insert_access_request(&request).await?;

        info!(
            actor = %actor,
            request_id = %request.request_id,
            action = %request.action,
            resource = %request.resource,
            scope = %request.scope,
            "access request submitted"
        );
        Ok(request)
    }

    async fn apply_review(
        &self,
        actor: &PrincipalId,
        request: AccessRequest,
        input: ReviewAccessRequestInput,
    ) -> AppResult<AccessRequest> {
        if request.requester_id == actor.as_str() {
            return Err(AppError::Forbidden(
                "requesters cannot review their own access request".to_owned(),
            ));
        }

        let held = self
            .authorization_service
            .held_rights(actor.as_str(), &request.scope)
            .await?;
        if !held.holds_role_at_least(Role::Admin) {
            return Err(AppError::Forbidden(format!(
                "reviewer '{actor}' must hold ADMIN or higher at {}",
                request.scope
            )));
        }

        let now = held.as_of();
        ensure_reviewable(&request, now)?;

        let transition = ReviewTransition {
            status: input.decision.target_status(),
            reviewed_by: actor.to_string(),
            reviewed_at: now,
            review_reason: input
                .reason
                .map(|reason| reason.trim().to_owned())
                .filter(|reason| !reason.is_empty()),
        };

        match self
            .repository
            .apply_review_transition(request.request_id, &transition)
            .await?
        {
            Some(reviewed) => {
                info!(
                    actor = %actor,
                    request_id = %reviewed.request_id,
                    status = %reviewed.status,
                    "access request reviewed"
                );
                Ok(reviewed)
            }
            None => {
                let current = self.load_access_request(request.request_id).await?;
                ensure_reviewable(&current, now)?;
                Err(AppError::AlreadyReviewed(format!(
                    "access request '{}' was reviewed concurrently",
                    request.request_id
                )))
            }
        }
    }

    async fn load_access_request(&self, request_id: Uuid) -> AppResult<AccessRequest> {
        self.repository
            .find_access_request(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("access request '{request_id}' does not exist")))
    }
}

fn ensure_reviewable(request: &AccessRequest, now: chrono::DateTime<chrono::Utc>) -> AppResult<()> {
    match request.status {
        AccessRequestStatus::Pending if request.expires_at <= now => Err(AppError::Conflict(
            format!("access request '{}' expired before review", request.request_id),
        )),
        AccessRequestStatus::Pending => Ok(()),
        AccessRequestStatus::Approved | AccessRequestStatus::Rejected => {
            Err(AppError::AlreadyReviewed(format!(
                "access request '{}' is already {}",
                request.request_id, request.status
            )))
        }
    }
}
