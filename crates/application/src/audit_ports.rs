use async_trait::async_trait;
use gatehouse_core::AppResult;
use gatehouse_domain::{PermissionAuditEntry, PermissionAuditRecord};
use serde::{Deserialize, Serialize};

/// Cursor query over the durable audit stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStreamQuery {
    /// Only records with a greater sequence are returned.
    pub after_sequence: i64,
    /// Maximum rows returned.
    pub limit: usize,
    /// Optional principal filter.
    pub user_id: Option<String>,
    /// Optional outcome filter.
    pub allowed: Option<bool>,
}

impl Default for AuditStreamQuery {
    fn default() -> Self {
        Self {
            after_sequence: 0,
            limit: 100,
            user_id: None,
            allowed: None,
        }
    }
}

/// Repository port for the durable, append-only permission audit log.
#[async_trait]
pub trait PermissionAuditRepository: Send + Sync {
    /// Appends one entry to the hash chain.
    ///
    /// Returns `false` when an entry with the same audit id is already stored.
    async fn append_audit(&self, entry: &PermissionAuditEntry) -> AppResult<bool>;

    /// Lists records in ascending sequence order.
    async fn list_audits(&self, query: &AuditStreamQuery) -> AppResult<Vec<PermissionAuditRecord>>;
}
