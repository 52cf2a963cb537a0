use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatehouse_core::AppResult;
use gatehouse_domain::{GrantSnapshot, ScopeChain};

/// Repository port for reading grants at evaluation time.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Loads every grant row of a principal within the chain from one read snapshot.
    ///
    /// Implementations may pre-filter on `as_of`; resolution re-checks expiry
    /// against the same instant.
    async fn load_grant_snapshot(
        &self,
        principal: &str,
        chain: &ScopeChain,
        as_of: DateTime<Utc>,
    ) -> AppResult<GrantSnapshot>;
}
