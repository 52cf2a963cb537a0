use std::time::Duration;

use chrono::TimeDelta;
use gatehouse_core::{AppError, AppResult};

/// Tunables for evaluation deadlines and grant lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationConfig {
    /// Upper bound for one resource metadata lookup.
    pub metadata_lookup_timeout: Duration,
    /// Upper bound for a whole evaluation, and for one durable audit write.
    pub evaluation_timeout: Duration,
    /// Lifetime of an access request when the requester gives no expiry.
    pub access_request_ttl: TimeDelta,
    /// Longest lifetime a delegation may be created with.
    pub max_delegation_ttl: TimeDelta,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            metadata_lookup_timeout: Duration::from_millis(250),
            evaluation_timeout: Duration::from_secs(2),
            access_request_ttl: TimeDelta::days(7),
            max_delegation_ttl: TimeDelta::days(30),
        }
    }
}

impl AuthorizationConfig {
    /// Validates the configuration and returns it unchanged.
    pub fn validated(self) -> AppResult<Self> {
        if self.metadata_lookup_timeout.is_zero() || self.evaluation_timeout.is_zero() {
            return Err(AppError::Validation(
                "authorization timeouts must be greater than zero".to_owned(),
            ));
        }

        if self.metadata_lookup_timeout > self.evaluation_timeout {
            return Err(AppError::Validation(
                "metadata lookup timeout must not exceed the evaluation timeout".to_owned(),
            ));
        }

        if self.access_request_ttl <= TimeDelta::zero() || self.max_delegation_ttl <= TimeDelta::zero()
        {
            return Err(AppError::Validation(
                "access request and delegation lifetimes must be positive".to_owned(),
            ));
        }

        Ok(self)
    }
}
