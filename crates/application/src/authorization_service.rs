use std::sync::Arc;

use crate::{AuditLogger, AuthorizationConfig, AuthorizationRepository, Clock, ScopeResolver};

mod evaluate;
mod held_rights;

pub use held_rights::HeldRights;

pub(crate) use evaluate::raw_scope_resource;

/// Permission evaluator: the single entry point gating every operation.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn AuthorizationRepository>,
    scope_resolver: ScopeResolver,
    audit_logger: AuditLogger,
    clock: Arc<dyn Clock>,
    config: AuthorizationConfig,
}

impl AuthorizationService {
    /// Creates an evaluator from its collaborators.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AuthorizationRepository>,
        scope_resolver: ScopeResolver,
        audit_logger: AuditLogger,
        clock: Arc<dyn Clock>,
        config: AuthorizationConfig,
    ) -> Self {
        Self {
            repository,
            scope_resolver,
            audit_logger,
            clock,
            config,
        }
    }

    /// Returns the audit logger every decision is recorded through.
    #[must_use]
    pub fn audit_logger(&self) -> &AuditLogger {
        &self.audit_logger
    }

    /// Returns the clock used for expiry comparisons.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> AuthorizationConfig {
        self.config
    }
}
