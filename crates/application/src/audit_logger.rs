use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{
    AUDIT_GENESIS_HASH, AuditChainVerification, AuditId, PermissionAuditEntry,
    PermissionAuditRecord, verify_audit_chain,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{AuditStreamQuery, PermissionAuditRepository};

const MAX_EXPORT_LIMIT: usize = 1000;

/// Health signal of the audit pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuditHealth {
    /// Set while the durable store is rejecting writes.
    pub degraded: bool,
    /// Entries waiting in the fallback queue.
    pub pending: usize,
    /// Entries the durable store refused permanently.
    pub dead_lettered: usize,
}

/// Append-only audit logger with an in-process fallback queue.
///
/// `record` never fails the caller. Entries the durable store rejects are
/// queued and delivered at least once by `replay_pending`; the store drops
/// duplicates by audit id. A `Validation` error from the store marks an entry
/// it can never accept: that entry moves to the dead-letter list instead of
/// blocking the queue.
#[derive(Clone)]
pub struct AuditLogger {
    state: Arc<AuditLoggerState>,
}

struct AuditLoggerState {
    repository: Arc<dyn PermissionAuditRepository>,
    write_timeout: Duration,
    pending: Mutex<VecDeque<PermissionAuditEntry>>,
    dead_letters: Mutex<Vec<PermissionAuditEntry>>,
    degraded: AtomicBool,
    replay_lock: tokio::sync::Mutex<()>,
}

impl AuditLogger {
    /// Creates a logger over the durable audit repository.
    #[must_use]
    pub fn new(repository: Arc<dyn PermissionAuditRepository>, write_timeout: Duration) -> Self {
        Self {
            state: Arc::new(AuditLoggerState {
                repository,
                write_timeout,
                pending: Mutex::new(VecDeque::new()),
                dead_letters: Mutex::new(Vec::new()),
                degraded: AtomicBool::new(false),
                replay_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Records one entry and returns its audit id.
    ///
    /// While older entries are still queued, new entries join the queue so
    /// the durable order follows the recording order.
    pub async fn record(&self, entry: PermissionAuditEntry) -> AuditId {
        let audit_id = entry.audit_id;

        if self.pending_len() > 0 {
            self.enqueue(entry);
            return audit_id;
        }

        match self.append(&entry).await {
            Ok(()) => {}
            Err(error) if is_permanent(&error) => self.dead_letter(entry, &error),
            Err(error) => {
                warn!(
                    audit_id = %audit_id,
                    user_id = %entry.user_id,
                    error = %error,
                    "durable audit write failed, queueing entry"
                );
                self.enqueue(entry);
            }
        }

        audit_id
    }

    /// Drains the fallback queue in order and returns the number of delivered entries.
    ///
    /// Stops at the first transient failure and leaves the rest queued.
    /// Entries the store refuses permanently are dead-lettered and skipped.
    pub async fn replay_pending(&self) -> usize {
        let _guard = self.state.replay_lock.lock().await;
        let mut replayed = 0;

        loop {
            let Some(entry) = self.lock_pending().front().cloned() else {
                break;
            };

            let delivered = match self.append(&entry).await {
                Ok(()) => true,
                Err(error) if is_permanent(&error) => {
                    self.dead_letter(entry.clone(), &error);
                    false
                }
                Err(error) => {
                    warn!(
                        audit_id = %entry.audit_id,
                        replayed,
                        error = %error,
                        "audit replay stopped"
                    );
                    return replayed;
                }
            };

            let mut pending = self.lock_pending();
            if pending
                .front()
                .is_some_and(|front| front.audit_id == entry.audit_id)
            {
                pending.pop_front();
            }
            if delivered {
                replayed += 1;
            }
        }

        let pending = self.lock_pending();
        if pending.is_empty() && self.state.degraded.swap(false, Ordering::SeqCst) {
            info!(replayed, "audit fallback queue drained");
        }

        replayed
    }

    /// Returns the current health signal.
    #[must_use]
    pub fn health(&self) -> AuditHealth {
        let pending = self.lock_pending().len();
        AuditHealth {
            degraded: self.state.degraded.load(Ordering::SeqCst),
            pending,
            dead_lettered: self.lock_dead_letters().len(),
        }
    }

    /// Returns the entries the durable store refused permanently.
    #[must_use]
    pub fn dead_letters(&self) -> Vec<PermissionAuditEntry> {
        self.lock_dead_letters().clone()
    }

    /// Reads one page of the durable audit stream.
    pub async fn export(&self, query: AuditStreamQuery) -> AppResult<Vec<PermissionAuditRecord>> {
        let query = AuditStreamQuery {
            after_sequence: query.after_sequence.max(0),
            limit: query.limit.clamp(1, MAX_EXPORT_LIMIT),
            ..query
        };

        self.state.repository.list_audits(&query).await
    }

    /// Verifies the whole durable chain from its genesis record.
    pub async fn verify_chain(&self) -> AppResult<AuditChainVerification> {
        let mut verified = AuditChainVerification {
            records: 0,
            head_hash: AUDIT_GENESIS_HASH.to_owned(),
        };
        let mut after_sequence = 0;

        loop {
            let page = self
                .export(AuditStreamQuery {
                    after_sequence,
                    limit: MAX_EXPORT_LIMIT,
                    user_id: None,
                    allowed: None,
                })
                .await?;

            let Some(last) = page.last() else {
                return Ok(verified);
            };
            after_sequence = last.sequence;

            let page_result = verify_audit_chain(&page, &verified.head_hash)?;
            verified.records += page_result.records;
            verified.head_hash = page_result.head_hash;
        }
    }

    async fn append(&self, entry: &PermissionAuditEntry) -> AppResult<()> {
        let write = self.state.repository.append_audit(entry);
        match tokio::time::timeout(self.state.write_timeout, write).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(AppError::Internal(format!(
                "audit write timed out after {} ms",
                self.state.write_timeout.as_millis()
            ))),
        }
    }

    fn enqueue(&self, entry: PermissionAuditEntry) {
        let mut pending = self.lock_pending();
        pending.push_back(entry);
        if !self.state.degraded.swap(true, Ordering::SeqCst) {
            warn!(pending = pending.len(), "audit pipeline degraded");
        }
    }

    fn dead_letter(&self, entry: PermissionAuditEntry, cause: &AppError) {
        error!(
            audit_id = %entry.audit_id,
            user_id = %entry.user_id,
            error = %cause,
            "durable audit store refused entry, moving it to dead letters"
        );
        self.lock_dead_letters().push(entry);
    }

    fn pending_len(&self) -> usize {
        self.lock_pending().len()
    }

    fn lock_pending(&self) -> MutexGuard<'_, VecDeque<PermissionAuditEntry>> {
        self.state
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_dead_letters(&self) -> MutexGuard<'_, Vec<PermissionAuditEntry>> {
        self.state
            .dead_letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A `Validation` error means the store rejects the entry's content, so
/// retrying can never succeed.
fn is_permanent(error: &AppError) -> bool {
    matches!(error, AppError::Validation(_))
}
