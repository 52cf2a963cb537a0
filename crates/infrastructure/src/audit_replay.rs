use std::time::Duration;

use gatehouse_application::AuditLogger;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Spawns a background task that drains the audit logger's pending queue.
///
/// Each tick replays queued entries in order and stops at the first write
/// that still fails. The task runs until the returned handle is aborted.
pub fn spawn_audit_replay(logger: AuditLogger, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let before = logger.health();
            if before.pending == 0 {
                continue;
            }

            let replayed = logger.replay_pending().await;
            let after = logger.health();
            if replayed > 0 {
                info!(
                    replayed,
                    pending = after.pending,
                    dead_lettered = after.dead_lettered,
                    "replayed queued permission audit entries"
                );
            }
            if after.degraded {
                warn!(
                    pending = after.pending,
                    "permission audit store still unavailable"
                );
            }
        }
    })
}
