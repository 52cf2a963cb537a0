//! Gatehouse operator binary.

#![forbid(unsafe_code)]

mod admin_command;
mod admin_config;
mod admin_services;

use std::env;
use std::time::Duration;

use gatehouse_application::AuditLogger;
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::RequestContext;
use gatehouse_infrastructure::spawn_audit_replay;
use serde::Serialize;
use tracing::{info, warn};

use crate::admin_command::AdminCommand;
use crate::admin_config::{AdminConfig, init_tracing};
use crate::admin_services::{
    build_admin_services, build_metadata_provider, connect_pool, run_migrations,
};

const FLUSH_ATTEMPTS: u32 = 5;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = AdminCommand::parse(&args)?;
    let config = AdminConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;

    if command == AdminCommand::Migrate {
        run_migrations(&pool).await?;
        info!("gatehouse migrations applied");
        return Ok(());
    }

    let metadata_base_url = if matches!(command, AdminCommand::Check { .. }) {
        Some(config.require_metadata_base_url()?)
    } else {
        config.metadata_base_url.as_ref()
    };
    let metadata_provider = build_metadata_provider(metadata_base_url, &config.authorization)?;
    let services = build_admin_services(pool, metadata_provider, config.authorization);
    let logger = services.authorization.audit_logger().clone();
    let replay = spawn_audit_replay(logger.clone(), config.audit_replay_interval);

    let context = RequestContext::new().with_field("source", "gatehouse-admin");
    let outcome = match command {
        AdminCommand::Migrate => Ok(()),
        AdminCommand::Bootstrap { principal } => services
            .admin
            .bootstrap_system_principal(&principal, &context)
            .await
            .and_then(|assignment| print_json(&assignment)),
        AdminCommand::Check {
            principal,
            action,
            resource,
        } => {
            let decision = services
                .authorization
                .evaluate(&principal, action, &resource, &context)
                .await;
            print_json(&decision)
        }
        AdminCommand::ExportAudit { query } => logger
            .export(query)
            .await
            .and_then(|records| records.iter().try_for_each(print_json)),
        AdminCommand::VerifyAudit => logger
            .verify_chain()
            .await
            .and_then(|verification| print_json(&verification)),
    };

    flush_audit(&logger, config.audit_replay_interval).await;
    replay.abort();
    outcome
}

/// Gives the replay task a bounded window to deliver queued audit entries
/// before the process exits.
async fn flush_audit(logger: &AuditLogger, interval: Duration) {
    for _ in 0..FLUSH_ATTEMPTS {
        if logger.health().pending == 0 {
            break;
        }
        tokio::time::sleep(interval).await;
    }

    let health = logger.health();
    if health.pending > 0 || health.dead_lettered > 0 {
        warn!(
            pending = health.pending,
            dead_lettered = health.dead_lettered,
            "exiting with undelivered permission audit entries"
        );
    }
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let line = serde_json::to_string(value)
        .map_err(|error| AppError::Internal(format!("failed to encode output: {error}")))?;
    println!("{line}");
    Ok(())
}
