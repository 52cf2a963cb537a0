use std::env;
use std::time::Duration;

use chrono::TimeDelta;
use gatehouse_application::AuthorizationConfig;
use gatehouse_core::{AppError, AppResult};
use gatehouse_infrastructure::HttpResourceMetadataProvider;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub database_url: String,
    pub metadata_base_url: Option<Url>,
    pub authorization: AuthorizationConfig,
    pub audit_replay_interval: Duration,
}

impl AdminConfig {
    pub fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let metadata_base_url = parse_metadata_base_url(env::var("METADATA_BASE_URL").ok())?;

        let defaults = AuthorizationConfig::default();
        let authorization = AuthorizationConfig {
            metadata_lookup_timeout: Duration::from_millis(parse_env_u64(
                "GATEHOUSE_METADATA_TIMEOUT_MS",
                duration_millis(defaults.metadata_lookup_timeout),
            )?),
            evaluation_timeout: Duration::from_millis(parse_env_u64(
                "GATEHOUSE_EVALUATION_TIMEOUT_MS",
                duration_millis(defaults.evaluation_timeout),
            )?),
            access_request_ttl: hours_env(
                "GATEHOUSE_ACCESS_REQUEST_TTL_HOURS",
                defaults.access_request_ttl,
            )?,
            max_delegation_ttl: hours_env(
                "GATEHOUSE_MAX_DELEGATION_TTL_HOURS",
                defaults.max_delegation_ttl,
            )?,
        }
        .validated()?;

        let audit_replay_interval_ms = parse_env_u64("GATEHOUSE_AUDIT_REPLAY_INTERVAL_MS", 1000)?;
        if audit_replay_interval_ms == 0 {
            return Err(AppError::Validation(
                "GATEHOUSE_AUDIT_REPLAY_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            metadata_base_url,
            authorization,
            audit_replay_interval: Duration::from_millis(audit_replay_interval_ms),
        })
    }

    pub fn require_metadata_base_url(&self) -> AppResult<&Url> {
        self.metadata_base_url.as_ref().ok_or_else(|| {
            AppError::Validation("METADATA_BASE_URL is required for this command".to_owned())
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn parse_metadata_base_url(value: Option<String>) -> AppResult<Option<Url>> {
    value
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            HttpResourceMetadataProvider::parse_base_url(&value).map_err(|error| {
                AppError::Validation(format!("invalid METADATA_BASE_URL: {error}"))
            })
        })
        .transpose()
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn hours_env(name: &str, default: TimeDelta) -> AppResult<TimeDelta> {
    let hours = parse_env_u64(name, u64::try_from(default.num_hours()).unwrap_or(0))?;
    i64::try_from(hours)
        .ok()
        .and_then(TimeDelta::try_hours)
        .ok_or_else(|| AppError::Validation(format!("{name} value '{hours}' is out of range")))
}

fn duration_millis(value: Duration) -> u64 {
    u64::try_from(value.as_millis()).unwrap_or(u64::MAX)
}
