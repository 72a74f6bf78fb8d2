use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub notification_service_url: String,
    pub notification_service_token: String,
    pub wallet_service_url: String,
    pub wallet_service_token: String,
    pub collaborator_timeout: Duration,
    pub database_acquire_timeout: Duration,
    pub database_busy_timeout: Duration,
    pub outbox_poll_interval: Duration,
    pub outbox_max_attempts: i32,
    /// How long a claimed job stays reserved before another worker may take it over.
    pub outbox_lease: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            notification_service_url: env::var("NOTIFICATION_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8000/api/v1/notify".to_string()),
            notification_service_token: env::var("NOTIFICATION_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
            wallet_service_url: env::var("WALLET_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8001/api/v1/refunds".to_string()),
            wallet_service_token: env::var("WALLET_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
            collaborator_timeout: Duration::from_millis(env_number("COLLABORATOR_TIMEOUT_MS", 5000)),
            database_acquire_timeout: Duration::from_millis(env_number("DATABASE_ACQUIRE_TIMEOUT_MS", 5000)),
            database_busy_timeout: Duration::from_millis(env_number("DATABASE_BUSY_TIMEOUT_MS", 5000)),
            outbox_poll_interval: Duration::from_secs(env_number("OUTBOX_POLL_INTERVAL_SECS", 5)),
            outbox_max_attempts: env_number("OUTBOX_MAX_ATTEMPTS", 5) as i32,
            outbox_lease: Duration::from_secs(env_number("OUTBOX_LEASE_SECS", 300)),
        }
    }
}

fn env_number(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
