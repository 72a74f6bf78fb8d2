use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions};
use sqlx::{SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::error::AppError;
use crate::state::AppState;
use crate::infra::notification::http_notification_service::HttpNotificationService;
use crate::infra::payment::http_wallet_service::HttpWalletService;
use crate::infra::repositories::{
    sqlite_availability_repo::SqliteAvailabilityRepo, sqlite_contract_repo::SqliteContractRepo,
    sqlite_job_repo::SqliteJobRepo, sqlite_reschedule_repo::SqliteRescheduleRepo,
    sqlite_session_repo::SqliteSessionRepo, sqlite_user_repo::SqliteUserRepo,
};

pub async fn connect_sqlite(config: &Config) -> Result<SqlitePool, AppError> {
    info!("Initializing SQLite connection with WAL Mode...");

    let opts = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(config.database_busy_timeout)
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(config.database_acquire_timeout)
        .connect_with(opts)
        .await?;

    run_sqlite_migrations(&pool).await?;
    Ok(pool)
}

pub fn state_from_pool(config: &Config, pool: SqlitePool) -> Result<AppState, AppError> {
    let notification_service = Arc::new(HttpNotificationService::new(
        config.notification_service_url.clone(),
        config.notification_service_token.clone(),
        config.collaborator_timeout,
    )?);
    let payment_service = Arc::new(HttpWalletService::new(
        config.wallet_service_url.clone(),
        config.wallet_service_token.clone(),
        config.collaborator_timeout,
    )?);

    Ok(AppState {
        config: config.clone(),
        availability_repo: Arc::new(SqliteAvailabilityRepo::new(pool.clone())),
        session_repo: Arc::new(SqliteSessionRepo::new(pool.clone())),
        contract_repo: Arc::new(SqliteContractRepo::new(pool.clone())),
        reschedule_repo: Arc::new(SqliteRescheduleRepo::new(pool.clone())),
        tutor_directory: Arc::new(SqliteUserRepo::new(pool.clone())),
        job_repo: Arc::new(SqliteJobRepo::new(pool)),
        notification_service,
        payment_service,
    })
}

pub async fn bootstrap_state(config: &Config) -> Result<AppState, AppError> {
    let pool = connect_sqlite(config).await?;
    state_from_pool(config, pool)
}

pub async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .map_err(|e| AppError::Database(e.into()))
}
