use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Scheduling conflict: {0}")]
    SchedulingConflict(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Collaborator failure: {0}")]
    Collaborator(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the caller may safely retry the operation. Every mutating
    /// operation rolls back on failure, so a retryable error never leaves
    /// partial state behind.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Timeout(_) => true,
            AppError::Database(sqlx::Error::PoolTimedOut) => true,
            AppError::Database(e) => {
                if let Some(db_err) = e.as_database_error() {
                    let code = db_err.code().unwrap_or_default();

                    // 5 = SQLITE_BUSY, 6 = SQLITE_LOCKED, 517 = SQLITE_BUSY_SNAPSHOT
                    return code == "5" || code == "6" || code == "517";
                }
                false
            }
            _ => false,
        }
    }
}
