use crate::domain::{models::{job::Job, session::SessionInstance}, ports::SessionRepository};
use crate::error::AppError;
use crate::infra::repositories::sqlite_tx::{contract_holds_window, insert_jobs, release_window};
use async_trait::async_trait;
use sqlx::SqlitePool;
use chrono::{NaiveDate, Utc};

pub struct SqliteSessionRepo {
    pool: SqlitePool,
}

impl SqliteSessionRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepo {
    async fn find_by_id(&self, id: &str) -> Result<Option<SessionInstance>, AppError> {
        sqlx::query_as::<_, SessionInstance>("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_contract(&self, contract_id: &str) -> Result<Vec<SessionInstance>, AppError> {
        sqlx::query_as::<_, SessionInstance>(
            "SELECT * FROM sessions WHERE contract_id = ? ORDER BY session_date ASC, start_time ASC"
        )
            .bind(contract_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_scheduled_for_tutor(&self, tutor_id: &str, date: NaiveDate) -> Result<Vec<SessionInstance>, AppError> {
        sqlx::query_as::<_, SessionInstance>(
            "SELECT * FROM sessions WHERE tutor_id = ? AND session_date = ? AND status = 'scheduled' ORDER BY start_time ASC"
        )
            .bind(tutor_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_tutor_range(&self, tutor_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<SessionInstance>, AppError> {
        sqlx::query_as::<_, SessionInstance>(
            "SELECT * FROM sessions WHERE tutor_id = ? AND session_date >= ? AND session_date <= ? ORDER BY session_date ASC, start_time ASC"
        )
            .bind(tutor_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn cancel(&self, session_id: &str, jobs: Vec<Job>) -> Result<SessionInstance, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let cancelled = sqlx::query_as::<_, SessionInstance>(
            "UPDATE sessions SET status = 'cancelled' WHERE id = ? AND status = 'scheduled' RETURNING *"
        )
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .ok_or(AppError::InvalidState(format!("Session {} is no longer scheduled", session_id)))?;

        if let Some(availability_id) = &cancelled.availability_id
            && !contract_holds_window(&mut tx, &cancelled.contract_id, availability_id, &cancelled.id).await? {
            release_window(&mut tx, availability_id).await?;
        }

        sqlx::query(
            "UPDATE reschedule_requests SET status = 'cancelled', processed_date = ? WHERE booking_id = ? AND status = 'pending'"
        )
            .bind(Utc::now())
            .bind(&cancelled.id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        insert_jobs(&mut tx, jobs).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(cancelled)
    }
}
