use crate::domain::{
    models::{job::Job, reschedule::{ApprovalPlan, RescheduleRequest}, session::SessionInstance},
    ports::RescheduleRepository,
};
use crate::error::AppError;
use crate::infra::repositories::sqlite_tx::{
    contract_holds_window, ensure_no_conflict, ensure_window_active, hold_window, insert_jobs, release_window,
};
use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use chrono::{DateTime, Utc};

pub struct SqliteRescheduleRepo {
    pool: SqlitePool,
}

impl SqliteRescheduleRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Distinguishes a missing request from one that already left `pending`.
async fn not_pending_error(conn: &mut SqliteConnection, id: &str) -> AppError {
    let status: Result<Option<String>, sqlx::Error> = sqlx::query_scalar("SELECT status FROM reschedule_requests WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await;

    match status {
        Ok(Some(status)) => AppError::InvalidState(format!("Reschedule request {} is already {}", id, status)),
        Ok(None) => AppError::NotFound(format!("Reschedule request {} not found", id)),
        Err(e) => AppError::Database(e),
    }
}

/// Current row of a scheduled session, read under the transaction's write lock.
async fn ensure_session_scheduled(conn: &mut SqliteConnection, session_id: &str) -> Result<SessionInstance, AppError> {
    sqlx::query_as::<_, SessionInstance>("SELECT * FROM sessions WHERE id = ? AND status = 'scheduled'")
        .bind(session_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(AppError::Database)?
        .ok_or(AppError::InvalidState(format!("Session {} is no longer scheduled", session_id)))
}

#[async_trait]
impl RescheduleRepository for SqliteRescheduleRepo {
    async fn create(&self, request: &RescheduleRequest, jobs: Vec<Job>) -> Result<RescheduleRequest, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // At most one pending request per booking, enforced by a partial unique index.
        let created = sqlx::query_as::<_, RescheduleRequest>(
            r#"INSERT INTO reschedule_requests (id, booking_id, parent_id, requested_date, start_time, end_time,
                   requested_tutor_id, reason, status, staff_id, approved_tutor_id, rejection_reason, processed_date, created_date)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING *"#
        )
            .bind(&request.id).bind(&request.booking_id).bind(&request.parent_id)
            .bind(request.requested_date).bind(request.start_time).bind(request.end_time)
            .bind(&request.requested_tutor_id).bind(&request.reason).bind(request.status)
            .bind(&request.staff_id).bind(&request.approved_tutor_id).bind(&request.rejection_reason)
            .bind(request.processed_date).bind(request.created_date)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => AppError::InvalidState(format!(
                    "Session {} already has a pending reschedule request",
                    request.booking_id
                )),
                e => AppError::Database(e),
            })?;

        ensure_session_scheduled(&mut tx, &request.booking_id).await?;

        insert_jobs(&mut tx, jobs).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<RescheduleRequest>, AppError> {
        sqlx::query_as::<_, RescheduleRequest>("SELECT * FROM reschedule_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_pending_for_booking(&self, booking_id: &str) -> Result<Option<RescheduleRequest>, AppError> {
        sqlx::query_as::<_, RescheduleRequest>(
            "SELECT * FROM reschedule_requests WHERE booking_id = ? AND status = 'pending' LIMIT 1"
        )
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_pending(&self) -> Result<Vec<RescheduleRequest>, AppError> {
        sqlx::query_as::<_, RescheduleRequest>(
            "SELECT * FROM reschedule_requests WHERE status = 'pending' ORDER BY created_date ASC"
        )
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn approve(&self, plan: &ApprovalPlan, jobs: Vec<Job>) -> Result<(RescheduleRequest, SessionInstance), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // Claiming the request is the first write, so the rest of the
        // transaction runs under the database write lock.
        let claimed = sqlx::query_as::<_, RescheduleRequest>(
            r#"UPDATE reschedule_requests SET status = 'approved', staff_id = ?, approved_tutor_id = ?, processed_date = ?
               WHERE id = ? AND status = 'pending'
               RETURNING *"#
        )
            .bind(&plan.staff_id)
            .bind(&plan.tutor_id)
            .bind(plan.processed_date)
            .bind(&plan.request_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let Some(approved) = claimed else {
            return Err(not_pending_error(&mut tx, &plan.request_id).await);
        };

        let previous = ensure_session_scheduled(&mut tx, &plan.session_id).await?.availability_id;

        ensure_no_conflict(&mut tx, &plan.tutor_id, plan.session_date, plan.start_time, plan.end_time, Some(plan.session_id.as_str())).await?;

        let same_window = previous.as_deref() == Some(plan.availability_id.as_str());
        if same_window {
            ensure_window_active(&mut tx, &plan.availability_id).await?;
        } else if contract_holds_window(&mut tx, &plan.contract_id, &plan.availability_id, &plan.session_id).await? {
            ensure_window_active(&mut tx, &plan.availability_id).await?;
        } else {
            hold_window(&mut tx, &plan.availability_id).await?;
        }

        let moved = sqlx::query_as::<_, SessionInstance>(
            r#"UPDATE sessions SET tutor_id = ?, session_date = ?, start_time = ?, end_time = ?, availability_id = ?
               WHERE id = ?
               RETURNING *"#
        )
            .bind(&plan.tutor_id)
            .bind(plan.session_date)
            .bind(plan.start_time)
            .bind(plan.end_time)
            .bind(&plan.availability_id)
            .bind(&plan.session_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        if let Some(previous) = previous.as_deref()
            && !same_window
            && !contract_holds_window(&mut tx, &plan.contract_id, previous, &plan.session_id).await? {
            release_window(&mut tx, previous).await?;
        }

        insert_jobs(&mut tx, jobs).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok((approved, moved))
    }

    async fn reject(&self, id: &str, staff_id: &str, rejection_reason: Option<String>, processed_date: DateTime<Utc>, jobs: Vec<Job>) -> Result<RescheduleRequest, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let rejected = sqlx::query_as::<_, RescheduleRequest>(
            r#"UPDATE reschedule_requests SET status = 'rejected', staff_id = ?, rejection_reason = ?, processed_date = ?
               WHERE id = ? AND status = 'pending'
               RETURNING *"#
        )
            .bind(staff_id)
            .bind(rejection_reason)
            .bind(processed_date)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let Some(rejected) = rejected else {
            return Err(not_pending_error(&mut tx, id).await);
        };

        insert_jobs(&mut tx, jobs).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(rejected)
    }

    async fn cancel(&self, id: &str, processed_date: DateTime<Utc>, jobs: Vec<Job>) -> Result<RescheduleRequest, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let cancelled = sqlx::query_as::<_, RescheduleRequest>(
            "UPDATE reschedule_requests SET status = 'cancelled', processed_date = ? WHERE id = ? AND status = 'pending' RETURNING *"
        )
            .bind(processed_date)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let Some(cancelled) = cancelled else {
            return Err(not_pending_error(&mut tx, id).await);
        };

        insert_jobs(&mut tx, jobs).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(cancelled)
    }
}
