//! Statements shared by the transactional repository methods. Every helper
//! runs on the caller's open transaction.

use chrono::{NaiveDate, NaiveTime};
use sqlx::SqliteConnection;
use tracing::warn;

use crate::domain::models::{job::Job, session::SessionInstance};
use crate::domain::services::conflict::find_conflict;
use crate::error::AppError;

pub(crate) async fn ensure_no_conflict(
    conn: &mut SqliteConnection,
    tutor_id: &str,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    exclude_session_id: Option<&str>,
) -> Result<(), AppError> {
    let sessions = sqlx::query_as::<_, SessionInstance>(
        "SELECT * FROM sessions WHERE tutor_id = ? AND session_date = ? AND status = 'scheduled'"
    )
        .bind(tutor_id)
        .bind(date)
        .fetch_all(&mut *conn)
        .await
        .map_err(AppError::Database)?;

    if let Some(clash) = find_conflict(&sessions, date, start, end, exclude_session_id) {
        warn!("Commit blocked: tutor {} already teaches {} {}-{} (session {})",
            tutor_id, date, clash.start_time, clash.end_time, clash.id);
        return Err(AppError::SchedulingConflict(format!(
            "Tutor {} already has a session on {} {}-{}",
            tutor_id, date, clash.start_time, clash.end_time
        )));
    }
    Ok(())
}

/// Whether another scheduled session of the contract still references the window.
pub(crate) async fn contract_holds_window(
    conn: &mut SqliteConnection,
    contract_id: &str,
    availability_id: &str,
    excluding_session_id: &str,
) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sessions
         WHERE contract_id = ? AND availability_id = ? AND status = 'scheduled' AND id != ?"
    )
        .bind(contract_id)
        .bind(availability_id)
        .bind(excluding_session_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(AppError::Database)?;
    Ok(count > 0)
}

pub(crate) async fn hold_window(conn: &mut SqliteConnection, availability_id: &str) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE availability_windows SET current_bookings = current_bookings + 1
         WHERE id = ? AND status = 'active' AND current_bookings < max_concurrent_bookings"
    )
        .bind(availability_id)
        .execute(&mut *conn)
        .await
        .map_err(AppError::Database)?;

    if result.rows_affected() == 0 {
        return Err(AppError::SchedulingConflict(format!(
            "Availability window {} is no longer open",
            availability_id
        )));
    }
    Ok(())
}

pub(crate) async fn ensure_window_active(conn: &mut SqliteConnection, availability_id: &str) -> Result<(), AppError> {
    let active: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM availability_windows WHERE id = ? AND status = 'active'"
    )
        .bind(availability_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(AppError::Database)?;

    if active.is_none() {
        return Err(AppError::SchedulingConflict(format!(
            "Availability window {} is no longer active",
            availability_id
        )));
    }
    Ok(())
}

/// Floors at zero.
pub(crate) async fn release_window(conn: &mut SqliteConnection, availability_id: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE availability_windows SET current_bookings = current_bookings - 1 WHERE id = ? AND current_bookings > 0")
        .bind(availability_id)
        .execute(&mut *conn)
        .await
        .map_err(AppError::Database)?;
    Ok(())
}

pub(crate) async fn insert_jobs(conn: &mut SqliteConnection, jobs: Vec<Job>) -> Result<(), AppError> {
    for job in jobs {
        sqlx::query("INSERT INTO jobs (id, job_type, payload, execute_at, status, attempts, error_message, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(&job.id)
            .bind(&job.job_type)
            .bind(&job.payload)
            .bind(job.execute_at)
            .bind(&job.status)
            .bind(job.attempts)
            .bind(&job.error_message)
            .bind(job.created_at)
            .execute(&mut *conn)
            .await
            .map_err(AppError::Database)?;
    }
    Ok(())
}
