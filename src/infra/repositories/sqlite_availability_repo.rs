use crate::domain::{models::availability::AvailabilityWindow, ports::AvailabilityRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteAvailabilityRepo {
    pool: SqlitePool,
}

impl SqliteAvailabilityRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AvailabilityRepository for SqliteAvailabilityRepo {
    async fn create(&self, window: &AvailabilityWindow) -> Result<AvailabilityWindow, AppError> {
        sqlx::query_as::<_, AvailabilityWindow>(
            r#"INSERT INTO availability_windows (id, tutor_id, weekdays, start_time, end_time, effective_from, effective_until,
                   can_teach_online, can_teach_offline, max_concurrent_bookings, current_bookings, status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING *"#
        )
            .bind(&window.id)
            .bind(&window.tutor_id)
            .bind(i64::from(window.weekdays))
            .bind(window.start_time)
            .bind(window.end_time)
            .bind(window.effective_from)
            .bind(window.effective_until)
            .bind(window.can_teach_online)
            .bind(window.can_teach_offline)
            .bind(window.max_concurrent_bookings)
            .bind(window.current_bookings)
            .bind(window.status)
            .bind(window.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<AvailabilityWindow>, AppError> {
        sqlx::query_as::<_, AvailabilityWindow>("SELECT * FROM availability_windows WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_tutor(&self, tutor_id: &str) -> Result<Vec<AvailabilityWindow>, AppError> {
        sqlx::query_as::<_, AvailabilityWindow>(
            "SELECT * FROM availability_windows WHERE tutor_id = ? ORDER BY start_time ASC, id ASC"
        )
            .bind(tutor_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn increment_booking(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE availability_windows SET current_bookings = current_bookings + 1
             WHERE id = ? AND status = 'active' AND current_bookings < max_concurrent_bookings"
        )
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() == 1)
    }

    async fn decrement_booking(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE availability_windows SET current_bookings = current_bookings - 1 WHERE id = ? AND current_bookings > 0"
        )
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() == 1)
    }

    async fn deactivate(&self, id: &str) -> Result<AvailabilityWindow, AppError> {
        sqlx::query_as::<_, AvailabilityWindow>(
            "UPDATE availability_windows SET status = 'inactive' WHERE id = ? RETURNING *"
        )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or(AppError::NotFound(format!("Availability window {} not found", id)))
    }
}
