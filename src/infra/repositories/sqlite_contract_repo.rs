use std::collections::BTreeSet;

use crate::domain::{models::{contract::Contract, job::Job, session::SessionInstance}, ports::ContractRepository};
use crate::error::AppError;
use crate::infra::repositories::sqlite_tx::{ensure_no_conflict, hold_window, insert_jobs};
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteContractRepo {
    pool: SqlitePool,
}

impl SqliteContractRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContractRepository for SqliteContractRepo {
    async fn find_by_id(&self, id: &str) -> Result<Option<Contract>, AppError> {
        sqlx::query_as::<_, Contract>("SELECT * FROM contracts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_parent(&self, parent_id: &str) -> Result<Vec<Contract>, AppError> {
        sqlx::query_as::<_, Contract>("SELECT * FROM contracts WHERE parent_id = ? ORDER BY start_date ASC")
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn create_with_sessions(&self, contract: &Contract, sessions: &[SessionInstance], jobs: Vec<Job>) -> Result<Contract, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let created = sqlx::query_as::<_, Contract>(
            r#"INSERT INTO contracts (id, parent_id, child_id, main_tutor_id, substitute_tutor_a_id, substitute_tutor_b_id,
                   weekdays, start_time, end_time, start_date, end_date, is_online, offline_address, offline_latitude,
                   offline_longitude, max_distance_km, session_fee, status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING *"#
        )
            .bind(&contract.id).bind(&contract.parent_id).bind(&contract.child_id).bind(&contract.main_tutor_id)
            .bind(&contract.substitute_tutor_a_id).bind(&contract.substitute_tutor_b_id)
            .bind(i64::from(contract.weekdays)).bind(contract.start_time).bind(contract.end_time)
            .bind(contract.start_date).bind(contract.end_date).bind(contract.is_online)
            .bind(&contract.offline_address).bind(contract.offline_latitude).bind(contract.offline_longitude)
            .bind(contract.max_distance_km).bind(contract.session_fee).bind(contract.status).bind(contract.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        for session in sessions {
            ensure_no_conflict(&mut tx, &session.tutor_id, session.session_date, session.start_time, session.end_time, None).await?;

            sqlx::query(
                r#"INSERT INTO sessions (id, contract_id, tutor_id, availability_id, session_date, start_time, end_time,
                       is_online, offline_address, offline_latitude, offline_longitude, status, created_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#
            )
                .bind(&session.id).bind(&session.contract_id).bind(&session.tutor_id).bind(&session.availability_id)
                .bind(session.session_date).bind(session.start_time).bind(session.end_time).bind(session.is_online)
                .bind(&session.offline_address).bind(session.offline_latitude).bind(session.offline_longitude)
                .bind(session.status).bind(session.created_at)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;
        }

        let windows: BTreeSet<&str> = sessions.iter().filter_map(|s| s.availability_id.as_deref()).collect();
        for availability_id in windows {
            hold_window(&mut tx, availability_id).await?;
        }

        insert_jobs(&mut tx, jobs).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }
}
