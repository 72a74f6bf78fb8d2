use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::models::availability::TeachingMode;
use crate::domain::models::contract::Contract;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

/// One dated teaching occurrence ("booking") of a contract.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct SessionInstance {
    pub id: String,
    pub contract_id: String,
    pub tutor_id: String,
    pub availability_id: Option<String>,
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_online: bool,
    pub offline_address: Option<String>,
    pub offline_latitude: Option<f64>,
    pub offline_longitude: Option<f64>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

impl SessionInstance {
    /// Builds an unsaved session on `date` from the contract's recurring slot.
    pub fn for_contract(contract: &Contract, date: NaiveDate, availability_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            contract_id: contract.id.clone(),
            tutor_id: contract.main_tutor_id.clone(),
            availability_id: Some(availability_id),
            session_date: date,
            start_time: contract.start_time,
            end_time: contract.end_time,
            is_online: contract.is_online,
            offline_address: contract.offline_address.clone(),
            offline_latitude: contract.offline_latitude,
            offline_longitude: contract.offline_longitude,
            status: SessionStatus::Scheduled,
            created_at: Utc::now(),
        }
    }

    pub fn mode(&self) -> TeachingMode {
        TeachingMode::from_online_flag(self.is_online)
    }

    pub fn is_scheduled(&self) -> bool {
        self.status == SessionStatus::Scheduled
    }
}
