use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub const JOB_NOTIFY: &str = "NOTIFY";
pub const JOB_REFUND: &str = "REFUND";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
    ContractScheduled,
    RescheduleRequested,
    RescheduleApproved,
    RescheduleRejected,
    RescheduleCancelled,
    SessionCancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct JobPayload {
    pub contract_id: String,
    pub session_id: Option<String>,
    pub request_id: Option<String>,
    pub event: Option<NotificationEvent>,
    pub amount: Option<i64>,
}

/// Outbox row. Written in the same transaction as the mutation that caused it.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Job {
    pub id: String,
    pub job_type: String, // "NOTIFY" or "REFUND"
    pub payload: Json<JobPayload>,
    pub execute_at: DateTime<Utc>,
    pub status: String,
    pub attempts: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(job_type: &str, payload: JobPayload) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            job_type: job_type.to_string(),
            payload: Json(payload),
            execute_at: now,
            status: "PENDING".to_string(),
            attempts: 0,
            error_message: None,
            created_at: now,
        }
    }

    pub fn notify(event: NotificationEvent, contract_id: &str, session_id: Option<&str>, request_id: Option<&str>) -> Self {
        Self::new(JOB_NOTIFY, JobPayload {
            contract_id: contract_id.to_string(),
            session_id: session_id.map(str::to_string),
            request_id: request_id.map(str::to_string),
            event: Some(event),
            amount: None,
        })
    }

    pub fn refund(contract_id: &str, session_id: &str, amount: i64) -> Self {
        Self::new(JOB_REFUND, JobPayload {
            contract_id: contract_id.to_string(),
            session_id: Some(session_id.to_string()),
            request_id: None,
            event: None,
            amount: Some(amount),
        })
    }
}
