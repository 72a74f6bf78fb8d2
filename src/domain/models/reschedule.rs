use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RescheduleStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl RescheduleStatus {
    pub fn is_terminal(self) -> bool {
        self != RescheduleStatus::Pending
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct RescheduleRequest {
    pub id: String,
    pub booking_id: String,
    pub parent_id: String,
    pub requested_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub requested_tutor_id: Option<String>,
    /// Parent's reason for asking. Never overwritten by staff.
    pub reason: Option<String>,
    pub status: RescheduleStatus,
    pub staff_id: Option<String>,
    pub approved_tutor_id: Option<String>,
    pub rejection_reason: Option<String>,
    pub processed_date: Option<DateTime<Utc>>,
    pub created_date: DateTime<Utc>,
}

pub struct NewRescheduleParams {
    pub booking_id: String,
    pub requested_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub requested_tutor_id: Option<String>,
    pub reason: Option<String>,
}

impl RescheduleRequest {
    pub fn new(parent_id: String, params: NewRescheduleParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            booking_id: params.booking_id,
            parent_id,
            requested_date: params.requested_date,
            start_time: params.start_time,
            end_time: params.end_time,
            requested_tutor_id: params.requested_tutor_id,
            reason: params.reason,
            status: RescheduleStatus::Pending,
            staff_id: None,
            approved_tutor_id: None,
            rejection_reason: None,
            processed_date: None,
            created_date: Utc::now(),
        }
    }
}

/// Everything the approval transaction needs to move a session. The
/// session's current window is read inside the transaction, not carried here.
#[derive(Debug, Clone)]
pub struct ApprovalPlan {
    pub request_id: String,
    pub staff_id: String,
    pub session_id: String,
    pub contract_id: String,
    pub tutor_id: String,
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub availability_id: String,
    pub processed_date: DateTime<Utc>,
}

/// A tutor eligible to cover a reschedule request. Derived, never persisted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SubstituteCandidate {
    pub tutor_id: String,
    pub full_name: String,
    pub rating: Option<f64>,
    pub distance_km: Option<f64>,
    pub is_available: bool,
}
