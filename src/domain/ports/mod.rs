use crate::domain::models::{
    availability::AvailabilityWindow, contract::Contract, job::{Job, NotificationEvent},
    reschedule::{ApprovalPlan, RescheduleRequest}, session::SessionInstance, user::User,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    async fn create(&self, window: &AvailabilityWindow) -> Result<AvailabilityWindow, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<AvailabilityWindow>, AppError>;
    async fn list_by_tutor(&self, tutor_id: &str) -> Result<Vec<AvailabilityWindow>, AppError>;
    /// Adds one booking if the window is active and below capacity.
    /// Returns false when the guard rejected the update.
    async fn increment_booking(&self, id: &str) -> Result<bool, AppError>;
    /// Releases one booking if any is outstanding. Returns false otherwise.
    async fn decrement_booking(&self, id: &str) -> Result<bool, AppError>;
    async fn deactivate(&self, id: &str) -> Result<AvailabilityWindow, AppError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<SessionInstance>, AppError>;
    async fn list_by_contract(&self, contract_id: &str) -> Result<Vec<SessionInstance>, AppError>;
    async fn list_scheduled_for_tutor(&self, tutor_id: &str, date: NaiveDate) -> Result<Vec<SessionInstance>, AppError>;
    async fn list_by_tutor_range(&self, tutor_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<SessionInstance>, AppError>;
    /// Cancels a scheduled session, releases the window its contract held
    /// through it, cancels pending reschedule requests targeting it and
    /// enqueues `jobs`, all in one transaction.
    async fn cancel(&self, session_id: &str, jobs: Vec<Job>) -> Result<SessionInstance, AppError>;
}

#[async_trait]
pub trait ContractRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Contract>, AppError>;
    async fn list_by_parent(&self, parent_id: &str) -> Result<Vec<Contract>, AppError>;
    /// Persists the contract with its generated sessions all-or-nothing,
    /// re-checking overlap and window capacity inside the transaction.
    async fn create_with_sessions(&self, contract: &Contract, sessions: &[SessionInstance], jobs: Vec<Job>) -> Result<Contract, AppError>;
}

#[async_trait]
pub trait RescheduleRepository: Send + Sync {
    async fn create(&self, request: &RescheduleRequest, jobs: Vec<Job>) -> Result<RescheduleRequest, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<RescheduleRequest>, AppError>;
    async fn find_pending_for_booking(&self, booking_id: &str) -> Result<Option<RescheduleRequest>, AppError>;
    async fn list_pending(&self) -> Result<Vec<RescheduleRequest>, AppError>;
    /// Claims the pending request, moves the session and adjusts booking
    /// counters atomically. Fails with `SchedulingConflict` (request left
    /// pending) or `InvalidState` (request no longer pending).
    async fn approve(&self, plan: &ApprovalPlan, jobs: Vec<Job>) -> Result<(RescheduleRequest, SessionInstance), AppError>;
    async fn reject(&self, id: &str, staff_id: &str, rejection_reason: Option<String>, processed_date: DateTime<Utc>, jobs: Vec<Job>) -> Result<RescheduleRequest, AppError>;
    async fn cancel(&self, id: &str, processed_date: DateTime<Utc>, jobs: Vec<Job>) -> Result<RescheduleRequest, AppError>;
}

/// Identity and role collaborator.
#[async_trait]
pub trait TutorDirectory: Send + Sync {
    async fn create(&self, user: &User) -> Result<User, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn list_active_tutors(&self) -> Result<Vec<User>, AppError>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Job>, AppError>;
    /// Claims up to `limit` due jobs by moving them to PROCESSING with a lease
    /// ending at `lease_until`. Jobs whose previous lease expired are due again.
    async fn find_pending(&self, limit: i32, lease_until: DateTime<Utc>) -> Result<Vec<Job>, AppError>;
    /// Claims one specific pending job. Returns None if another worker holds it.
    async fn claim(&self, id: &str, lease_until: DateTime<Utc>) -> Result<Option<Job>, AppError>;
    async fn update_status(&self, id: &str, status: &str, error_message: Option<String>) -> Result<(), AppError>;
    async fn retry_later(&self, id: &str, execute_at: DateTime<Utc>, error_message: String) -> Result<(), AppError>;
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RefundReceipt {
    pub reference: String,
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn notify(&self, event: NotificationEvent, payload: &Value) -> Result<(), AppError>;
}

#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn refund(&self, contract_id: &str, session_id: &str, amount: i64) -> Result<RefundReceipt, AppError>;
}
