use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::models::{
    contract::Contract,
    job::{Job, NotificationEvent},
    reschedule::{ApprovalPlan, NewRescheduleParams, RescheduleRequest, RescheduleStatus, SubstituteCandidate},
    session::{SessionInstance, SessionStatus},
    user::UserRole,
};
use crate::domain::ports::{ContractRepository, RescheduleRepository, SessionRepository, TutorDirectory};
use crate::domain::services::distance::GeoPoint;
use crate::domain::services::matcher::{MatchCriteria, TutorMatcher};
use crate::domain::services::outbox::{Delivery, OutboxDispatcher};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub enum RefundOutcome {
    Completed { reference: String },
    Queued { job_id: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct CancellationOutcome {
    pub session: SessionInstance,
    pub refund: RefundOutcome,
}

pub struct RescheduleWorkflow {
    reschedule_repo: Arc<dyn RescheduleRepository>,
    session_repo: Arc<dyn SessionRepository>,
    contract_repo: Arc<dyn ContractRepository>,
    directory: Arc<dyn TutorDirectory>,
    matcher: TutorMatcher,
    outbox: OutboxDispatcher,
}

impl RescheduleWorkflow {
    pub fn new(
        reschedule_repo: Arc<dyn RescheduleRepository>,
        session_repo: Arc<dyn SessionRepository>,
        contract_repo: Arc<dyn ContractRepository>,
        directory: Arc<dyn TutorDirectory>,
        matcher: TutorMatcher,
        outbox: OutboxDispatcher,
    ) -> Self {
        Self { reschedule_repo, session_repo, contract_repo, directory, matcher, outbox }
    }

    pub async fn create(&self, parent_id: &str, params: NewRescheduleParams) -> Result<RescheduleRequest, AppError> {
        let session = self.load_session(&params.booking_id).await?;
        if !session.is_scheduled() {
            return Err(AppError::InvalidState(format!("Session {} is not scheduled", session.id)));
        }

        if params.start_time >= params.end_time {
            return Err(AppError::InvalidArgument("Requested start time must be before end time".into()));
        }
        if params.requested_date < Utc::now().date_naive() {
            return Err(AppError::InvalidArgument("Cannot reschedule into the past".into()));
        }

        let contract = self.load_contract(&session.contract_id).await?;
        if contract.parent_id != parent_id {
            return Err(AppError::Unauthorized(format!("Session {} does not belong to this parent", session.id)));
        }

        let same_tutor = params.requested_tutor_id.as_ref().is_none_or(|t| *t == session.tutor_id);
        if same_tutor
            && params.requested_date == session.session_date
            && params.start_time == session.start_time
            && params.end_time == session.end_time {
            return Err(AppError::InvalidArgument("Requested slot is identical to the current one".into()));
        }

        if let Some(tutor_id) = &params.requested_tutor_id {
            let tutor = self.directory.find_by_id(tutor_id).await?
                .ok_or(AppError::NotFound(format!("Tutor {} not found", tutor_id)))?;
            if tutor.role != UserRole::Tutor {
                return Err(AppError::InvalidArgument(format!("User {} is not a tutor", tutor_id)));
            }
        }

        if self.reschedule_repo.find_pending_for_booking(&session.id).await?.is_some() {
            return Err(AppError::InvalidState(format!("Session {} already has a pending reschedule request", session.id)));
        }

        let request = RescheduleRequest::new(parent_id.to_string(), params);
        let jobs = vec![Job::notify(NotificationEvent::RescheduleRequested, &contract.id, Some(session.id.as_str()), Some(request.id.as_str()))];
        let created = self.reschedule_repo.create(&request, jobs).await?;

        info!("Reschedule request {} created for session {}", created.id, created.booking_id);
        Ok(created)
    }

    pub async fn find_request(&self, request_id: &str) -> Result<RescheduleRequest, AppError> {
        self.reschedule_repo.find_by_id(request_id).await?
            .ok_or(AppError::NotFound(format!("Reschedule request {} not found", request_id)))
    }

    pub async fn list_pending_requests(&self) -> Result<Vec<RescheduleRequest>, AppError> {
        self.reschedule_repo.list_pending().await
    }

    /// Candidate tutors for the requested slot, excluding the session's current
    /// tutor and the contract's main tutor. Does not require a pending request.
    pub async fn get_available_substitutes(&self, request_id: &str) -> Result<Vec<SubstituteCandidate>, AppError> {
        let request = self.find_request(request_id).await?;
        let session = self.load_session(&request.booking_id).await?;
        let contract = self.load_contract(&session.contract_id).await?;

        let criteria = self.criteria_for(&request, &session, &contract).await?
            .excluding([session.tutor_id.clone(), contract.main_tutor_id.clone()]);

        self.matcher.find_candidates(&criteria).await
    }

    /// Approves a pending request. The tutor is the staff choice if given,
    /// else the requested tutor, else the session's current tutor. The
    /// choice is re-validated here and again inside the commit.
    pub async fn approve(
        &self,
        staff_id: &str,
        request_id: &str,
        chosen_tutor_id: Option<&str>,
    ) -> Result<(RescheduleRequest, SessionInstance), AppError> {
        let request = self.find_request(request_id).await?;
        ensure_pending(&request)?;

        let session = self.load_session(&request.booking_id).await?;
        if !session.is_scheduled() {
            return Err(AppError::InvalidState(format!("Session {} is not scheduled", session.id)));
        }
        let contract = self.load_contract(&session.contract_id).await?;

        let tutor_id = chosen_tutor_id
            .map(str::to_string)
            .or_else(|| request.requested_tutor_id.clone())
            .unwrap_or_else(|| session.tutor_id.clone());

        let criteria = self.criteria_for(&request, &session, &contract).await?;
        let Some(found) = self.matcher.evaluate_tutor(&tutor_id, &criteria).await? else {
            warn!("Approval of {} rejected: tutor {} unavailable", request.id, tutor_id);
            return Err(AppError::SchedulingConflict(format!(
                "Tutor {} is not available on {} {}-{}",
                tutor_id, request.requested_date, request.start_time, request.end_time
            )));
        };

        let plan = ApprovalPlan {
            request_id: request.id.clone(),
            staff_id: staff_id.to_string(),
            session_id: session.id.clone(),
            contract_id: contract.id.clone(),
            tutor_id,
            session_date: request.requested_date,
            start_time: request.start_time,
            end_time: request.end_time,
            availability_id: found.window.id,
            processed_date: Utc::now(),
        };
        let jobs = vec![Job::notify(NotificationEvent::RescheduleApproved, &contract.id, Some(session.id.as_str()), Some(request.id.as_str()))];

        let (approved, moved) = self.reschedule_repo.approve(&plan, jobs).await?;
        info!("Reschedule request {} approved by {}: session {} now {} {} with tutor {}",
            approved.id, staff_id, moved.id, moved.session_date, moved.start_time, moved.tutor_id);
        Ok((approved, moved))
    }

    pub async fn reject(&self, staff_id: &str, request_id: &str, reason: Option<String>) -> Result<RescheduleRequest, AppError> {
        let request = self.find_request(request_id).await?;
        ensure_pending(&request)?;

        let session = self.load_session(&request.booking_id).await?;
        let jobs = vec![Job::notify(NotificationEvent::RescheduleRejected, &session.contract_id, Some(session.id.as_str()), Some(request.id.as_str()))];

        let rejected = self.reschedule_repo.reject(&request.id, staff_id, reason, Utc::now(), jobs).await?;
        info!("Reschedule request {} rejected by {}", rejected.id, staff_id);
        Ok(rejected)
    }

    /// Withdraws a pending request on behalf of the parent who filed it.
    pub async fn cancel_request(&self, parent_id: &str, request_id: &str) -> Result<RescheduleRequest, AppError> {
        let request = self.find_request(request_id).await?;
        if request.parent_id != parent_id {
            return Err(AppError::Unauthorized(format!("Reschedule request {} belongs to another parent", request.id)));
        }
        ensure_pending(&request)?;

        let session = self.load_session(&request.booking_id).await?;
        let jobs = vec![Job::notify(NotificationEvent::RescheduleCancelled, &session.contract_id, Some(session.id.as_str()), Some(request.id.as_str()))];

        let cancelled = self.reschedule_repo.cancel(&request.id, Utc::now(), jobs).await?;
        info!("Reschedule request {} withdrawn by parent", cancelled.id);
        Ok(cancelled)
    }

    /// Administrative cancellation. The session is cancelled and its booking
    /// released in one commit, then the refund is attempted once inline; a
    /// refund that does not go through stays queued for the worker.
    pub async fn cancel_session_and_refund(&self, session_id: &str) -> Result<CancellationOutcome, AppError> {
        let session = self.load_session(session_id).await?;
        match session.status {
            SessionStatus::Scheduled => {}
            SessionStatus::Cancelled | SessionStatus::Completed => {
                return Err(AppError::InvalidState(format!("Session {} is {:?}", session.id, session.status)));
            }
        }
        let contract = self.load_contract(&session.contract_id).await?;

        let refund_job = Job::refund(&contract.id, &session.id, contract.session_fee);
        let refund_job_id = refund_job.id.clone();
        let jobs = vec![
            Job::notify(NotificationEvent::SessionCancelled, &contract.id, Some(session.id.as_str()), None),
            refund_job,
        ];

        let cancelled = self.session_repo.cancel(&session.id, jobs).await?;
        info!("Session {} cancelled; refund of {} queued as job {}", cancelled.id, contract.session_fee, refund_job_id);

        let refund = match self.outbox.dispatch_now(&refund_job_id).await {
            Ok(Some(Delivery::Delivered(Some(receipt)))) => RefundOutcome::Completed { reference: receipt.reference },
            Ok(Some(Delivery::Retrying(reason))) | Ok(Some(Delivery::Failed(reason))) => {
                RefundOutcome::Queued { job_id: refund_job_id, reason }
            }
            Ok(Some(Delivery::Delivered(None))) | Ok(None) => {
                RefundOutcome::Queued { job_id: refund_job_id, reason: "Refund picked up by background worker".into() }
            }
            Err(e) => {
                warn!("Inline refund for session {} could not be attempted: {}", cancelled.id, e);
                RefundOutcome::Queued { job_id: refund_job_id, reason: e.to_string() }
            }
        };

        Ok(CancellationOutcome { session: cancelled, refund })
    }

    async fn criteria_for(&self, request: &RescheduleRequest, session: &SessionInstance, contract: &Contract) -> Result<MatchCriteria, AppError> {
        let held_window_ids: Vec<String> = self.session_repo.list_by_contract(&contract.id).await?
            .into_iter()
            .filter(|s| s.is_scheduled())
            .filter_map(|s| s.availability_id)
            .collect();

        let mut criteria = MatchCriteria::new(request.requested_date, request.start_time, request.end_time, session.mode())
            .moving_booking(session.id.clone(), held_window_ids);

        if !session.is_online {
            let location = match (session.offline_latitude, session.offline_longitude) {
                (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
                _ => contract.offline_location(),
            };
            criteria = criteria.offline_at(location, contract.max_distance_km);
        }
        Ok(criteria)
    }

    async fn load_session(&self, session_id: &str) -> Result<SessionInstance, AppError> {
        self.session_repo.find_by_id(session_id).await?
            .ok_or(AppError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn load_contract(&self, contract_id: &str) -> Result<Contract, AppError> {
        self.contract_repo.find_by_id(contract_id).await?
            .ok_or(AppError::NotFound(format!("Contract {} not found", contract_id)))
    }
}

fn ensure_pending(request: &RescheduleRequest) -> Result<(), AppError> {
    if request.status.is_terminal() {
        return Err(AppError::InvalidState(format!(
            "Reschedule request {} is already {:?}",
            request.id, request.status
        )));
    }
    debug_assert_eq!(request.status, RescheduleStatus::Pending);
    Ok(())
}
