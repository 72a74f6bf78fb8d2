use std::sync::Arc;
use crate::domain::ports::{
    AvailabilityRepository, SessionRepository, ContractRepository, RescheduleRepository,
    TutorDirectory, JobRepository, NotificationService, PaymentService,
};
use crate::domain::services::{
    availability::AvailabilityCatalog, conflict::ConflictChecker, matcher::TutorMatcher,
    outbox::OutboxDispatcher, reschedule::RescheduleWorkflow, schedule::SessionScheduleGenerator,
};
use crate::config::Config;

/// Collaborators handed to every component. Services are cheap to build
/// from it and hold only `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub availability_repo: Arc<dyn AvailabilityRepository>,
    pub session_repo: Arc<dyn SessionRepository>,
    pub contract_repo: Arc<dyn ContractRepository>,
    pub reschedule_repo: Arc<dyn RescheduleRepository>,
    pub tutor_directory: Arc<dyn TutorDirectory>,
    pub job_repo: Arc<dyn JobRepository>,
    pub notification_service: Arc<dyn NotificationService>,
    pub payment_service: Arc<dyn PaymentService>,
}

impl AppState {
    pub fn availability_catalog(&self) -> AvailabilityCatalog {
        AvailabilityCatalog::new(self.availability_repo.clone())
    }

    pub fn conflict_checker(&self) -> ConflictChecker {
        ConflictChecker::new(self.session_repo.clone())
    }

    pub fn tutor_matcher(&self) -> TutorMatcher {
        TutorMatcher::new(self.tutor_directory.clone(), self.availability_catalog(), self.conflict_checker())
    }

    pub fn schedule_generator(&self) -> SessionScheduleGenerator {
        SessionScheduleGenerator::new(self.contract_repo.clone(), self.tutor_matcher())
    }

    pub fn outbox(&self) -> OutboxDispatcher {
        OutboxDispatcher::new(
            self.job_repo.clone(),
            self.notification_service.clone(),
            self.payment_service.clone(),
            self.config.collaborator_timeout,
            self.config.outbox_max_attempts,
            self.config.outbox_lease,
        )
    }

    pub fn reschedule_workflow(&self) -> RescheduleWorkflow {
        RescheduleWorkflow::new(
            self.reschedule_repo.clone(),
            self.session_repo.clone(),
            self.contract_repo.clone(),
            self.tutor_directory.clone(),
            self.tutor_matcher(),
            self.outbox(),
        )
    }
}
