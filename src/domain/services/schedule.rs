use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::{info, warn};

use crate::domain::models::{
    contract::{Contract, NewContractParams},
    job::{Job, NotificationEvent},
    session::SessionInstance,
    weekday::WeekdaySet,
};
use crate::domain::ports::ContractRepository;
use crate::domain::services::matcher::{MatchCriteria, TutorMatcher};
use crate::error::AppError;

/// Every date in `[start, end]` whose weekday is in `weekdays`, ascending.
pub fn expand_dates(weekdays: WeekdaySet, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| weekdays.contains(d.weekday()))
        .collect()
}

pub struct SessionScheduleGenerator {
    contract_repo: Arc<dyn ContractRepository>,
    matcher: TutorMatcher,
}

impl SessionScheduleGenerator {
    pub fn new(contract_repo: Arc<dyn ContractRepository>, matcher: TutorMatcher) -> Self {
        Self { contract_repo, matcher }
    }

    /// Expands the contract into unsaved sessions for its main tutor. Every
    /// date must pass the availability, conflict and distance checks; the
    /// first failing date aborts the whole generation.
    pub async fn generate_sessions(&self, contract: &Contract) -> Result<Vec<SessionInstance>, AppError> {
        let dates = expand_dates(contract.weekdays, contract.start_date, contract.end_date);
        let mut sessions = Vec::with_capacity(dates.len());

        for date in dates {
            let mut criteria = MatchCriteria::new(date, contract.start_time, contract.end_time, contract.mode());
            if !contract.is_online {
                criteria = criteria.offline_at(contract.offline_location(), contract.max_distance_km);
            }

            let Some(found) = self.matcher.evaluate_tutor(&contract.main_tutor_id, &criteria).await? else {
                warn!("Contract {} cannot be scheduled: tutor {} unavailable on {}", contract.id, contract.main_tutor_id, date);
                return Err(AppError::SchedulingConflict(format!(
                    "Tutor {} is not available on {} {}-{}",
                    contract.main_tutor_id, date, contract.start_time, contract.end_time
                )));
            };

            sessions.push(SessionInstance::for_contract(contract, date, found.window.id));
        }

        Ok(sessions)
    }

    /// Validates, generates and commits a new contract with all its sessions.
    pub async fn schedule_contract(&self, params: NewContractParams) -> Result<(Contract, Vec<SessionInstance>), AppError> {
        let contract = Contract::new(params)?;

        let sessions = self.generate_sessions(&contract).await?;
        if sessions.is_empty() {
            return Err(AppError::InvalidArgument(format!(
                "No {} falls between {} and {}",
                contract.weekdays, contract.start_date, contract.end_date
            )));
        }

        let jobs = vec![Job::notify(NotificationEvent::ContractScheduled, &contract.id, None, None)];
        let created = self.contract_repo.create_with_sessions(&contract, &sessions, jobs).await?;

        info!("Scheduled contract {} with {} sessions for tutor {}", created.id, sessions.len(), created.main_tutor_id);
        Ok((created, sessions))
    }
}
