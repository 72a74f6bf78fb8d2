use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

use crate::domain::models::session::SessionInstance;
use crate::domain::ports::SessionRepository;
use crate::error::AppError;

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)` share
/// at least one instant. Back-to-back slots do not overlap.
pub fn overlaps(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    a_start < b_end && b_start < a_end
}

/// The single overlap rule used by the matcher, the schedule commit and the
/// approval transaction. Only scheduled sessions on `date` count, and the
/// session identified by `exclude_booking_id` is ignored.
pub fn find_conflict<'a>(
    sessions: &'a [SessionInstance],
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    exclude_booking_id: Option<&str>,
) -> Option<&'a SessionInstance> {
    sessions.iter().find(|s| {
        s.is_scheduled()
            && s.session_date == date
            && exclude_booking_id != Some(s.id.as_str())
            && overlaps(s.start_time, s.end_time, start, end)
    })
}

#[derive(Clone)]
pub struct ConflictChecker {
    session_repo: Arc<dyn SessionRepository>,
}

impl ConflictChecker {
    pub fn new(session_repo: Arc<dyn SessionRepository>) -> Self {
        Self { session_repo }
    }

    pub async fn has_conflict(
        &self,
        tutor_id: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        exclude_booking_id: Option<&str>,
    ) -> Result<bool, AppError> {
        if start >= end {
            return Err(AppError::InvalidArgument("Start time must be before end time".into()));
        }
        let sessions = self.session_repo.list_scheduled_for_tutor(tutor_id, date).await?;
        Ok(find_conflict(&sessions, date, start, end, exclude_booking_id).is_some())
    }
}
