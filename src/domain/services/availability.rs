use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{info, warn};

use crate::domain::models::availability::{AvailabilityStatus, AvailabilityWindow, NewAvailabilityParams, TeachingMode};
use crate::domain::ports::AvailabilityRepository;
use crate::error::AppError;

/// Picks the window a booking should consume on `date`.
///
/// A window counts as open when it covers the requested slot and either has
/// spare capacity or is already held by the caller (`held_window_ids`).
/// Held windows win, then the one with the most spare capacity, then the
/// lowest id so the choice is deterministic.
pub fn select_open_window<'a>(
    windows: &'a [AvailabilityWindow],
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    mode: TeachingMode,
    held_window_ids: &[String],
) -> Option<&'a AvailabilityWindow> {
    let is_held = |w: &AvailabilityWindow| held_window_ids.iter().any(|id| *id == w.id);

    windows
        .iter()
        .filter(|w| w.covers(date, start, end, mode))
        .filter(|w| is_held(w) || w.has_capacity())
        .min_by(|a, b| {
            is_held(b).cmp(&is_held(a))
                .then_with(|| {
                    let spare_a = a.max_concurrent_bookings - a.current_bookings;
                    let spare_b = b.max_concurrent_bookings - b.current_bookings;
                    spare_b.cmp(&spare_a)
                })
                .then_with(|| a.id.cmp(&b.id))
        })
}

/// Recurring weekly availability of tutors.
#[derive(Clone)]
pub struct AvailabilityCatalog {
    repo: Arc<dyn AvailabilityRepository>,
}

impl AvailabilityCatalog {
    pub fn new(repo: Arc<dyn AvailabilityRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_window(&self, params: NewAvailabilityParams) -> Result<AvailabilityWindow, AppError> {
        let window = AvailabilityWindow::new(params)?;
        let created = self.repo.create(&window).await?;
        info!("Created availability window {} for tutor {} ({})", created.id, created.tutor_id, created.weekdays);
        Ok(created)
    }

    pub async fn list_windows(&self, tutor_id: &str) -> Result<Vec<AvailabilityWindow>, AppError> {
        self.repo.list_by_tutor(tutor_id).await
    }

    pub async fn is_available(
        &self,
        tutor_id: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        mode: TeachingMode,
    ) -> Result<bool, AppError> {
        Ok(self.find_open_window(tutor_id, date, start, end, mode, &[]).await?.is_some())
    }

    pub async fn find_open_window(
        &self,
        tutor_id: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        mode: TeachingMode,
        held_window_ids: &[String],
    ) -> Result<Option<AvailabilityWindow>, AppError> {
        if start >= end {
            return Err(AppError::InvalidArgument("Start time must be before end time".into()));
        }
        let windows = self.repo.list_by_tutor(tutor_id).await?;
        Ok(select_open_window(&windows, date, start, end, mode, held_window_ids).cloned())
    }

    pub async fn increment_booking(&self, availability_id: &str) -> Result<(), AppError> {
        if self.repo.increment_booking(availability_id).await? {
            return Ok(());
        }

        let window = self.repo.find_by_id(availability_id).await?
            .ok_or(AppError::NotFound(format!("Availability window {} not found", availability_id)))?;

        warn!("Increment rejected for window {} ({}/{})", window.id, window.current_bookings, window.max_concurrent_bookings);
        if window.status == AvailabilityStatus::Inactive {
            Err(AppError::InvalidState(format!("Availability window {} is inactive", availability_id)))
        } else {
            Err(AppError::SchedulingConflict(format!("Availability window {} is fully booked", availability_id)))
        }
    }

    pub async fn decrement_booking(&self, availability_id: &str) -> Result<(), AppError> {
        if self.repo.decrement_booking(availability_id).await? {
            return Ok(());
        }

        self.repo.find_by_id(availability_id).await?
            .ok_or(AppError::NotFound(format!("Availability window {} not found", availability_id)))?;

        Err(AppError::InvalidState(format!("Availability window {} has no outstanding bookings", availability_id)))
    }

    /// Soft-disables a window. Existing bookings keep referencing it.
    pub async fn deactivate_window(&self, availability_id: &str) -> Result<AvailabilityWindow, AppError> {
        let window = self.repo.find_by_id(availability_id).await?
            .ok_or(AppError::NotFound(format!("Availability window {} not found", availability_id)))?;
        if window.status == AvailabilityStatus::Inactive {
            return Err(AppError::InvalidState(format!("Availability window {} is already inactive", availability_id)));
        }

        let updated = self.repo.deactivate(availability_id).await?;
        info!("Deactivated availability window {} ({} bookings outstanding)", updated.id, updated.current_bookings);
        Ok(updated)
    }
}
