use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use crate::domain::models::{
    availability::{AvailabilityWindow, TeachingMode},
    reschedule::SubstituteCandidate,
    user::User,
};
use crate::domain::ports::TutorDirectory;
use crate::domain::services::availability::AvailabilityCatalog;
use crate::domain::services::conflict::ConflictChecker;
use crate::domain::services::distance::{within_radius, GeoPoint};
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct MatchCriteria {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub mode: TeachingMode,
    pub offline_location: Option<GeoPoint>,
    pub max_distance_km: Option<f64>,
    pub exclude_tutor_ids: Vec<String>,
    pub subject: Option<String>,
    /// Session being moved; it never conflicts with itself.
    pub exclude_booking_id: Option<String>,
    /// Windows the requesting contract already holds.
    pub held_window_ids: Vec<String>,
}

impl MatchCriteria {
    pub fn new(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime, mode: TeachingMode) -> Self {
        Self {
            date,
            start_time,
            end_time,
            mode,
            offline_location: None,
            max_distance_km: None,
            exclude_tutor_ids: Vec::new(),
            subject: None,
            exclude_booking_id: None,
            held_window_ids: Vec::new(),
        }
    }

    pub fn offline_at(mut self, location: Option<GeoPoint>, max_distance_km: f64) -> Self {
        self.offline_location = location;
        self.max_distance_km = Some(max_distance_km);
        self
    }

    pub fn excluding<I: IntoIterator<Item = String>>(mut self, tutor_ids: I) -> Self {
        self.exclude_tutor_ids.extend(tutor_ids);
        self
    }

    pub fn for_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn moving_booking(mut self, booking_id: impl Into<String>, held_window_ids: Vec<String>) -> Self {
        self.exclude_booking_id = Some(booking_id.into());
        self.held_window_ids = held_window_ids;
        self
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.start_time >= self.end_time {
            return Err(AppError::InvalidArgument("Start time must be before end time".into()));
        }
        if let Some(max) = self.max_distance_km
            && (max < 0.0 || max.is_nan()) {
            return Err(AppError::InvalidArgument(format!("Negative distance limit: {}", max)));
        }
        Ok(())
    }
}

/// A tutor that passed every filter, with the window the booking would use.
#[derive(Debug, Clone)]
pub struct TutorMatch {
    pub tutor: User,
    pub window: AvailabilityWindow,
    pub distance_km: Option<f64>,
}

impl From<TutorMatch> for SubstituteCandidate {
    fn from(m: TutorMatch) -> Self {
        SubstituteCandidate {
            tutor_id: m.tutor.id,
            full_name: m.tutor.full_name,
            rating: m.tutor.rating,
            distance_km: m.distance_km,
            is_available: true,
        }
    }
}

/// Highest rating first (unrated last), then nearest, then tutor id.
pub fn rank_matches(matches: &mut [TutorMatch]) {
    matches.sort_by(|a, b| {
        compare_rating(b.tutor.rating, a.tutor.rating)
            .then_with(|| compare_distance(a.distance_km, b.distance_km))
            .then_with(|| a.tutor.id.cmp(&b.tutor.id))
    });
}

fn compare_rating(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => Ordering::Equal,
    }
}

#[derive(Clone)]
pub struct TutorMatcher {
    directory: Arc<dyn TutorDirectory>,
    catalog: AvailabilityCatalog,
    conflicts: ConflictChecker,
}

impl TutorMatcher {
    pub fn new(directory: Arc<dyn TutorDirectory>, catalog: AvailabilityCatalog, conflicts: ConflictChecker) -> Self {
        Self { directory, catalog, conflicts }
    }

    /// Read-only search for tutors able to take the requested slot. An empty
    /// result is not an error.
    pub async fn find_candidates(&self, criteria: &MatchCriteria) -> Result<Vec<SubstituteCandidate>, AppError> {
        Ok(self.find_matches(criteria).await?.into_iter().map(SubstituteCandidate::from).collect())
    }

    pub async fn find_matches(&self, criteria: &MatchCriteria) -> Result<Vec<TutorMatch>, AppError> {
        criteria.validate()?;

        let tutors = self.directory.list_active_tutors().await?;
        let mut matches = Vec::new();

        for tutor in tutors {
            if criteria.exclude_tutor_ids.iter().any(|id| *id == tutor.id) {
                continue;
            }
            if let Some(m) = self.evaluate(tutor, criteria).await? {
                matches.push(m);
            }
        }

        rank_matches(&mut matches);
        debug!("Matcher found {} candidates for {} {}-{}", matches.len(), criteria.date, criteria.start_time, criteria.end_time);
        Ok(matches)
    }

    /// Runs one named tutor through the same filters as `find_matches`.
    /// Fails with `NotFound` only when the tutor does not exist.
    pub async fn evaluate_tutor(&self, tutor_id: &str, criteria: &MatchCriteria) -> Result<Option<TutorMatch>, AppError> {
        criteria.validate()?;
        let tutor = self.directory.find_by_id(tutor_id).await?
            .ok_or(AppError::NotFound(format!("Tutor {} not found", tutor_id)))?;
        self.evaluate(tutor, criteria).await
    }

    async fn evaluate(&self, tutor: User, criteria: &MatchCriteria) -> Result<Option<TutorMatch>, AppError> {
        if !tutor.is_active_tutor() {
            debug!("Tutor {} skipped: not an active tutor", tutor.id);
            return Ok(None);
        }
        if let Some(subject) = &criteria.subject
            && !tutor.teaches(subject) {
            return Ok(None);
        }

        let mut distance_km = None;
        if criteria.mode == TeachingMode::Offline
            && let (Some(origin), Some(max_km)) = (criteria.offline_location, criteria.max_distance_km) {
            let Some(home) = tutor.location() else {
                debug!("Tutor {} skipped: no registered location", tutor.id);
                return Ok(None);
            };
            if !within_radius(&origin, &home, max_km)? {
                debug!("Tutor {} skipped: outside {} km", tutor.id, max_km);
                return Ok(None);
            }
            distance_km = Some(origin.distance_to(&home));
        }

        let window = self.catalog.find_open_window(
            &tutor.id,
            criteria.date,
            criteria.start_time,
            criteria.end_time,
            criteria.mode,
            &criteria.held_window_ids,
        ).await?;
        let Some(window) = window else {
            debug!("Tutor {} skipped: no open availability", tutor.id);
            return Ok(None);
        };

        let clash = self.conflicts.has_conflict(
            &tutor.id,
            criteria.date,
            criteria.start_time,
            criteria.end_time,
            criteria.exclude_booking_id.as_deref(),
        ).await?;
        if clash {
            debug!("Tutor {} skipped: conflicting session", tutor.id);
            return Ok(None);
        }

        Ok(Some(TutorMatch { tutor, window, distance_km }))
    }
}
