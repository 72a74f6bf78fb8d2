use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::models::weekday::WeekdaySet;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeachingMode {
    Online,
    Offline,
}

impl TeachingMode {
    pub fn from_online_flag(is_online: bool) -> Self {
        if is_online { TeachingMode::Online } else { TeachingMode::Offline }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct AvailabilityWindow {
    pub id: String,
    pub tutor_id: String,
    #[sqlx(try_from = "i64")]
    pub weekdays: WeekdaySet,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub effective_from: NaiveDate,
    pub effective_until: Option<NaiveDate>,
    pub can_teach_online: bool,
    pub can_teach_offline: bool,
    pub max_concurrent_bookings: i32,
    pub current_bookings: i32,
    pub status: AvailabilityStatus,
    pub created_at: DateTime<Utc>,
}

pub struct NewAvailabilityParams {
    pub tutor_id: String,
    pub weekdays: WeekdaySet,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub effective_from: NaiveDate,
    pub effective_until: Option<NaiveDate>,
    pub can_teach_online: bool,
    pub can_teach_offline: bool,
    pub max_concurrent_bookings: i32,
}

impl AvailabilityWindow {
    pub fn new(params: NewAvailabilityParams) -> Result<Self, AppError> {
        if params.start_time >= params.end_time {
            return Err(AppError::InvalidArgument("Availability start time must be before end time".into()));
        }
        if let Some(until) = params.effective_until
            && until < params.effective_from {
            return Err(AppError::InvalidArgument("Availability effective range is inverted".into()));
        }
        if params.max_concurrent_bookings < 1 {
            return Err(AppError::InvalidArgument("Max concurrent bookings must be at least 1".into()));
        }
        if !params.can_teach_online && !params.can_teach_offline {
            return Err(AppError::InvalidArgument("Availability must allow online or offline teaching".into()));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            tutor_id: params.tutor_id,
            weekdays: params.weekdays,
            start_time: params.start_time,
            end_time: params.end_time,
            effective_from: params.effective_from,
            effective_until: params.effective_until,
            can_teach_online: params.can_teach_online,
            can_teach_offline: params.can_teach_offline,
            max_concurrent_bookings: params.max_concurrent_bookings,
            current_bookings: 0,
            status: AvailabilityStatus::Active,
            created_at: Utc::now(),
        })
    }

    pub fn supports(&self, mode: TeachingMode) -> bool {
        match mode {
            TeachingMode::Online => self.can_teach_online,
            TeachingMode::Offline => self.can_teach_offline,
        }
    }

    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.effective_from <= date && self.effective_until.is_none_or(|until| date <= until)
    }

    /// True when the window is active on `date` and fully contains `[start, end)`
    /// for the requested mode. Capacity is checked separately.
    pub fn covers(&self, date: NaiveDate, start: NaiveTime, end: NaiveTime, mode: TeachingMode) -> bool {
        self.status == AvailabilityStatus::Active
            && self.weekdays.contains(date.weekday())
            && self.is_effective_on(date)
            && self.start_time <= start
            && end <= self.end_time
            && self.supports(mode)
    }

    pub fn has_capacity(&self) -> bool {
        self.current_bookings < self.max_concurrent_bookings
    }
}
