use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::models::availability::TeachingMode;
use crate::domain::models::weekday::WeekdaySet;
use crate::domain::services::distance::GeoPoint;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ContractStatus {
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Contract {
    pub id: String,
    pub parent_id: String,
    pub child_id: String,
    pub main_tutor_id: String,
    pub substitute_tutor_a_id: Option<String>,
    pub substitute_tutor_b_id: Option<String>,
    #[sqlx(try_from = "i64")]
    pub weekdays: WeekdaySet,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_online: bool,
    pub offline_address: Option<String>,
    pub offline_latitude: Option<f64>,
    pub offline_longitude: Option<f64>,
    pub max_distance_km: f64,
    /// Amount refunded per cancelled session, in minor currency units.
    pub session_fee: i64,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
}

pub struct NewContractParams {
    pub parent_id: String,
    pub child_id: String,
    pub main_tutor_id: String,
    pub substitute_tutor_ids: Vec<String>,
    pub weekdays: WeekdaySet,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_online: bool,
    pub offline_address: Option<String>,
    pub offline_location: Option<GeoPoint>,
    pub max_distance_km: f64,
    pub session_fee: i64,
}

impl Contract {
    pub fn new(params: NewContractParams) -> Result<Self, AppError> {
        if params.start_date > params.end_date {
            return Err(AppError::InvalidArgument("Contract start date is after end date".into()));
        }
        if params.start_time >= params.end_time {
            return Err(AppError::InvalidArgument("Contract start time must be before end time".into()));
        }
        if params.max_distance_km < 0.0 || !params.max_distance_km.is_finite() {
            return Err(AppError::InvalidArgument("Max distance must be a non-negative number".into()));
        }
        if params.session_fee < 0 {
            return Err(AppError::InvalidArgument("Session fee cannot be negative".into()));
        }
        if params.substitute_tutor_ids.len() > 2 {
            return Err(AppError::InvalidArgument("A contract has at most two substitute tutors".into()));
        }
        if params.substitute_tutor_ids.iter().any(|id| *id == params.main_tutor_id) {
            return Err(AppError::InvalidArgument("Main tutor cannot also be a substitute".into()));
        }
        if !params.is_online && params.offline_location.is_none() {
            return Err(AppError::InvalidArgument("Offline contracts require a location".into()));
        }

        let mut substitutes = params.substitute_tutor_ids.into_iter();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            parent_id: params.parent_id,
            child_id: params.child_id,
            main_tutor_id: params.main_tutor_id,
            substitute_tutor_a_id: substitutes.next(),
            substitute_tutor_b_id: substitutes.next(),
            weekdays: params.weekdays,
            start_time: params.start_time,
            end_time: params.end_time,
            start_date: params.start_date,
            end_date: params.end_date,
            is_online: params.is_online,
            offline_address: params.offline_address,
            offline_latitude: params.offline_location.map(|p| p.latitude),
            offline_longitude: params.offline_location.map(|p| p.longitude),
            max_distance_km: params.max_distance_km,
            session_fee: params.session_fee,
            status: ContractStatus::Active,
            created_at: Utc::now(),
        })
    }

    pub fn mode(&self) -> TeachingMode {
        TeachingMode::from_online_flag(self.is_online)
    }

    pub fn offline_location(&self) -> Option<GeoPoint> {
        match (self.offline_latitude, self.offline_longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
            _ => None,
        }
    }

    pub fn substitute_tutor_ids(&self) -> Vec<String> {
        self.substitute_tutor_a_id.iter()
            .chain(self.substitute_tutor_b_id.iter())
            .cloned()
            .collect()
    }
}
