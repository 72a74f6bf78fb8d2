use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;

use crate::domain::services::distance::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserRole {
    Parent,
    Tutor,
    Staff,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
}

/// Identity record with the profile fields the matcher reads.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub rating: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub subjects: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(full_name: String, role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            full_name,
            role,
            status: UserStatus::Active,
            rating: None,
            latitude: None,
            longitude: None,
            subjects: Json(Vec::new()),
            created_at: Utc::now(),
        }
    }

    pub fn is_active_tutor(&self) -> bool {
        self.role == UserRole::Tutor && self.status == UserStatus::Active
    }

    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
            _ => None,
        }
    }

    pub fn teaches(&self, subject: &str) -> bool {
        self.subjects.iter().any(|s| s.eq_ignore_ascii_case(subject))
    }
}
