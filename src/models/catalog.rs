//! Reference data: countries, universities and specializations

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub iso_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct University {
    pub id: i64,
    pub country_id: i64,
    pub name: String,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Specialization {
    pub id: i64,
    pub university_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCountryRequest {
    pub name: String,
    pub iso_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUniversityRequest {
    pub country_id: i64,
    pub name: String,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSpecializationRequest {
    pub university_id: i64,
    pub name: String,
}

/// Unset fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCountryRequest {
    pub name: Option<String>,
    pub iso_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUniversityRequest {
    pub name: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSpecializationRequest {
    pub name: Option<String>,
}
