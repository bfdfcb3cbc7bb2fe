//! Scholarship application, its status trail and meeting appointments

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::workflow::{ApplicationStatus, AppointmentStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicantApplication {
    pub id: i64,
    pub applicant_id: i64,
    pub scholarship_id: i64,
    pub status: ApplicationStatus,
    pub motivation: Option<String>,
    pub rejection_reason: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplicationRequest {
    pub scholarship_id: i64,
    pub motivation: Option<String>,
}

/// One append-only row per status change
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationStatusTrail {
    pub id: i64,
    pub application_id: i64,
    pub from_status: Option<ApplicationStatus>,
    pub to_status: ApplicationStatus,
    pub changed_by: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: i64,
    pub application_id: i64,
    pub scheduled_by: i64,
    pub scheduled_at: DateTime<Utc>,
    pub location: Option<String>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleAppointmentRequest {
    pub application_id: i64,
    pub scheduled_at: DateTime<Utc>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Count of applications per status
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StatusCount {
    pub status: String,
    pub total: i64,
}
