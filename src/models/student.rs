//! Student model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::workflow::StudentStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: i64,
    pub user_id: i64,
    pub applicant_id: i64,
    pub application_id: i64,
    pub scholarship_id: i64,
    pub student_number: String,
    pub status: StudentStatus,
    pub enrolled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentStatusTrail {
    pub id: i64,
    pub student_id: i64,
    pub from_status: Option<StudentStatus>,
    pub to_status: StudentStatus,
    pub changed_by: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
