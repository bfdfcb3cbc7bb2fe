//! Student service request model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::workflow::{RequestKind, RequestStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentRequest {
    pub id: i64,
    pub student_id: i64,
    pub kind: RequestKind,
    pub details: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RequestStatusTrail {
    pub id: i64,
    pub request_id: i64,
    pub from_status: Option<RequestStatus>,
    pub to_status: RequestStatus,
    pub changed_by: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStudentRequest {
    pub kind: RequestKind,
    pub details: String,
}
