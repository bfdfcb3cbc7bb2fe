//! Programs and opportunities offered to students

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use crate::workflow::ActivityApplicationStatus;

text_enum! {
    pub enum ActivityKind {
        Program => "program",
        Opportunity => "opportunity",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: i64,
    pub kind: ActivityKind,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Option<i32>,
    pub is_active: bool,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// Check-in window widened by `grace` on both sides
    pub fn accepts_check_in_at(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        self.is_active && self.starts_at - grace <= now && now <= self.ends_at + grace
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.ends_at < now
    }

    /// Past the grace tail, so no check-in can still succeed
    pub fn attendance_closed_at(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        self.ends_at + grace < now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateActivityRequest {
    pub kind: ActivityKind,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityApplication {
    pub id: i64,
    pub activity_id: i64,
    pub student_id: i64,
    pub status: ActivityApplicationStatus,
    pub excuse_reason: Option<String>,
    pub decided_by: Option<i64>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(start_offset_min: i64, length_min: i64) -> Activity {
        let now = Utc::now();
        let starts_at = now + Duration::minutes(start_offset_min);
        Activity {
            id: 7,
            kind: ActivityKind::Program,
            title: "Research Methods Workshop".to_string(),
            description: None,
            location: Some("Hall B".to_string()),
            starts_at,
            ends_at: starts_at + Duration::minutes(length_min),
            capacity: Some(30),
            is_active: true,
            created_by: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_check_in_window() {
        let now = Utc::now();
        let grace = Duration::minutes(30);
        assert!(activity(-10, 60).accepts_check_in_at(now, grace));
        assert!(activity(20, 60).accepts_check_in_at(now, grace));
        assert!(!activity(45, 60).accepts_check_in_at(now, grace));
        assert!(!activity(-120, 60).accepts_check_in_at(now, grace));
    }

    #[test]
    fn test_inactive_rejects_check_in() {
        let mut a = activity(-10, 60);
        a.is_active = false;
        assert!(!a.accepts_check_in_at(Utc::now(), Duration::minutes(30)));
    }
}
