//! Announcement model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::models::user::UserRole;

text_enum! {
    pub enum Audience {
        All => "all",
        Applicants => "applicants",
        Students => "students",
        Sponsors => "sponsors",
    }
}

impl Audience {
    /// Whether a reader with `role` (and student standing) is addressed
    pub fn includes(&self, role: UserRole, is_student: bool) -> bool {
        match self {
            Audience::All => true,
            Audience::Applicants => role == UserRole::Applicant && !is_student,
            Audience::Students => is_student,
            Audience::Sponsors => role == UserRole::Sponsor,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub audience: Audience,
    pub published_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub body: String,
    pub audience: Audience,
    pub published_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_targeting() {
        assert!(Audience::All.includes(UserRole::Sponsor, false));
        assert!(Audience::Applicants.includes(UserRole::Applicant, false));
        assert!(!Audience::Applicants.includes(UserRole::Applicant, true));
        assert!(Audience::Students.includes(UserRole::Applicant, true));
        assert!(!Audience::Sponsors.includes(UserRole::Admin, false));
    }
}
