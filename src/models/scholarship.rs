//! Scholarship model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Scholarship {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub sponsor_id: Option<i64>,
    pub country_id: Option<i64>,
    pub university_id: Option<i64>,
    pub specialization_id: Option<i64>,
    pub seats: Option<i32>,
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scholarship {
    /// Accepting applications at `now`
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.opens_at <= now && now <= self.closes_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScholarshipRequest {
    pub title: String,
    pub description: Option<String>,
    pub sponsor_id: Option<i64>,
    pub country_id: Option<i64>,
    pub university_id: Option<i64>,
    pub specialization_id: Option<i64>,
    pub seats: Option<i32>,
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateScholarshipRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub seats: Option<i32>,
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn scholarship(opens_in: i64, closes_in: i64, active: bool) -> Scholarship {
        let now = Utc::now();
        Scholarship {
            id: 1,
            title: "Engineering Excellence".to_string(),
            description: None,
            sponsor_id: None,
            country_id: None,
            university_id: None,
            specialization_id: None,
            seats: Some(10),
            opens_at: now + Duration::days(opens_in),
            closes_at: now + Duration::days(closes_in),
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_open_window() {
        let now = Utc::now();
        assert!(scholarship(-1, 1, true).is_open_at(now));
        assert!(!scholarship(1, 2, true).is_open_at(now));
        assert!(!scholarship(-2, -1, true).is_open_at(now));
        assert!(!scholarship(-1, 1, false).is_open_at(now));
    }
}
