//! Scholarship repository implementation

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::models::scholarship::{Scholarship, CreateScholarshipRequest, UpdateScholarshipRequest};
use crate::utils::errors::ScholarDeskError;

const SCHOLARSHIP_COLUMNS: &str = "id, title, description, sponsor_id, country_id, university_id, specialization_id, seats, opens_at, closes_at, is_active, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct ScholarshipRepository {
    pool: PgPool,
}

impl ScholarshipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new scholarship
    pub async fn create(&self, request: CreateScholarshipRequest) -> Result<Scholarship, ScholarDeskError> {
        let sql = format!(
            r#"
            INSERT INTO scholarships (title, description, sponsor_id, country_id, university_id, specialization_id, seats, opens_at, closes_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING {SCHOLARSHIP_COLUMNS}
            "#
        );
        let scholarship = sqlx::query_as::<_, Scholarship>(&sql)
            .bind(request.title)
            .bind(request.description)
            .bind(request.sponsor_id)
            .bind(request.country_id)
            .bind(request.university_id)
            .bind(request.specialization_id)
            .bind(request.seats)
            .bind(request.opens_at)
            .bind(request.closes_at)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        Ok(scholarship)
    }

    /// Find scholarship by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Scholarship>, ScholarDeskError> {
        let sql = format!("SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships WHERE id = $1");
        let scholarship = sqlx::query_as::<_, Scholarship>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(scholarship)
    }

    /// Update scholarship
    pub async fn update(&self, id: i64, request: UpdateScholarshipRequest) -> Result<Scholarship, ScholarDeskError> {
        let sql = format!(
            r#"
            UPDATE scholarships
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                seats = COALESCE($4, seats),
                opens_at = COALESCE($5, opens_at),
                closes_at = COALESCE($6, closes_at),
                is_active = COALESCE($7, is_active),
                updated_at = $8
            WHERE id = $1
            RETURNING {SCHOLARSHIP_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Scholarship>(&sql)
            .bind(id)
            .bind(request.title)
            .bind(request.description)
            .bind(request.seats)
            .bind(request.opens_at)
            .bind(request.closes_at)
            .bind(request.is_active)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ScholarDeskError::ScholarshipNotFound { scholarship_id: id })
    }

    /// Scholarships accepting applications at `now`
    pub async fn list_open(&self, now: DateTime<Utc>) -> Result<Vec<Scholarship>, ScholarDeskError> {
        let sql = format!(
            "SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships WHERE is_active = true AND opens_at <= $1 AND closes_at >= $1 ORDER BY closes_at ASC"
        );
        let scholarships = sqlx::query_as::<_, Scholarship>(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        Ok(scholarships)
    }

    pub async fn list_by_sponsor(&self, sponsor_id: i64) -> Result<Vec<Scholarship>, ScholarDeskError> {
        let sql = format!(
            "SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships WHERE sponsor_id = $1 ORDER BY created_at DESC"
        );
        let scholarships = sqlx::query_as::<_, Scholarship>(&sql)
            .bind(sponsor_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(scholarships)
    }

    /// Count total scholarships
    pub async fn count(&self) -> Result<i64, ScholarDeskError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scholarships")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
