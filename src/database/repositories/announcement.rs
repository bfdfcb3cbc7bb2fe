//! Announcement repository

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::models::announcement::{Announcement, Audience, CreateAnnouncementRequest};
use crate::utils::errors::ScholarDeskError;

const ANNOUNCEMENT_COLUMNS: &str =
    "id, title, body, audience, published_at, expires_at, created_by, created_at";

#[derive(Clone, Debug)]
pub struct AnnouncementRepository {
    pool: PgPool,
}

impl AnnouncementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, created_by: i64, request: CreateAnnouncementRequest) -> Result<Announcement, ScholarDeskError> {
        let now = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO announcements (title, body, audience, published_at, expires_at, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ANNOUNCEMENT_COLUMNS}
            "#
        );
        let announcement = sqlx::query_as::<_, Announcement>(&sql)
            .bind(request.title)
            .bind(request.body)
            .bind(request.audience)
            .bind(request.published_at.unwrap_or(now))
            .bind(request.expires_at)
            .bind(created_by)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(announcement)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Announcement>, ScholarDeskError> {
        let sql = format!("SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements WHERE id = $1");
        let announcement = sqlx::query_as::<_, Announcement>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(announcement)
    }

    /// Published, unexpired announcements for any of `audiences`, newest first
    pub async fn list_visible(&self, audiences: &[Audience], now: DateTime<Utc>) -> Result<Vec<Announcement>, ScholarDeskError> {
        let audiences: Vec<&str> = audiences.iter().map(Audience::as_str).collect();
        let sql = format!(
            r#"
            SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements
            WHERE audience = ANY($1)
              AND published_at <= $2
              AND (expires_at IS NULL OR expires_at > $2)
            ORDER BY published_at DESC
            "#
        );
        let announcements = sqlx::query_as::<_, Announcement>(&sql)
            .bind(audiences)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        Ok(announcements)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, ScholarDeskError> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
