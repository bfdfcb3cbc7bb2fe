//! Cross-table counts for the admin dashboard

use sqlx::PgPool;
use crate::utils::errors::ScholarDeskError;

#[derive(Clone, Debug)]
pub struct StatsRepository {
    pool: PgPool,
}

impl StatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str) -> Result<i64, ScholarDeskError> {
        let row: (i64,) = sqlx::query_as(sql).fetch_one(&self.pool).await?;
        Ok(row.0)
    }

    async fn grouped(&self, sql: &str) -> Result<serde_json::Map<String, serde_json::Value>, ScholarDeskError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(sql).fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(key, total)| (key, serde_json::Value::from(total)))
            .collect())
    }

    /// Get statistics
    pub async fn get_stats(&self) -> Result<serde_json::Value, ScholarDeskError> {
        let users = self.grouped("SELECT role, COUNT(*) FROM users GROUP BY role").await?;
        let applications = self
            .grouped("SELECT status, COUNT(*) FROM applicant_applications GROUP BY status")
            .await?;
        let students = self.grouped("SELECT status, COUNT(*) FROM students GROUP BY status").await?;
        let tickets = self.grouped("SELECT status, COUNT(*) FROM tickets GROUP BY status").await?;
        let requests = self
            .grouped("SELECT status, COUNT(*) FROM student_requests GROUP BY status")
            .await?;

        let scholarships = self.count("SELECT COUNT(*) FROM scholarships").await?;
        let open_scholarships = self
            .count("SELECT COUNT(*) FROM scholarships WHERE is_active = true AND opens_at <= NOW() AND closes_at >= NOW()")
            .await?;
        let upcoming_activities = self
            .count("SELECT COUNT(*) FROM activities WHERE is_active = true AND ends_at >= NOW()")
            .await?;

        let stats = serde_json::json!({
            "users": users,
            "scholarships": {
                "total": scholarships,
                "open": open_scholarships
            },
            "applications": applications,
            "students": students,
            "activities": {
                "upcoming": upcoming_activities
            },
            "tickets": tickets,
            "requests": requests
        });

        Ok(stats)
    }
}
