//! Student repository implementation

use sqlx::PgPool;
use chrono::Utc;
use super::application::STUDENT_COLUMNS;
use crate::models::student::{Student, StudentStatusTrail};
use crate::utils::errors::ScholarDeskError;
use crate::workflow::StudentStatus;

#[derive(Clone, Debug)]
pub struct StudentRepository {
    pool: PgPool,
}

impl StudentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Student>, ScholarDeskError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1");
        let student = sqlx::query_as::<_, Student>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(student)
    }

    pub async fn find_by_user_id(&self, user_id: i64) -> Result<Option<Student>, ScholarDeskError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE user_id = $1");
        let student = sqlx::query_as::<_, Student>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(student)
    }

    pub async fn find_by_number(&self, student_number: &str) -> Result<Option<Student>, ScholarDeskError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE student_number = $1");
        let student = sqlx::query_as::<_, Student>(&sql)
            .bind(student_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(student)
    }

    /// List students, optionally filtered by status
    pub async fn list(&self, status: Option<StudentStatus>, limit: i64, offset: i64) -> Result<Vec<Student>, ScholarDeskError> {
        let sql = format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE ($1::text IS NULL OR status = $1) ORDER BY enrolled_at DESC LIMIT $2 OFFSET $3"
        );
        let students = sqlx::query_as::<_, Student>(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(students)
    }

    /// Change status and append a trail row atomically
    pub async fn transition(
        &self,
        id: i64,
        from: StudentStatus,
        to: StudentStatus,
        changed_by: i64,
        note: Option<String>,
    ) -> Result<Student, ScholarDeskError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let sql = format!(
            r#"
            UPDATE students SET status = $3, updated_at = $4
            WHERE id = $1 AND status = $2
            RETURNING {STUDENT_COLUMNS}
            "#
        );
        let student = sqlx::query_as::<_, Student>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ScholarDeskError::transition(from, to))?;

        sqlx::query(
            r#"
            INSERT INTO student_status_trails (student_id, from_status, to_status, changed_by, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(changed_by)
        .bind(note)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(student)
    }

    pub async fn trail(&self, student_id: i64) -> Result<Vec<StudentStatusTrail>, ScholarDeskError> {
        let trail = sqlx::query_as::<_, StudentStatusTrail>(
            r#"
            SELECT id, student_id, from_status, to_status, changed_by, note, created_at
            FROM student_status_trails
            WHERE student_id = $1
            ORDER BY created_at ASC, id ASC
            "#
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(trail)
    }

    pub async fn count(&self) -> Result<i64, ScholarDeskError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM students")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
