//! Student request repository

use sqlx::PgPool;
use chrono::Utc;
use crate::models::request::{StudentRequest, RequestStatusTrail, CreateStudentRequest};
use crate::utils::errors::ScholarDeskError;
use crate::workflow::RequestStatus;

const REQUEST_COLUMNS: &str = "id, student_id, kind, details, status, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct RequestRepository {
    pool: PgPool,
}

impl RequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// File a request and record its initial trail entry
    pub async fn create(&self, student_id: i64, submitted_by: i64, request: CreateStudentRequest) -> Result<StudentRequest, ScholarDeskError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let sql = format!(
            r#"
            INSERT INTO student_requests (student_id, kind, details, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {REQUEST_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, StudentRequest>(&sql)
            .bind(student_id)
            .bind(request.kind)
            .bind(request.details)
            .bind(RequestStatus::Pending)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO request_status_trails (request_id, from_status, to_status, changed_by, note, created_at)
            VALUES ($1, NULL, $2, $3, NULL, $4)
            "#
        )
        .bind(created.id)
        .bind(RequestStatus::Pending)
        .bind(submitted_by)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<StudentRequest>, ScholarDeskError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM student_requests WHERE id = $1");
        let request = sqlx::query_as::<_, StudentRequest>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(request)
    }

    pub async fn transition(
        &self,
        id: i64,
        from: RequestStatus,
        to: RequestStatus,
        changed_by: i64,
        note: Option<String>,
    ) -> Result<StudentRequest, ScholarDeskError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let sql = format!(
            r#"
            UPDATE student_requests SET status = $3, updated_at = $4
            WHERE id = $1 AND status = $2
            RETURNING {REQUEST_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, StudentRequest>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ScholarDeskError::transition(from, to))?;

        sqlx::query(
            r#"
            INSERT INTO request_status_trails (request_id, from_status, to_status, changed_by, note, created_at)
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
        Ok(updated)
    }

    pub async fn trail(&self, request_id: i64) -> Result<Vec<RequestStatusTrail>, ScholarDeskError> {
        let trail = sqlx::query_as::<_, RequestStatusTrail>(
            r#"
            SELECT id, request_id, from_status, to_status, changed_by, note, created_at
            FROM request_status_trails
            WHERE request_id = $1
            ORDER BY created_at ASC, id ASC
            "#
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(trail)
    }

    pub async fn list_for_student(&self, student_id: i64) -> Result<Vec<StudentRequest>, ScholarDeskError> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM student_requests WHERE student_id = $1 ORDER BY created_at DESC"
        );
        let requests = sqlx::query_as::<_, StudentRequest>(&sql)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(requests)
    }

    pub async fn list_by_status(&self, status: RequestStatus, limit: i64, offset: i64) -> Result<Vec<StudentRequest>, ScholarDeskError> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM student_requests WHERE status = $1 ORDER BY created_at ASC LIMIT $2 OFFSET $3"
        );
        let requests = sqlx::query_as::<_, StudentRequest>(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(requests)
    }
}
