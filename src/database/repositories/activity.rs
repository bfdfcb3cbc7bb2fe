//! Activity repository: programs, opportunities and participation records

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::database::connection::is_unique_violation;
use crate::models::activity::{Activity, ActivityKind, ActivityApplication, CreateActivityRequest};
use crate::utils::errors::ScholarDeskError;
use crate::workflow::ActivityApplicationStatus;

const ACTIVITY_COLUMNS: &str = "id, kind, title, description, location, starts_at, ends_at, capacity, is_active, created_by, created_at, updated_at";
const PARTICIPATION_COLUMNS: &str = "id, activity_id, student_id, status, excuse_reason, decided_by, checked_in_at, created_at, updated_at";

fn seat_holding_statuses() -> Vec<&'static str> {
    ActivityApplicationStatus::ALL
        .iter()
        .filter(|s| s.holds_seat())
        .map(|s| s.as_str())
        .collect()
}

#[derive(Clone, Debug)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new program or opportunity
    pub async fn create(&self, created_by: i64, request: CreateActivityRequest) -> Result<Activity, ScholarDeskError> {
        let sql = format!(
            r#"
            INSERT INTO activities (kind, title, description, location, starts_at, ends_at, capacity, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {ACTIVITY_COLUMNS}
            "#
        );
        let activity = sqlx::query_as::<_, Activity>(&sql)
            .bind(request.kind)
            .bind(request.title)
            .bind(request.description)
            .bind(request.location)
            .bind(request.starts_at)
            .bind(request.ends_at)
            .bind(request.capacity)
            .bind(created_by)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        Ok(activity)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Activity>, ScholarDeskError> {
        let sql = format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = $1");
        let activity = sqlx::query_as::<_, Activity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(activity)
    }

    /// Active activities that have not ended, soonest first
    pub async fn list_upcoming(&self, kind: Option<ActivityKind>, now: DateTime<Utc>) -> Result<Vec<Activity>, ScholarDeskError> {
        let sql = format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE is_active = true AND ends_at >= $1 AND ($2::text IS NULL OR kind = $2) ORDER BY starts_at ASC"
        );
        let activities = sqlx::query_as::<_, Activity>(&sql)
            .bind(now)
            .bind(kind)
            .fetch_all(&self.pool)
            .await?;

        Ok(activities)
    }

    pub async fn set_active(&self, id: i64, is_active: bool) -> Result<Activity, ScholarDeskError> {
        let sql = format!(
            "UPDATE activities SET is_active = $2, updated_at = $3 WHERE id = $1 RETURNING {ACTIVITY_COLUMNS}"
        );
        sqlx::query_as::<_, Activity>(&sql)
            .bind(id)
            .bind(is_active)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ScholarDeskError::ActivityNotFound { activity_id: id })
    }

    /// Activities that ended before `cutoff` and still have accepted, unattended participants
    pub async fn list_ended_with_pending_attendance(&self, cutoff: DateTime<Utc>) -> Result<Vec<Activity>, ScholarDeskError> {
        let sql = format!(
            r#"
            SELECT {ACTIVITY_COLUMNS} FROM activities a
            WHERE a.ends_at < $1
              AND EXISTS (
                  SELECT 1 FROM activity_applications p
                  WHERE p.activity_id = a.id AND p.status = $2
              )
            ORDER BY a.ends_at ASC
            "#
        );
        let activities = sqlx::query_as::<_, Activity>(&sql)
            .bind(cutoff)
            .bind(ActivityApplicationStatus::Accepted)
            .fetch_all(&self.pool)
            .await?;

        Ok(activities)
    }

    /// Applications currently occupying a seat
    pub async fn count_seats_taken(&self, activity_id: i64) -> Result<i64, ScholarDeskError> {
        let taken: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM activity_applications WHERE activity_id = $1 AND status = ANY($2)"
        )
        .bind(activity_id)
        .bind(seat_holding_statuses())
        .fetch_one(&self.pool)
        .await?;

        Ok(taken.0)
    }

    // Participation methods
    pub async fn create_application(&self, activity_id: i64, student_id: i64) -> Result<ActivityApplication, ScholarDeskError> {
        let sql = format!(
            r#"
            INSERT INTO activity_applications (activity_id, student_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING {PARTICIPATION_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ActivityApplication>(&sql)
            .bind(activity_id)
            .bind(student_id)
            .bind(ActivityApplicationStatus::Pending)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ScholarDeskError::Duplicate(format!("application to activity {}", activity_id))
                } else {
                    e.into()
                }
            })
    }

    pub async fn find_application(&self, id: i64) -> Result<Option<ActivityApplication>, ScholarDeskError> {
        let sql = format!("SELECT {PARTICIPATION_COLUMNS} FROM activity_applications WHERE id = $1");
        let application = sqlx::query_as::<_, ActivityApplication>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(application)
    }

    pub async fn find_application_for(&self, activity_id: i64, student_id: i64) -> Result<Option<ActivityApplication>, ScholarDeskError> {
        let sql = format!(
            "SELECT {PARTICIPATION_COLUMNS} FROM activity_applications WHERE activity_id = $1 AND student_id = $2"
        );
        let application = sqlx::query_as::<_, ActivityApplication>(&sql)
            .bind(activity_id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(application)
    }

    /// Guarded status change; `excuse_reason` is stored when provided
    pub async fn transition_application(
        &self,
        id: i64,
        from: ActivityApplicationStatus,
        to: ActivityApplicationStatus,
        decided_by: Option<i64>,
        excuse_reason: Option<String>,
    ) -> Result<ActivityApplication, ScholarDeskError> {
        let sql = format!(
            r#"
            UPDATE activity_applications
            SET status = $3,
                decided_by = COALESCE($4, decided_by),
                excuse_reason = COALESCE($5, excuse_reason),
                updated_at = $6
            WHERE id = $1 AND status = $2
            RETURNING {PARTICIPATION_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ActivityApplication>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(decided_by)
            .bind(excuse_reason)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ScholarDeskError::transition(from, to))
    }

    /// Accept a pending application if the activity still has room
    pub async fn accept_application(&self, id: i64, decided_by: i64) -> Result<ActivityApplication, ScholarDeskError> {
        let mut tx = self.pool.begin().await?;

        let capacity: Option<(i64, Option<i32>)> = sqlx::query_as(
            r#"
            SELECT a.id, a.capacity FROM activities a
            INNER JOIN activity_applications p ON p.activity_id = a.id
            WHERE p.id = $1
            FOR UPDATE OF a
            "#
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let (activity_id, capacity) = capacity.ok_or(ScholarDeskError::NotFound { entity: "Activity application", id })?;

        if let Some(capacity) = capacity {
            let taken: (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM activity_applications WHERE activity_id = $1 AND status = ANY($2)"
            )
            .bind(activity_id)
            .bind(seat_holding_statuses())
            .fetch_one(&mut *tx)
            .await?;
            if taken.0 >= capacity as i64 {
                return Err(ScholarDeskError::InvalidInput(format!(
                    "Activity {} is full ({} seats)",
                    activity_id, capacity
                )));
            }
        }

        let sql = format!(
            r#"
            UPDATE activity_applications
            SET status = $3, decided_by = $4, updated_at = $5
            WHERE id = $1 AND status = $2
            RETURNING {PARTICIPATION_COLUMNS}
            "#
        );
        let application = sqlx::query_as::<_, ActivityApplication>(&sql)
            .bind(id)
            .bind(ActivityApplicationStatus::Pending)
            .bind(ActivityApplicationStatus::Accepted)
            .bind(decided_by)
            .bind(Utc::now())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ScholarDeskError::transition(ActivityApplicationStatus::Pending, ActivityApplicationStatus::Accepted))?;

        tx.commit().await?;
        Ok(application)
    }

    /// Mark an accepted participant as attended
    pub async fn check_in(&self, id: i64, at: DateTime<Utc>) -> Result<ActivityApplication, ScholarDeskError> {
        let sql = format!(
            r#"
            UPDATE activity_applications
            SET status = $3, checked_in_at = $4, updated_at = $4
            WHERE id = $1 AND status = $2
            RETURNING {PARTICIPATION_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ActivityApplication>(&sql)
            .bind(id)
            .bind(ActivityApplicationStatus::Accepted)
            .bind(ActivityApplicationStatus::Attended)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ScholarDeskError::transition(ActivityApplicationStatus::Accepted, ActivityApplicationStatus::Attended))
    }

    /// Every still-accepted participant of the activity becomes absent
    pub async fn mark_absentees(&self, activity_id: i64) -> Result<u64, ScholarDeskError> {
        let result = sqlx::query(
            "UPDATE activity_applications SET status = $3, updated_at = $4 WHERE activity_id = $1 AND status = $2"
        )
        .bind(activity_id)
        .bind(ActivityApplicationStatus::Accepted)
        .bind(ActivityApplicationStatus::Absent)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn list_applications(&self, activity_id: i64) -> Result<Vec<ActivityApplication>, ScholarDeskError> {
        let sql = format!(
            "SELECT {PARTICIPATION_COLUMNS} FROM activity_applications WHERE activity_id = $1 ORDER BY created_at ASC"
        );
        let applications = sqlx::query_as::<_, ActivityApplication>(&sql)
            .bind(activity_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(applications)
    }

    pub async fn list_for_student(&self, student_id: i64) -> Result<Vec<ActivityApplication>, ScholarDeskError> {
        let sql = format!(
            "SELECT {PARTICIPATION_COLUMNS} FROM activity_applications WHERE student_id = $1 ORDER BY created_at DESC"
        );
        let applications = sqlx::query_as::<_, ActivityApplication>(&sql)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(applications)
    }
}
