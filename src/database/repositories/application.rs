//! Application repository: applications, status trail, appointments and
//! conversion of approved applicants into students

use sqlx::{PgPool, Postgres, Transaction};
use chrono::Utc;
use crate::database::connection::is_unique_violation;
use crate::models::application::{
    ApplicantApplication, ApplicationStatusTrail, Appointment, CreateApplicationRequest,
    ScheduleAppointmentRequest, StatusCount,
};
use crate::models::student::Student;
use crate::utils::errors::ScholarDeskError;
use crate::utils::helpers::format_student_number;
use crate::workflow::{ApplicationStatus, AppointmentStatus, StudentStatus};

const APPLICATION_COLUMNS: &str = "id, applicant_id, scholarship_id, status, motivation, rejection_reason, decided_at, created_at, updated_at";
const TRAIL_COLUMNS: &str = "id, application_id, from_status, to_status, changed_by, note, created_at";
const APPOINTMENT_COLUMNS: &str = "id, application_id, scheduled_by, scheduled_at, location, status, notes, created_at, updated_at";
pub(crate) const STUDENT_COLUMNS: &str = "id, user_id, applicant_id, application_id, scholarship_id, student_number, status, enrolled_at, updated_at";

#[derive(Clone, Debug)]
pub struct ApplicationRepository {
    pool: PgPool,
}

impl ApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a submitted application together with its first trail row
    pub async fn create(&self, applicant_id: i64, submitted_by: i64, request: CreateApplicationRequest) -> Result<ApplicantApplication, ScholarDeskError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let sql = format!(
            r#"
            INSERT INTO applicant_applications (applicant_id, scholarship_id, status, motivation, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {APPLICATION_COLUMNS}
            "#
        );
        let application = sqlx::query_as::<_, ApplicantApplication>(&sql)
            .bind(applicant_id)
            .bind(request.scholarship_id)
            .bind(ApplicationStatus::Submitted)
            .bind(request.motivation)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ScholarDeskError::Duplicate("application for this scholarship".to_string())
                } else {
                    e.into()
                }
            })?;

        Self::append_trail(&mut tx, application.id, None, ApplicationStatus::Submitted, submitted_by, None).await?;

        tx.commit().await?;
        Ok(application)
    }

    /// Find application by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<ApplicantApplication>, ScholarDeskError> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applicant_applications WHERE id = $1");
        let application = sqlx::query_as::<_, ApplicantApplication>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(application)
    }

    pub async fn list_for_applicant(&self, applicant_id: i64) -> Result<Vec<ApplicantApplication>, ScholarDeskError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applicant_applications WHERE applicant_id = $1 ORDER BY created_at DESC"
        );
        let applications = sqlx::query_as::<_, ApplicantApplication>(&sql)
            .bind(applicant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(applications)
    }

    pub async fn list_by_status(&self, status: ApplicationStatus, limit: i64, offset: i64) -> Result<Vec<ApplicantApplication>, ScholarDeskError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applicant_applications WHERE status = $1 ORDER BY created_at ASC LIMIT $2 OFFSET $3"
        );
        let applications = sqlx::query_as::<_, ApplicantApplication>(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(applications)
    }

    pub async fn list_for_scholarship(&self, scholarship_id: i64) -> Result<Vec<ApplicantApplication>, ScholarDeskError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applicant_applications WHERE scholarship_id = $1 ORDER BY created_at ASC"
        );
        let applications = sqlx::query_as::<_, ApplicantApplication>(&sql)
            .bind(scholarship_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(applications)
    }

    /// Move an application from `from` to `to` and record the change.
    ///
    /// The update only applies while the row is still in `from`, so a
    /// concurrent decision surfaces as an invalid transition.
    pub async fn transition(
        &self,
        id: i64,
        from: ApplicationStatus,
        to: ApplicationStatus,
        changed_by: i64,
        note: Option<String>,
    ) -> Result<ApplicantApplication, ScholarDeskError> {
        let mut tx = self.pool.begin().await?;
        let application = Self::update_status(&mut tx, id, from, to, note.as_deref()).await?;
        Self::append_trail(&mut tx, id, Some(from), to, changed_by, note).await?;
        tx.commit().await?;

        Ok(application)
    }

    /// Grant final approval and enroll the applicant as a student in one transaction
    pub async fn finalize(
        &self,
        id: i64,
        from: ApplicationStatus,
        changed_by: i64,
        note: Option<String>,
        student_number_prefix: &str,
    ) -> Result<(ApplicantApplication, Student), ScholarDeskError> {
        let mut tx = self.pool.begin().await?;

        let target: Option<(i64, i64, i64, Option<i32>)> = sqlx::query_as(
            r#"
            SELECT a.applicant_id, a.scholarship_id, ap.user_id, s.seats
            FROM applicant_applications a
            INNER JOIN applicants ap ON ap.id = a.applicant_id
            INNER JOIN scholarships s ON s.id = a.scholarship_id
            WHERE a.id = $1
            FOR UPDATE OF a, s
            "#
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let (applicant_id, scholarship_id, user_id, seats) =
            target.ok_or(ScholarDeskError::ApplicationNotFound { application_id: id })?;

        if let Some(seats) = seats {
            let enrolled: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM students WHERE scholarship_id = $1")
                .bind(scholarship_id)
                .fetch_one(&mut *tx)
                .await?;
            if enrolled.0 >= seats as i64 {
                return Err(ScholarDeskError::InvalidInput(format!(
                    "All {} seats of scholarship {} are taken",
                    seats, scholarship_id
                )));
            }
        }

        let application = Self::update_status(&mut tx, id, from, ApplicationStatus::FinalApproval, note.as_deref()).await?;
        Self::append_trail(&mut tx, id, Some(from), ApplicationStatus::FinalApproval, changed_by, note).await?;

        let sequence: (i64,) = sqlx::query_as("SELECT nextval('student_number_seq')")
            .fetch_one(&mut *tx)
            .await?;
        let now = Utc::now();
        let student_number = format_student_number(student_number_prefix, now, sequence.0);

        let sql = format!(
            r#"
            INSERT INTO students (user_id, applicant_id, application_id, scholarship_id, student_number, status, enrolled_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {STUDENT_COLUMNS}
            "#
        );
        let student = sqlx::query_as::<_, Student>(&sql)
            .bind(user_id)
            .bind(applicant_id)
            .bind(id)
            .bind(scholarship_id)
            .bind(&student_number)
            .bind(StudentStatus::Active)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ScholarDeskError::Duplicate(format!("user {} is already enrolled as a student", user_id))
                } else {
                    e.into()
                }
            })?;

        sqlx::query(
            r#"
            INSERT INTO student_status_trails (student_id, from_status, to_status, changed_by, note, created_at)
            VALUES ($1, NULL, $2, $3, $4, $5)
            "#
        )
        .bind(student.id)
        .bind(StudentStatus::Active)
        .bind(changed_by)
        .bind(format!("Enrolled from application {}", id))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((application, student))
    }

    async fn update_status(
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
        from: ApplicationStatus,
        to: ApplicationStatus,
        note: Option<&str>,
    ) -> Result<ApplicantApplication, ScholarDeskError> {
        let now = Utc::now();
        let rejection_reason = if to == ApplicationStatus::Rejected { note } else { None };
        let decided_at = if to.is_terminal() { Some(now) } else { None };

        let sql = format!(
            r#"
            UPDATE applicant_applications
            SET status = $3,
                rejection_reason = COALESCE($4, rejection_reason),
                decided_at = COALESCE($5, decided_at),
                updated_at = $6
            WHERE id = $1 AND status = $2
            RETURNING {APPLICATION_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ApplicantApplication>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(rejection_reason)
            .bind(decided_at)
            .bind(now)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| ScholarDeskError::transition(from, to))
    }

    async fn append_trail(
        tx: &mut Transaction<'_, Postgres>,
        application_id: i64,
        from: Option<ApplicationStatus>,
        to: ApplicationStatus,
        changed_by: i64,
        note: Option<String>,
    ) -> Result<(), ScholarDeskError> {
        sqlx::query(
            r#"
            INSERT INTO application_status_trails (application_id, from_status, to_status, changed_by, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#
        )
        .bind(application_id)
        .bind(from)
        .bind(to)
        .bind(changed_by)
        .bind(note)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Full status history, oldest first
    pub async fn trail(&self, application_id: i64) -> Result<Vec<ApplicationStatusTrail>, ScholarDeskError> {
        let sql = format!(
            "SELECT {TRAIL_COLUMNS} FROM application_status_trails WHERE application_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let trail = sqlx::query_as::<_, ApplicationStatusTrail>(&sql)
            .bind(application_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(trail)
    }

    pub async fn count_by_status(&self) -> Result<Vec<StatusCount>, ScholarDeskError> {
        let counts = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS total FROM applicant_applications GROUP BY status ORDER BY status ASC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }

    // Appointment methods
    pub async fn create_appointment(&self, scheduled_by: i64, request: ScheduleAppointmentRequest) -> Result<Appointment, ScholarDeskError> {
        let sql = format!(
            r#"
            INSERT INTO appointments (application_id, scheduled_by, scheduled_at, location, status, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        );
        let appointment = sqlx::query_as::<_, Appointment>(&sql)
            .bind(request.application_id)
            .bind(scheduled_by)
            .bind(request.scheduled_at)
            .bind(request.location)
            .bind(AppointmentStatus::Scheduled)
            .bind(request.notes)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        Ok(appointment)
    }

    pub async fn find_appointment(&self, id: i64) -> Result<Option<Appointment>, ScholarDeskError> {
        let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");
        let appointment = sqlx::query_as::<_, Appointment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(appointment)
    }

    pub async fn update_appointment_status(
        &self,
        id: i64,
        from: AppointmentStatus,
        to: AppointmentStatus,
        notes: Option<String>,
    ) -> Result<Appointment, ScholarDeskError> {
        let sql = format!(
            r#"
            UPDATE appointments
            SET status = $3, notes = COALESCE($4, notes), updated_at = $5
            WHERE id = $1 AND status = $2
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Appointment>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(notes)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ScholarDeskError::transition(from, to))
    }

    pub async fn list_appointments(&self, application_id: i64) -> Result<Vec<Appointment>, ScholarDeskError> {
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE application_id = $1 ORDER BY scheduled_at ASC"
        );
        let appointments = sqlx::query_as::<_, Appointment>(&sql)
            .bind(application_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(appointments)
    }

    pub async fn has_completed_appointment(&self, application_id: i64) -> Result<bool, ScholarDeskError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM appointments WHERE application_id = $1 AND status = $2"
        )
        .bind(application_id)
        .bind(AppointmentStatus::Completed)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }
}
