//! Applicant repository: profiles, qualifications and document records

use sqlx::PgPool;
use chrono::Utc;
use crate::database::connection::is_unique_violation;
use crate::models::applicant::{
    Applicant, ApplicantProfileRequest, Qualification, CreateQualificationRequest,
    UpdateQualificationRequest, ApplicantDocument, DocumentKind,
};
use crate::utils::errors::ScholarDeskError;

const APPLICANT_COLUMNS: &str = "id, user_id, national_id, date_of_birth, gender, nationality_country_id, address, profile_completed, created_at, updated_at";
const QUALIFICATION_COLUMNS: &str = "id, applicant_id, level, institution, major, gpa, gpa_scale, graduation_year, certificate_path, created_at, updated_at";
const DOCUMENT_COLUMNS: &str = "id, applicant_id, kind, storage_path, original_name, content_type, size_bytes, uploaded_at";

/// Fields written when a document row is created or replaced
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub applicant_id: i64,
    pub kind: DocumentKind,
    pub storage_path: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
}

#[derive(Clone, Debug)]
pub struct ApplicantRepository {
    pool: PgPool,
}

impl ApplicantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the applicant profile for a user
    pub async fn create(&self, user_id: i64, request: ApplicantProfileRequest) -> Result<Applicant, ScholarDeskError> {
        let sql = format!(
            r#"
            INSERT INTO applicants (user_id, national_id, date_of_birth, gender, nationality_country_id, address, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {APPLICANT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Applicant>(&sql)
            .bind(user_id)
            .bind(request.national_id)
            .bind(request.date_of_birth)
            .bind(request.gender)
            .bind(request.nationality_country_id)
            .bind(request.address)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ScholarDeskError::Duplicate("applicant profile or national id".to_string())
                } else {
                    e.into()
                }
            })
    }

    /// Find applicant by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Applicant>, ScholarDeskError> {
        let sql = format!("SELECT {APPLICANT_COLUMNS} FROM applicants WHERE id = $1");
        let applicant = sqlx::query_as::<_, Applicant>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(applicant)
    }

    /// Find applicant by owning user
    pub async fn find_by_user_id(&self, user_id: i64) -> Result<Option<Applicant>, ScholarDeskError> {
        let sql = format!("SELECT {APPLICANT_COLUMNS} FROM applicants WHERE user_id = $1");
        let applicant = sqlx::query_as::<_, Applicant>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(applicant)
    }

    /// Update profile fields that are provided
    pub async fn update_profile(&self, id: i64, request: ApplicantProfileRequest) -> Result<Applicant, ScholarDeskError> {
        let sql = format!(
            r#"
            UPDATE applicants
            SET national_id = COALESCE($2, national_id),
                date_of_birth = COALESCE($3, date_of_birth),
                gender = COALESCE($4, gender),
                nationality_country_id = COALESCE($5, nationality_country_id),
                address = COALESCE($6, address),
                updated_at = $7
            WHERE id = $1
            RETURNING {APPLICANT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Applicant>(&sql)
            .bind(id)
            .bind(request.national_id)
            .bind(request.date_of_birth)
            .bind(request.gender)
            .bind(request.nationality_country_id)
            .bind(request.address)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ScholarDeskError::ApplicantNotFound { applicant_id: id })
    }

    pub async fn set_profile_completed(&self, id: i64, completed: bool) -> Result<(), ScholarDeskError> {
        sqlx::query("UPDATE applicants SET profile_completed = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(completed)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // Qualification methods
    /// Add a qualification
    pub async fn add_qualification(&self, applicant_id: i64, request: CreateQualificationRequest) -> Result<Qualification, ScholarDeskError> {
        let sql = format!(
            r#"
            INSERT INTO qualifications (applicant_id, level, institution, major, gpa, gpa_scale, graduation_year, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {QUALIFICATION_COLUMNS}
            "#
        );
        let qualification = sqlx::query_as::<_, Qualification>(&sql)
            .bind(applicant_id)
            .bind(request.level)
            .bind(request.institution)
            .bind(request.major)
            .bind(request.gpa)
            .bind(request.gpa_scale)
            .bind(request.graduation_year)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        Ok(qualification)
    }

    pub async fn find_qualification(&self, id: i64) -> Result<Option<Qualification>, ScholarDeskError> {
        let sql = format!("SELECT {QUALIFICATION_COLUMNS} FROM qualifications WHERE id = $1");
        let qualification = sqlx::query_as::<_, Qualification>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(qualification)
    }

    pub async fn update_qualification(&self, id: i64, request: UpdateQualificationRequest) -> Result<Qualification, ScholarDeskError> {
        let sql = format!(
            r#"
            UPDATE qualifications
            SET level = COALESCE($2, level),
                institution = COALESCE($3, institution),
                major = COALESCE($4, major),
                gpa = COALESCE($5, gpa),
                gpa_scale = COALESCE($6, gpa_scale),
                graduation_year = COALESCE($7, graduation_year),
                updated_at = $8
            WHERE id = $1
            RETURNING {QUALIFICATION_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Qualification>(&sql)
            .bind(id)
            .bind(request.level)
            .bind(request.institution)
            .bind(request.major)
            .bind(request.gpa)
            .bind(request.gpa_scale)
            .bind(request.graduation_year)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ScholarDeskError::NotFound { entity: "Qualification", id })
    }

    /// Point a qualification at a new certificate, returning the previous path
    pub async fn set_certificate_path(&self, id: i64, path: &str) -> Result<Option<String>, ScholarDeskError> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<(Option<String>,)> =
            sqlx::query_as("SELECT certificate_path FROM qualifications WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let previous = previous.ok_or(ScholarDeskError::NotFound { entity: "Qualification", id })?.0;

        sqlx::query("UPDATE qualifications SET certificate_path = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(path)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(previous)
    }

    /// Delete a qualification, returning it so its certificate can be removed
    pub async fn delete_qualification(&self, id: i64) -> Result<Option<Qualification>, ScholarDeskError> {
        let sql = format!("DELETE FROM qualifications WHERE id = $1 RETURNING {QUALIFICATION_COLUMNS}");
        let deleted = sqlx::query_as::<_, Qualification>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(deleted)
    }

    pub async fn list_qualifications(&self, applicant_id: i64) -> Result<Vec<Qualification>, ScholarDeskError> {
        let sql = format!(
            "SELECT {QUALIFICATION_COLUMNS} FROM qualifications WHERE applicant_id = $1 ORDER BY graduation_year DESC, id ASC"
        );
        let qualifications = sqlx::query_as::<_, Qualification>(&sql)
            .bind(applicant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(qualifications)
    }

    pub async fn count_qualifications(&self, applicant_id: i64) -> Result<i64, ScholarDeskError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM qualifications WHERE applicant_id = $1")
            .bind(applicant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    // Document methods
    pub async fn find_document(&self, applicant_id: i64, kind: DocumentKind) -> Result<Option<ApplicantDocument>, ScholarDeskError> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM applicant_documents WHERE applicant_id = $1 AND kind = $2");
        let document = sqlx::query_as::<_, ApplicantDocument>(&sql)
            .bind(applicant_id)
            .bind(kind)
            .fetch_optional(&self.pool)
            .await?;

        Ok(document)
    }

    /// Insert or replace the document of a kind, returning the superseded storage path
    pub async fn upsert_document(&self, record: DocumentRecord) -> Result<(ApplicantDocument, Option<String>), ScholarDeskError> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<(String,)> = sqlx::query_as(
            "SELECT storage_path FROM applicant_documents WHERE applicant_id = $1 AND kind = $2 FOR UPDATE",
        )
        .bind(record.applicant_id)
        .bind(record.kind)
        .fetch_optional(&mut *tx)
        .await?;

        let sql = format!(
            r#"
            INSERT INTO applicant_documents (applicant_id, kind, storage_path, original_name, content_type, size_bytes, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (applicant_id, kind)
            DO UPDATE SET
                storage_path = EXCLUDED.storage_path,
                original_name = EXCLUDED.original_name,
                content_type = EXCLUDED.content_type,
                size_bytes = EXCLUDED.size_bytes,
                uploaded_at = EXCLUDED.uploaded_at
            RETURNING {DOCUMENT_COLUMNS}
            "#
        );
        let document = sqlx::query_as::<_, ApplicantDocument>(&sql)
            .bind(record.applicant_id)
            .bind(record.kind)
            .bind(record.storage_path)
            .bind(record.original_name)
            .bind(record.content_type)
            .bind(record.size_bytes)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((document, previous.map(|p| p.0)))
    }

    /// Remove the document row of a kind, returning it
    pub async fn delete_document(&self, applicant_id: i64, kind: DocumentKind) -> Result<Option<ApplicantDocument>, ScholarDeskError> {
        let sql = format!(
            "DELETE FROM applicant_documents WHERE applicant_id = $1 AND kind = $2 RETURNING {DOCUMENT_COLUMNS}"
        );
        let deleted = sqlx::query_as::<_, ApplicantDocument>(&sql)
            .bind(applicant_id)
            .bind(kind)
            .fetch_optional(&self.pool)
            .await?;

        Ok(deleted)
    }

    pub async fn list_documents(&self, applicant_id: i64) -> Result<Vec<ApplicantDocument>, ScholarDeskError> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM applicant_documents WHERE applicant_id = $1 ORDER BY kind ASC"
        );
        let documents = sqlx::query_as::<_, ApplicantDocument>(&sql)
            .bind(applicant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(documents)
    }
}
