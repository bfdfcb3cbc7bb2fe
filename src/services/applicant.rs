//! Applicant service
//!
//! Profiles, academic qualifications and uploaded documents. Replacing a
//! document writes the new object first, then swaps the row, then removes the
//! superseded object; if the row update fails the fresh object is removed.

use std::sync::Arc;
use chrono::{Datelike, Utc};
use tracing::{info, warn, debug};
use crate::database::DatabaseService;
use crate::database::repositories::DocumentRecord;
use crate::models::applicant::{
    Applicant, ApplicantDocument, ApplicantProfileRequest, CreateQualificationRequest, DocumentKind,
    DocumentUpload, GpaScale, Qualification, UpdateQualificationRequest,
};
use crate::models::user::{User, UserRole};
use crate::services::auth::{AuthService, Permission};
use crate::storage::paths::content_type_for;
use crate::storage::{DocumentPolicy, DocumentStorage};
use crate::utils::errors::{ScholarDeskError, StorageError, Result};
use crate::utils::helpers::{require_text, sanitize_filename};
use crate::utils::logging::log_document_event;

/// Oldest graduation year accepted for a qualification
pub const MIN_GRADUATION_YEAR: i32 = 1950;

/// GPA within the scale (four-point when unspecified) and a graduation year not in the future
pub fn validate_qualification(gpa: Option<f64>, scale: Option<GpaScale>, graduation_year: i32, current_year: i32) -> Result<()> {
    if let Some(gpa) = gpa {
        let max = scale.unwrap_or(GpaScale::FourPoint).max();
        if !gpa.is_finite() || !(0.0..=max).contains(&gpa) {
            return Err(ScholarDeskError::InvalidInput(format!(
                "GPA {} is outside 0..={}",
                gpa, max
            )));
        }
    }

    if graduation_year < MIN_GRADUATION_YEAR || graduation_year > current_year {
        return Err(ScholarDeskError::InvalidInput(format!(
            "Graduation year {} must be between {} and {}",
            graduation_year, MIN_GRADUATION_YEAR, current_year
        )));
    }

    Ok(())
}

/// At least one qualification plus every required document kind
pub fn is_profile_complete(qualification_count: i64, documents: &[DocumentKind]) -> bool {
    qualification_count > 0 && DocumentKind::REQUIRED.iter().all(|k| documents.contains(k))
}

#[derive(Clone, Debug)]
pub struct ApplicantService {
    db: DatabaseService,
    storage: Arc<dyn DocumentStorage>,
    policy: DocumentPolicy,
    auth: AuthService,
}

impl ApplicantService {
    pub fn new(db: DatabaseService, storage: Arc<dyn DocumentStorage>, policy: DocumentPolicy) -> Self {
        Self {
            db,
            storage,
            policy,
            auth: AuthService::new(),
        }
    }

    /// Create the caller's applicant profile
    pub async fn create_profile(&self, user: &User, request: ApplicantProfileRequest) -> Result<Applicant> {
        self.auth.require_role(user, &[UserRole::Applicant])?;
        if self.db.applicants.find_by_user_id(user.id).await?.is_some() {
            return Err(ScholarDeskError::Duplicate(format!("applicant profile for user {}", user.id)));
        }

        let applicant = self.db.applicants.create(user.id, Self::clean_profile(request)).await?;
        info!(applicant_id = applicant.id, user_id = user.id, "Applicant profile created");
        Ok(applicant)
    }

    /// The caller's own profile
    pub async fn get_profile(&self, user: &User) -> Result<Applicant> {
        self.db.applicants.find_by_user_id(user.id).await?
            .ok_or_else(|| ScholarDeskError::InvalidInput(format!("User {} has no applicant profile", user.id)))
    }

    /// Any profile, for its owner or staff
    pub async fn get_applicant(&self, actor: &User, applicant_id: i64) -> Result<Applicant> {
        let applicant = self.db.applicants.find_by_id(applicant_id).await?
            .ok_or(ScholarDeskError::ApplicantNotFound { applicant_id })?;
        self.auth.require_owner_or(actor, applicant.user_id, Permission::ReviewApplications)?;
        Ok(applicant)
    }

    pub async fn update_profile(&self, user: &User, request: ApplicantProfileRequest) -> Result<Applicant> {
        let applicant = self.get_profile(user).await?;
        let updated = self.db.applicants.update_profile(applicant.id, Self::clean_profile(request)).await?;
        debug!(applicant_id = applicant.id, "Applicant profile updated");
        Ok(updated)
    }

    fn clean_profile(request: ApplicantProfileRequest) -> ApplicantProfileRequest {
        ApplicantProfileRequest {
            national_id: request.national_id.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
            address: request.address.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
            ..request
        }
    }

    // Qualifications
    pub async fn add_qualification(&self, user: &User, request: CreateQualificationRequest) -> Result<Qualification> {
        let applicant = self.get_profile(user).await?;
        validate_qualification(request.gpa, request.gpa_scale, request.graduation_year, Utc::now().year())?;

        let request = CreateQualificationRequest {
            institution: require_text("Institution", &request.institution)?,
            ..request
        };
        let qualification = self.db.applicants.add_qualification(applicant.id, request).await?;
        self.refresh_profile_completeness(applicant.id).await?;

        info!(applicant_id = applicant.id, qualification_id = qualification.id, "Qualification added");
        Ok(qualification)
    }

    async fn own_qualification(&self, user: &User, qualification_id: i64) -> Result<(Applicant, Qualification)> {
        let applicant = self.get_profile(user).await?;
        let qualification = self.db.applicants.find_qualification(qualification_id).await?
            .filter(|q| q.applicant_id == applicant.id)
            .ok_or(ScholarDeskError::NotFound { entity: "Qualification", id: qualification_id })?;
        Ok((applicant, qualification))
    }

    pub async fn update_qualification(&self, user: &User, qualification_id: i64, request: UpdateQualificationRequest) -> Result<Qualification> {
        let (_, current) = self.own_qualification(user, qualification_id).await?;
        validate_qualification(
            request.gpa.or(current.gpa),
            request.gpa_scale.or(current.gpa_scale),
            request.graduation_year.unwrap_or(current.graduation_year),
            Utc::now().year(),
        )?;

        let request = UpdateQualificationRequest {
            institution: request.institution.map(|i| require_text("Institution", &i)).transpose()?,
            ..request
        };
        self.db.applicants.update_qualification(qualification_id, request).await
    }

    pub async fn delete_qualification(&self, user: &User, qualification_id: i64) -> Result<()> {
        let (applicant, _) = self.own_qualification(user, qualification_id).await?;
        if let Some(deleted) = self.db.applicants.delete_qualification(qualification_id).await? {
            if let Some(path) = deleted.certificate_path {
                self.remove_object(applicant.id, &path).await;
            }
        }
        self.refresh_profile_completeness(applicant.id).await?;
        Ok(())
    }

    pub async fn list_qualifications(&self, actor: &User, applicant_id: i64) -> Result<Vec<Qualification>> {
        self.get_applicant(actor, applicant_id).await?;
        self.db.applicants.list_qualifications(applicant_id).await
    }

    /// Attach or replace the certificate scan of a qualification
    pub async fn upload_certificate(&self, user: &User, qualification_id: i64, upload: DocumentUpload) -> Result<Qualification> {
        let (applicant, _) = self.own_qualification(user, qualification_id).await?;
        let ext = self.policy.validate(DocumentKind::QualificationCertificate, &upload)?;
        let key = self.policy.certificate_key(applicant.id, qualification_id, &ext);
        let size = upload.bytes.len();

        self.storage.put(&key, upload.bytes, &Self::content_type(upload.content_type, &ext)).await?;

        let previous = match self.db.applicants.set_certificate_path(qualification_id, &key).await {
            Ok(previous) => previous,
            Err(e) => {
                self.remove_object(applicant.id, &key).await;
                return Err(e);
            }
        };
        log_document_event(applicant.id, "certificate_uploaded", &key, Some(size));

        if let Some(old) = previous.filter(|p| p != &key) {
            self.remove_object(applicant.id, &old).await;
        }

        self.db.applicants.find_qualification(qualification_id).await?
            .ok_or(ScholarDeskError::NotFound { entity: "Qualification", id: qualification_id })
    }

    // Documents
    /// Upload a document, replacing any previous one of the same kind
    pub async fn upload_document(&self, user: &User, kind: DocumentKind, upload: DocumentUpload) -> Result<ApplicantDocument> {
        if kind == DocumentKind::QualificationCertificate {
            return Err(ScholarDeskError::InvalidInput(
                "Qualification certificates are attached to a qualification".to_string(),
            ));
        }

        let applicant = self.get_profile(user).await?;
        let ext = self.policy.validate(kind, &upload)?;
        let key = self.policy.document_key(applicant.id, kind, &ext);
        let size = upload.bytes.len();
        let content_type = Self::content_type(upload.content_type, &ext);

        self.storage.put(&key, upload.bytes, &content_type).await?;

        let record = DocumentRecord {
            applicant_id: applicant.id,
            kind,
            storage_path: key.clone(),
            original_name: sanitize_filename(&upload.original_name),
            content_type,
            size_bytes: size as i64,
        };
        let (document, previous) = match self.db.applicants.upsert_document(record).await {
            Ok(result) => result,
            Err(e) => {
                self.remove_object(applicant.id, &key).await;
                return Err(e);
            }
        };
        log_document_event(applicant.id, "uploaded", &key, Some(size));

        if let Some(old) = previous.filter(|p| p != &key) {
            self.remove_object(applicant.id, &old).await;
        }

        self.refresh_profile_completeness(applicant.id).await?;
        Ok(document)
    }

    pub async fn delete_document(&self, user: &User, kind: DocumentKind) -> Result<()> {
        let applicant = self.get_profile(user).await?;
        let deleted = self.db.applicants.delete_document(applicant.id, kind).await?
            .ok_or(ScholarDeskError::Storage(StorageError::NotFound(kind.to_string())))?;

        self.remove_object(applicant.id, &deleted.storage_path).await;
        self.refresh_profile_completeness(applicant.id).await?;
        Ok(())
    }

    pub async fn list_documents(&self, actor: &User, applicant_id: i64) -> Result<Vec<ApplicantDocument>> {
        self.get_applicant(actor, applicant_id).await?;
        self.db.applicants.list_documents(applicant_id).await
    }

    /// Fetch a stored document's bytes for its owner or staff
    pub async fn download_document(&self, actor: &User, applicant_id: i64, kind: DocumentKind) -> Result<(ApplicantDocument, Vec<u8>)> {
        self.get_applicant(actor, applicant_id).await?;
        let document = self.db.applicants.find_document(applicant_id, kind).await?
            .ok_or(ScholarDeskError::Storage(StorageError::NotFound(kind.to_string())))?;
        let bytes = self.storage.get(&document.storage_path).await?;
        Ok((document, bytes))
    }

    /// Backend address of a stored document, for staff links
    pub async fn document_url(&self, actor: &User, applicant_id: i64, kind: DocumentKind) -> Result<String> {
        self.get_applicant(actor, applicant_id).await?;
        let document = self.db.applicants.find_document(applicant_id, kind).await?
            .ok_or(ScholarDeskError::Storage(StorageError::NotFound(kind.to_string())))?;
        Ok(self.storage.url(&document.storage_path))
    }

    /// Recompute and store `profile_completed`
    pub async fn refresh_profile_completeness(&self, applicant_id: i64) -> Result<bool> {
        let qualifications = self.db.applicants.count_qualifications(applicant_id).await?;
        let kinds: Vec<DocumentKind> = self.db.applicants.list_documents(applicant_id).await?
            .into_iter()
            .map(|d| d.kind)
            .collect();

        let complete = is_profile_complete(qualifications, &kinds);
        self.db.applicants.set_profile_completed(applicant_id, complete).await?;
        Ok(complete)
    }

    fn content_type(provided: Option<String>, ext: &str) -> String {
        provided
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| content_type_for(ext).to_string())
    }

    /// Best-effort removal of an applicant's object; failures are only logged
    async fn remove_object(&self, applicant_id: i64, key: &str) {
        if !self.policy.belongs_to(key, applicant_id) {
            warn!(applicant_id = applicant_id, key = %key, "Refusing to delete object outside applicant folder");
            return;
        }
        match self.storage.delete(key).await {
            Ok(()) => log_document_event(applicant_id, "deleted", key, None),
            Err(e) => warn!(applicant_id = applicant_id, key = %key, error = %e, "Failed to delete stored object"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_gpa_scales() {
        assert!(validate_qualification(Some(3.7), None, 2020, 2026).is_ok());
        assert!(validate_qualification(Some(4.5), Some(GpaScale::FourPoint), 2020, 2026).is_err());
        assert!(validate_qualification(Some(4.5), Some(GpaScale::FivePoint), 2020, 2026).is_ok());
        assert!(validate_qualification(Some(88.0), Some(GpaScale::Percentage), 2020, 2026).is_ok());
        assert!(validate_qualification(Some(-0.1), None, 2020, 2026).is_err());
        assert!(validate_qualification(Some(f64::NAN), None, 2020, 2026).is_err());
        assert!(validate_qualification(None, None, 2020, 2026).is_ok());
    }

    #[test]
    fn test_graduation_year_bounds() {
        assert!(validate_qualification(None, None, 2026, 2026).is_ok());
        assert_matches!(
            validate_qualification(None, None, 2027, 2026),
            Err(ScholarDeskError::InvalidInput(_))
        );
        assert!(validate_qualification(None, None, 1900, 2026).is_err());
    }

    #[test]
    fn test_profile_completeness() {
        let both = [DocumentKind::Passport, DocumentKind::Transcript, DocumentKind::Cv];
        assert!(is_profile_complete(1, &both));
        assert!(!is_profile_complete(0, &both));
        assert!(!is_profile_complete(2, &[DocumentKind::Passport]));
    }

    #[test]
    fn test_content_type_fallback() {
        assert_eq!(ApplicantService::content_type(None, "pdf"), "application/pdf");
        assert_eq!(ApplicantService::content_type(Some(" ".to_string()), "png"), "image/png");
        assert_eq!(ApplicantService::content_type(Some("image/jpeg".to_string()), "jpg"), "image/jpeg");
    }
}
