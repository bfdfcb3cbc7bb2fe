//! Document key layout and upload validation

use uuid::Uuid;
use crate::config::StorageConfig;
use crate::models::applicant::{DocumentKind, DocumentUpload};
use crate::utils::errors::{StorageError, StorageResult};
use crate::utils::helpers::file_extension;

/// Rules for where uploads go and which uploads are accepted
#[derive(Debug, Clone)]
pub struct DocumentPolicy {
    key_prefix: String,
    max_upload_bytes: usize,
    allowed_extensions: Vec<String>,
}

impl DocumentPolicy {
    pub fn new(key_prefix: &str, max_upload_bytes: usize, allowed_extensions: &[String]) -> Self {
        Self {
            key_prefix: key_prefix.trim_matches('/').to_string(),
            max_upload_bytes,
            allowed_extensions: allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.key_prefix, config.max_upload_bytes, &config.allowed_extensions)
    }

    /// Check size and type, returning the normalized extension
    pub fn validate(&self, kind: DocumentKind, upload: &DocumentUpload) -> StorageResult<String> {
        let size = upload.bytes.len();
        if size == 0 || size > self.max_upload_bytes {
            return Err(StorageError::InvalidSize { size, max: self.max_upload_bytes });
        }

        let ext = file_extension(&upload.original_name)
            .ok_or_else(|| StorageError::UnsupportedFileType(upload.original_name.clone()))?;

        if !self.allowed_extensions.contains(&ext) {
            return Err(StorageError::UnsupportedFileType(ext));
        }

        if let Some(only) = kind.restricted_extensions() {
            if !only.contains(&ext.as_str()) {
                return Err(StorageError::UnsupportedFileType(format!("{} for {}", ext, kind)));
            }
        }

        Ok(ext)
    }

    fn applicant_root(&self, applicant_id: i64) -> String {
        if self.key_prefix.is_empty() {
            format!("applicants/{}", applicant_id)
        } else {
            format!("{}/applicants/{}", self.key_prefix, applicant_id)
        }
    }

    /// `{prefix}/applicants/{id}/{kind}/{uuid}.{ext}`
    pub fn document_key(&self, applicant_id: i64, kind: DocumentKind, ext: &str) -> String {
        format!("{}/{}/{}.{}", self.applicant_root(applicant_id), kind, Uuid::new_v4(), ext)
    }

    /// `{prefix}/applicants/{id}/qualifications/{qualification_id}/{uuid}.{ext}`
    pub fn certificate_key(&self, applicant_id: i64, qualification_id: i64, ext: &str) -> String {
        format!(
            "{}/qualifications/{}/{}.{}",
            self.applicant_root(applicant_id),
            qualification_id,
            Uuid::new_v4(),
            ext
        )
    }

    /// Whether `key` lives under the applicant's folder
    pub fn belongs_to(&self, key: &str, applicant_id: i64) -> bool {
        key.starts_with(&format!("{}/", self.applicant_root(applicant_id)))
    }
}

/// Content type to store when the client did not send a usable one
pub fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn policy() -> DocumentPolicy {
        DocumentPolicy::new(
            "/uploads/",
            1024,
            &["pdf".to_string(), ".JPG".to_string(), "png".to_string()],
        )
    }

    fn upload(name: &str, size: usize) -> DocumentUpload {
        DocumentUpload {
            original_name: name.to_string(),
            content_type: None,
            bytes: vec![1u8; size],
        }
    }

    #[test]
    fn test_document_key_layout() {
        let key = policy().document_key(42, DocumentKind::Transcript, "pdf");
        assert!(key.starts_with("uploads/applicants/42/transcript/"));
        assert!(key.ends_with(".pdf"));
        assert!(policy().belongs_to(&key, 42));
        assert!(!policy().belongs_to(&key, 4));
    }

    #[test]
    fn test_keys_are_unique() {
        let p = policy();
        assert_ne!(
            p.document_key(1, DocumentKind::Cv, "pdf"),
            p.document_key(1, DocumentKind::Cv, "pdf")
        );
    }

    #[test]
    fn test_certificate_key_layout() {
        let key = policy().certificate_key(3, 11, "png");
        assert!(key.starts_with("uploads/applicants/3/qualifications/11/"));
    }

    #[test]
    fn test_empty_prefix() {
        let p = DocumentPolicy::new("", 10, &["pdf".to_string()]);
        assert!(p.document_key(5, DocumentKind::Cv, "pdf").starts_with("applicants/5/cv/"));
    }

    #[test]
    fn test_validation() {
        let p = policy();
        assert_eq!(p.validate(DocumentKind::Passport, &upload("Passport.PDF", 10)).unwrap(), "pdf");
        assert_eq!(p.validate(DocumentKind::Photo, &upload("me.jpg", 10)).unwrap(), "jpg");

        assert_matches!(
            p.validate(DocumentKind::Passport, &upload("scan.pdf", 0)),
            Err(StorageError::InvalidSize { .. })
        );
        assert_matches!(
            p.validate(DocumentKind::Passport, &upload("scan.pdf", 2048)),
            Err(StorageError::InvalidSize { size: 2048, max: 1024 })
        );
        assert_matches!(
            p.validate(DocumentKind::Cv, &upload("cv.exe", 10)),
            Err(StorageError::UnsupportedFileType(_))
        );
        assert_matches!(
            p.validate(DocumentKind::Photo, &upload("me.pdf", 10)),
            Err(StorageError::UnsupportedFileType(_))
        );
        assert_matches!(
            p.validate(DocumentKind::Cv, &upload("noextension", 10)),
            Err(StorageError::UnsupportedFileType(_))
        );
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("pdf"), "application/pdf");
        assert_eq!(content_type_for("jpeg"), "image/jpeg");
        assert_eq!(content_type_for("bin"), "application/octet-stream");
    }
}
