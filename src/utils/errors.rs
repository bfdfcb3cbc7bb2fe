//! Error handling for ScholarDesk
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for ScholarDesk application
#[derive(Error, Debug)]
pub enum ScholarDeskError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Attendance token error: {0}")]
    Token(#[from] TokenError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    #[error("Applicant not found: {applicant_id}")]
    ApplicantNotFound { applicant_id: i64 },

    #[error("Scholarship not found: {scholarship_id}")]
    ScholarshipNotFound { scholarship_id: i64 },

    #[error("Application not found: {application_id}")]
    ApplicationNotFound { application_id: i64 },

    #[error("Student not found: {student_id}")]
    StudentNotFound { student_id: i64 },

    #[error("Activity not found: {activity_id}")]
    ActivityNotFound { activity_id: i64 },

    #[error("Ticket not found: {ticket_id}")]
    TicketNotFound { ticket_id: i64 },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Already exists: {0}")]
    Duplicate(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Object storage specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage request failed: {0}")]
    RequestFailed(String),

    #[error("Storage rejected request with status {status}: {key}")]
    Rejected { status: u16, key: String },

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("File size {size} outside allowed range 1..={max}")]
    InvalidSize { size: usize, max: usize },
}

/// QR attendance token errors
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Token signature invalid")]
    InvalidSignature,

    #[error("Token malformed: {0}")]
    Malformed(String),

    #[error("Token issued for {expected} but presented for {actual}")]
    WrongTarget { expected: String, actual: String },
}

/// Result type alias for ScholarDesk operations
pub type Result<T> = std::result::Result<T, ScholarDeskError>;

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type alias for token operations
pub type TokenResult<T> = std::result::Result<T, TokenError>;

impl ScholarDeskError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            ScholarDeskError::Database(_) => false,
            ScholarDeskError::Migration(_) => false,
            ScholarDeskError::Storage(StorageError::RequestFailed(_)) => true,
            ScholarDeskError::Storage(_) => false,
            ScholarDeskError::Token(_) => false,
            ScholarDeskError::Config(_) => false,
            ScholarDeskError::PermissionDenied(_) => false,
            ScholarDeskError::UserNotFound { .. }
            | ScholarDeskError::ApplicantNotFound { .. }
            | ScholarDeskError::ScholarshipNotFound { .. }
            | ScholarDeskError::ApplicationNotFound { .. }
            | ScholarDeskError::StudentNotFound { .. }
            | ScholarDeskError::ActivityNotFound { .. }
            | ScholarDeskError::TicketNotFound { .. }
            | ScholarDeskError::NotFound { .. } => false,
            ScholarDeskError::InvalidStateTransition { .. } => false,
            ScholarDeskError::Duplicate(_) => false,
            ScholarDeskError::Redis(_) => true,
            ScholarDeskError::Http(_) => true,
            ScholarDeskError::Serialization(_) => false,
            ScholarDeskError::Io(_) => true,
            ScholarDeskError::UrlParse(_) => false,
            ScholarDeskError::RateLimitExceeded => true,
            ScholarDeskError::InvalidInput(_) => false,
            ScholarDeskError::ServiceUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ScholarDeskError::Database(_) => ErrorSeverity::Critical,
            ScholarDeskError::Migration(_) => ErrorSeverity::Critical,
            ScholarDeskError::Config(_) => ErrorSeverity::Critical,
            ScholarDeskError::PermissionDenied(_) => ErrorSeverity::Warning,
            ScholarDeskError::Token(_) => ErrorSeverity::Warning,
            ScholarDeskError::RateLimitExceeded => ErrorSeverity::Warning,
            ScholarDeskError::InvalidInput(_) => ErrorSeverity::Info,
            ScholarDeskError::InvalidStateTransition { .. } => ErrorSeverity::Info,
            ScholarDeskError::Duplicate(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Build an invalid transition error from any displayable statuses
    pub fn transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        ScholarDeskError::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_error_formatting() {
        let err = ScholarDeskError::transition("submitted", "meeting");
        assert_eq!(err.to_string(), "Invalid state transition: submitted -> meeting");
        assert_eq!(err.severity(), ErrorSeverity::Info);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_storage_errors_classification() {
        let transient: ScholarDeskError = StorageError::RequestFailed("timeout".into()).into();
        assert!(transient.is_recoverable());

        let missing: ScholarDeskError = StorageError::NotFound("a/b".into()).into();
        assert!(!missing.is_recoverable());
        assert_eq!(missing.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(ErrorSeverity::Critical.to_string(), "CRITICAL");
        assert_eq!(ScholarDeskError::RateLimitExceeded.severity().to_string(), "WARN");
    }
}
