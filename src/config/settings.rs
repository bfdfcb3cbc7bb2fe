//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Upper bound for `attendance.check_in_grace_minutes` (one day)
pub const MAX_CHECK_IN_GRACE_MINUTES: i64 = 24 * 60;
/// Upper bound for `features.ticket_auto_close_days`
pub const MAX_TICKET_AUTO_CLOSE_DAYS: i64 = 365;

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub storage: StorageConfig,
    pub attendance: AttendanceConfig,
    pub workflow: WorkflowConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
    pub features: FeaturesConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
    pub prefix: String,
    pub ttl_seconds: u64,
}

/// Object storage configuration for applicant documents
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// `s3` or `memory`
    pub backend: String,
    pub endpoint: String,
    pub bucket: String,
    pub access_token: Option<String>,
    /// Prepended to every object key
    pub key_prefix: String,
    pub max_upload_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

/// QR attendance configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttendanceConfig {
    pub qr_secret: String,
    pub qr_token_ttl_seconds: u64,
    pub leeway_seconds: u64,
    /// Minutes around an activity's start/end during which check-in is accepted
    pub check_in_grace_minutes: i64,
    pub scans_per_minute: u32,
}

impl AttendanceConfig {
    /// Grace window, clamped to `0..=MAX_CHECK_IN_GRACE_MINUTES`
    pub fn check_in_grace(&self) -> Duration {
        let minutes = self.check_in_grace_minutes.clamp(0, MAX_CHECK_IN_GRACE_MINUTES);
        Duration::try_minutes(minutes).unwrap_or_else(Duration::zero)
    }
}

/// Approval workflow configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    pub require_meeting_appointment: bool,
    pub student_number_prefix: String,
}

/// Notification delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationsConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub webhook_timeout_seconds: u64,
    pub default_language: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub json: bool,
}

/// Feature flags and maintenance configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturesConfig {
    pub catalog_cache: bool,
    pub maintenance_interval_seconds: u64,
    pub ticket_auto_close_days: i64,
}

impl FeaturesConfig {
    /// Idle time after which answered tickets close; `None` when disabled
    pub fn ticket_idle_window(&self) -> Option<Duration> {
        if self.ticket_auto_close_days <= 0 {
            return None;
        }
        Duration::try_days(self.ticket_auto_close_days.min(MAX_TICKET_AUTO_CLOSE_DAYS))
    }
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::from_file("config")
    }

    /// Load settings from a specific file (extension optional) layered over defaults
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Settings::default())?;
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("SCHOLARDESK")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("storage.allowed_extensions")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::ScholarDeskError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/scholardesk".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                prefix: "scholardesk:".to_string(),
                ttl_seconds: 3600,
            },
            storage: StorageConfig {
                backend: "s3".to_string(),
                endpoint: "http://localhost:9000".to_string(),
                bucket: "scholardesk".to_string(),
                access_token: None,
                key_prefix: "uploads".to_string(),
                max_upload_bytes: 10 * 1024 * 1024,
                allowed_extensions: ["pdf", "jpg", "jpeg", "png", "doc", "docx"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                timeout_seconds: 30,
                max_retries: 3,
            },
            attendance: AttendanceConfig {
                qr_secret: "change-me-change-me-change-me-change-me".to_string(),
                qr_token_ttl_seconds: 900,
                leeway_seconds: 30,
                check_in_grace_minutes: 30,
                scans_per_minute: 10,
            },
            workflow: WorkflowConfig {
                require_meeting_appointment: true,
                student_number_prefix: "S".to_string(),
            },
            notifications: NotificationsConfig {
                enabled: true,
                webhook_url: None,
                webhook_timeout_seconds: 5,
                default_language: "en".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                json: false,
            },
            features: FeaturesConfig {
                catalog_cache: true,
                maintenance_interval_seconds: 300,
                ticket_auto_close_days: 14,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.storage.max_upload_bytes, 10 * 1024 * 1024);
        assert!(settings.storage.allowed_extensions.contains(&"pdf".to_string()));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scholardesk.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[storage]\nbucket = \"documents\"\n\n[workflow]\nrequire_meeting_appointment = false"
        )
        .unwrap();

        let settings = Settings::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(settings.storage.bucket, "documents");
        assert!(!settings.workflow.require_meeting_appointment);
        // untouched sections keep their defaults
        assert_eq!(settings.database.max_connections, 10);
    }

    #[test]
    fn test_windows_are_clamped() {
        let mut settings = Settings::default();
        assert_eq!(settings.attendance.check_in_grace(), Duration::minutes(30));
        assert_eq!(settings.features.ticket_idle_window(), Some(Duration::days(14)));

        settings.attendance.check_in_grace_minutes = -5;
        settings.features.ticket_auto_close_days = 0;
        assert_eq!(settings.attendance.check_in_grace(), Duration::zero());
        assert_eq!(settings.features.ticket_idle_window(), None);

        settings.attendance.check_in_grace_minutes = i64::MAX;
        settings.features.ticket_auto_close_days = i64::MAX;
        assert_eq!(settings.attendance.check_in_grace(), Duration::minutes(MAX_CHECK_IN_GRACE_MINUTES));
        assert_eq!(settings.features.ticket_idle_window(), Some(Duration::days(MAX_TICKET_AUTO_CLOSE_DAYS)));
    }
}
