//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{ScholarDeskError, Result};
use super::Settings;
use super::settings::{MAX_CHECK_IN_GRACE_MINUTES, MAX_TICKET_AUTO_CLOSE_DAYS};

const MIN_QR_SECRET_BYTES: usize = 32;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_redis_config(&settings.redis)?;
    validate_storage_config(&settings.storage)?;
    validate_attendance_config(&settings.attendance)?;
    validate_notifications_config(&settings.notifications)?;
    validate_logging_config(&settings.logging)?;
    validate_features_config(&settings.features)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(ScholarDeskError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(ScholarDeskError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(ScholarDeskError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(ScholarDeskError::Config(
            "Redis URL is required".to_string()
        ));
    }

    Ok(())
}

/// Validate object storage configuration
fn validate_storage_config(config: &super::StorageConfig) -> Result<()> {
    match config.backend.as_str() {
        "s3" => {
            if config.endpoint.is_empty() {
                return Err(ScholarDeskError::Config(
                    "Storage endpoint is required for the s3 backend".to_string()
                ));
            }
            url::Url::parse(&config.endpoint)?;
        }
        "memory" => {}
        other => {
            return Err(ScholarDeskError::Config(
                format!("Unknown storage backend: {}", other)
            ));
        }
    }

    if config.bucket.is_empty() {
        return Err(ScholarDeskError::Config(
            "Storage bucket is required".to_string()
        ));
    }

    if config.max_upload_bytes == 0 {
        return Err(ScholarDeskError::Config(
            "Max upload size must be greater than 0".to_string()
        ));
    }

    if config.allowed_extensions.is_empty() {
        return Err(ScholarDeskError::Config(
            "At least one allowed file extension is required".to_string()
        ));
    }

    Ok(())
}

/// Validate QR attendance configuration
fn validate_attendance_config(config: &super::AttendanceConfig) -> Result<()> {
    if config.qr_secret.len() < MIN_QR_SECRET_BYTES {
        return Err(ScholarDeskError::Config(
            format!("QR secret must be at least {} bytes", MIN_QR_SECRET_BYTES)
        ));
    }

    if config.qr_token_ttl_seconds == 0 {
        return Err(ScholarDeskError::Config(
            "QR token TTL must be greater than 0".to_string()
        ));
    }

    if config.scans_per_minute == 0 {
        return Err(ScholarDeskError::Config(
            "Scans per minute must be greater than 0".to_string()
        ));
    }

    if !(0..=MAX_CHECK_IN_GRACE_MINUTES).contains(&config.check_in_grace_minutes) {
        return Err(ScholarDeskError::Config(format!(
            "Check-in grace must be between 0 and {} minutes",
            MAX_CHECK_IN_GRACE_MINUTES
        )));
    }

    Ok(())
}

/// Validate maintenance feature switches
fn validate_features_config(config: &super::FeaturesConfig) -> Result<()> {
    if config.maintenance_interval_seconds == 0 {
        return Err(ScholarDeskError::Config(
            "Maintenance interval must be greater than 0".to_string()
        ));
    }

    if !(0..=MAX_TICKET_AUTO_CLOSE_DAYS).contains(&config.ticket_auto_close_days) {
        return Err(ScholarDeskError::Config(format!(
            "Ticket auto-close must be between 0 (disabled) and {} days",
            MAX_TICKET_AUTO_CLOSE_DAYS
        )));
    }

    Ok(())
}

/// Validate notification configuration
fn validate_notifications_config(config: &super::NotificationsConfig) -> Result<()> {
    if let Some(ref url) = config.webhook_url {
        if url.is_empty() {
            return Err(ScholarDeskError::Config(
                "Webhook URL cannot be empty when configured".to_string()
            ));
        }
        url::Url::parse(url)?;
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(ScholarDeskError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(ScholarDeskError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
