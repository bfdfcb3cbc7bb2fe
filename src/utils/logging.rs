//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the ScholarDesk application.

use std::path::Path;
use tracing::{info, warn, error, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use crate::config::LoggingConfig;
use crate::utils::errors::{ScholarDeskError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard must be kept alive for the file writer to flush.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| ScholarDeskError::Config(format!("Invalid log filter: {}", e)))?;

    let stdout_layer = if config.json {
        fmt::layer().json().with_writer(std::io::stdout).boxed()
    } else {
        fmt::layer().with_writer(std::io::stdout).boxed()
    };

    let (file_layer, guard) = match config.file_path.as_deref() {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(Path::new(dir), "scholardesk.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer().with_ansi(false).with_writer(non_blocking).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ScholarDeskError::Config(format!("Logging already initialized: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log a workflow status change
pub fn log_status_change(entity: &str, entity_id: i64, from: &str, to: &str, changed_by: i64) {
    info!(
        entity = entity,
        entity_id = entity_id,
        from = from,
        to = to,
        changed_by = changed_by,
        "Status changed"
    );
}

/// Log admin actions
pub fn log_admin_action(admin_id: i64, action: &str, target: Option<&str>, details: Option<&str>) {
    warn!(
        admin_id = admin_id,
        action = action,
        target = target,
        details = details,
        "Admin action performed"
    );
}

/// Log document storage events
pub fn log_document_event(applicant_id: i64, action: &str, key: &str, size_bytes: Option<usize>) {
    info!(
        applicant_id = applicant_id,
        action = action,
        key = key,
        size_bytes = size_bytes,
        "Document event"
    );
}

/// Log QR check-in results
pub fn log_check_in(activity_id: i64, user_id: i64, accepted: bool, reason: Option<&str>) {
    if accepted {
        info!(activity_id = activity_id, user_id = user_id, "Check-in accepted");
    } else {
        warn!(
            activity_id = activity_id,
            user_id = user_id,
            reason = reason,
            "Check-in rejected"
        );
    }
}

/// Log database operations
pub fn log_database_operation(operation: &str, table: &str, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation completed"
        );
    } else {
        error!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation failed"
        );
    }
}
