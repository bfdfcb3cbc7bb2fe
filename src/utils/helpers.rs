//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use std::sync::OnceLock;
use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use regex::Regex;
use crate::utils::errors::{ScholarDeskError, Result};

/// Largest page size accepted by list operations
pub const MAX_PAGE_SIZE: i64 = 100;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("email pattern is valid")
    })
}

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[0-9][0-9 \-]{7,18}[0-9]$").expect("phone pattern is valid"))
}

/// Format a timestamp for display
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Truncate text to a maximum number of characters with ellipsis
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_length.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Normalize an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate email format
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Validate phone number format
pub fn is_valid_phone(phone: &str) -> bool {
    phone_regex().is_match(phone.trim())
}

/// Require a non-blank value, returning it trimmed
pub fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = normalize_whitespace(value);
    if trimmed.is_empty() {
        return Err(ScholarDeskError::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed)
}

/// Clamp list arguments to sane bounds
pub fn page_bounds(limit: i64, offset: i64) -> Result<(i64, i64)> {
    if limit <= 0 {
        return Err(ScholarDeskError::InvalidInput("Limit must be positive".to_string()));
    }
    if limit > MAX_PAGE_SIZE {
        return Err(ScholarDeskError::InvalidInput(format!("Limit cannot exceed {}", MAX_PAGE_SIZE)));
    }
    Ok((limit, offset.max(0)))
}

/// Sanitize filename for safe storage
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Lowercased extension of a file name, if it has one
pub fn file_extension(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_lowercase()),
        _ => None,
    }
}

/// Convert bytes to human readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Generate a random uppercase alphanumeric code
pub fn generate_reference_code(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Build a student number such as `S2026000042`
pub fn format_student_number(prefix: &str, enrolled_at: DateTime<Utc>, sequence: i64) -> String {
    format!("{}{}{:06}", prefix, enrolled_at.year(), sequence)
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
