//! ScholarDesk
//!
//! Back-office services for a scholarship program: applicant profiles and
//! documents, the application approval pipeline, enrolled students,
//! programs and opportunities with QR attendance, support tickets, student
//! requests and announcements.

#[macro_use]
mod macros;

pub mod config;
pub mod utils;
pub mod models;
pub mod workflow;
pub mod storage;
pub mod attendance;
pub mod database;
pub mod services;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{ScholarDeskError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
