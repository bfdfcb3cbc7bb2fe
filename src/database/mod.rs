//! Database module
//!
//! This module handles database connections and operations

pub mod connection;
pub mod repositories;
pub mod service;

// Re-export commonly used database components
pub use connection::{DatabasePool, DatabaseConfig, create_pool, run_migrations, health_check, is_unique_violation};
pub use repositories::{
    UserRepository, ApplicantRepository, CatalogRepository, ScholarshipRepository,
    ApplicationRepository, StudentRepository, ActivityRepository, TicketRepository,
    RequestRepository, AnnouncementRepository, StatsRepository,
};
pub use service::{DatabaseService, MaintenancePolicy};
