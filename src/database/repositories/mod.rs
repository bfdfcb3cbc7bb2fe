//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod user;
pub mod applicant;
pub mod catalog;
pub mod scholarship;
pub mod application;
pub mod student;
pub mod activity;
pub mod ticket;
pub mod request;
pub mod announcement;
pub mod stats;

// Re-export repositories
pub use user::UserRepository;
pub use applicant::{ApplicantRepository, DocumentRecord};
pub use catalog::CatalogRepository;
pub use scholarship::ScholarshipRepository;
pub use application::ApplicationRepository;
pub use student::StudentRepository;
pub use activity::ActivityRepository;
pub use ticket::TicketRepository;
pub use request::RequestRepository;
pub use announcement::AnnouncementRepository;
pub use stats::StatsRepository;
