//! Data models module
//!
//! This module contains all data structures used throughout the application

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

// Re-export commonly used models
pub use user::{User, UserRole, CreateUserRequest, UpdateUserRequest};
pub use applicant::{
    Applicant, ApplicantProfileRequest, Qualification, QualificationLevel, GpaScale, Gender,
    CreateQualificationRequest, UpdateQualificationRequest, ApplicantDocument, DocumentKind,
    DocumentUpload,
};
pub use catalog::{
    Country, University, Specialization, CreateCountryRequest, CreateUniversityRequest,
    CreateSpecializationRequest,
};
pub use scholarship::{Scholarship, CreateScholarshipRequest, UpdateScholarshipRequest};
pub use application::{
    ApplicantApplication, CreateApplicationRequest, ApplicationStatusTrail, Appointment,
    ScheduleAppointmentRequest, StatusCount,
};
pub use student::{Student, StudentStatusTrail};
pub use activity::{Activity, ActivityKind, ActivityApplication, CreateActivityRequest};
pub use ticket::{Ticket, TicketMessage, OpenTicketRequest};
pub use request::{StudentRequest, RequestStatusTrail, CreateStudentRequest};
pub use announcement::{Announcement, Audience, CreateAnnouncementRequest};
