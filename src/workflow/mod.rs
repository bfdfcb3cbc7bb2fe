//! Workflow module
//!
//! Status state machines for applications, students, program/opportunity
//! participation, student requests and support tickets. Everything here is
//! pure; services load the facts, check the rules, then persist.

pub mod activity;
pub mod application;
pub mod request;
pub mod student;
pub mod ticket;

pub use activity::ActivityApplicationStatus;
pub use application::{
    check_application_transition, ApplicationStatus, ApplicationTransition, AppointmentStatus,
};
pub use request::{RequestKind, RequestStatus};
pub use student::StudentStatus;
pub use ticket::{TicketCategory, TicketStatus};
