//! Scholarship application approval workflow
//!
//! An application moves strictly forward through the approval stages and can
//! be rejected from any stage that is not yet final.

use crate::models::user::UserRole;
use crate::utils::errors::{ScholarDeskError, Result};

text_enum! {
    /// Stage of an applicant's scholarship application
    pub enum ApplicationStatus {
        Submitted => "submitted",
        FirstApproval => "first_approval",
        Meeting => "meeting",
        SecondApproval => "second_approval",
        FinalApproval => "final_approval",
        Rejected => "rejected",
    }
}

impl ApplicationStatus {
    /// Forward successor, `None` once the application is settled
    pub fn next(&self) -> Option<ApplicationStatus> {
        match self {
            ApplicationStatus::Submitted => Some(ApplicationStatus::FirstApproval),
            ApplicationStatus::FirstApproval => Some(ApplicationStatus::Meeting),
            ApplicationStatus::Meeting => Some(ApplicationStatus::SecondApproval),
            ApplicationStatus::SecondApproval => Some(ApplicationStatus::FinalApproval),
            ApplicationStatus::FinalApproval | ApplicationStatus::Rejected => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplicationStatus::FinalApproval | ApplicationStatus::Rejected)
    }

    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == ApplicationStatus::Rejected || self.next() == Some(next)
    }

    /// Roles allowed to move an application into `self`
    pub fn allowed_roles(&self) -> &'static [UserRole] {
        match self {
            ApplicationStatus::Submitted => &[UserRole::Applicant],
            ApplicationStatus::FirstApproval
            | ApplicationStatus::Meeting
            | ApplicationStatus::SecondApproval => &[UserRole::Admin],
            ApplicationStatus::FinalApproval | ApplicationStatus::Rejected => {
                &[UserRole::Admin, UserRole::Sponsor]
            }
        }
    }
}

/// Facts gathered by the service before a transition is attempted
#[derive(Debug, Clone)]
pub struct ApplicationTransition<'a> {
    pub actor_role: UserRole,
    /// The acting sponsor funds the application's scholarship
    pub actor_sponsors_scholarship: bool,
    pub has_completed_meeting: bool,
    pub require_meeting_appointment: bool,
    pub note: Option<&'a str>,
}

/// Check every guard for moving an application from `current` to `next`
pub fn check_application_transition(
    current: ApplicationStatus,
    next: ApplicationStatus,
    ctx: &ApplicationTransition<'_>,
) -> Result<()> {
    if !current.can_transition_to(next) {
        return Err(ScholarDeskError::transition(current, next));
    }

    if !next.allowed_roles().contains(&ctx.actor_role) {
        return Err(ScholarDeskError::PermissionDenied(format!(
            "{} cannot move an application to {}",
            ctx.actor_role, next
        )));
    }

    if ctx.actor_role == UserRole::Sponsor && !ctx.actor_sponsors_scholarship {
        return Err(ScholarDeskError::PermissionDenied(
            "Sponsors may only decide applications for their own scholarships".to_string(),
        ));
    }

    if current == ApplicationStatus::Meeting
        && next == ApplicationStatus::SecondApproval
        && ctx.require_meeting_appointment
        && !ctx.has_completed_meeting
    {
        return Err(ScholarDeskError::InvalidInput(
            "A completed meeting appointment is required before second approval".to_string(),
        ));
    }

    if next == ApplicationStatus::Rejected
        && ctx.note.map(str::trim).unwrap_or_default().is_empty()
    {
        return Err(ScholarDeskError::InvalidInput(
            "A rejection reason is required".to_string(),
        ));
    }

    Ok(())
}

text_enum! {
    /// Outcome of a meeting scheduled during the `meeting` stage
    pub enum AppointmentStatus {
        Scheduled => "scheduled",
        Completed => "completed",
        Cancelled => "cancelled",
        NoShow => "no_show",
    }
}

impl AppointmentStatus {
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        *self == AppointmentStatus::Scheduled && next != AppointmentStatus::Scheduled
    }
}
