//! Application service
//!
//! Drives applications through the approval stages. Guards are evaluated by
//! [`check_application_transition`]; the repository applies the change and
//! its trail row atomically. Final approval enrolls the applicant as a student.

use chrono::Utc;
use tracing::{info, debug};
use crate::config::settings::WorkflowConfig;
use crate::database::DatabaseService;
use crate::models::applicant::Applicant;
use crate::models::application::{
    ApplicantApplication, ApplicationStatusTrail, Appointment, CreateApplicationRequest,
    ScheduleAppointmentRequest, StatusCount,
};
use crate::models::scholarship::Scholarship;
use crate::models::student::Student;
use crate::models::user::{User, UserRole};
use crate::services::auth::{AuthService, Permission};
use crate::services::notification::{params, NotificationService};
use crate::utils::errors::{ScholarDeskError, Result};
use crate::utils::helpers::{format_timestamp, page_bounds};
use crate::utils::logging::log_status_change;
use crate::workflow::{
    check_application_transition, ApplicationStatus, ApplicationTransition, AppointmentStatus,
};

/// Outcome of a transition; `student` is set when final approval enrolled the applicant
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub application: ApplicantApplication,
    pub student: Option<Student>,
}

#[derive(Clone, Debug)]
pub struct ApplicationService {
    db: DatabaseService,
    notifications: NotificationService,
    workflow: WorkflowConfig,
    auth: AuthService,
}

impl ApplicationService {
    pub fn new(db: DatabaseService, notifications: NotificationService, workflow: WorkflowConfig) -> Self {
        Self {
            db,
            notifications,
            workflow,
            auth: AuthService::new(),
        }
    }

    /// Submit an application to an open scholarship
    pub async fn apply(&self, user: &User, request: CreateApplicationRequest) -> Result<ApplicantApplication> {
        self.auth.require_role(user, &[UserRole::Applicant])?;

        let applicant = self.db.applicants.find_by_user_id(user.id).await?
            .ok_or_else(|| ScholarDeskError::InvalidInput("Create an applicant profile before applying".to_string()))?;
        if !applicant.profile_completed {
            return Err(ScholarDeskError::InvalidInput(
                "Complete your profile (qualification, passport and transcript) before applying".to_string(),
            ));
        }

        let scholarship = self.scholarship(request.scholarship_id).await?;
        if !scholarship.is_open_at(Utc::now()) {
            return Err(ScholarDeskError::InvalidInput(format!(
                "Scholarship {} is not accepting applications",
                scholarship.id
            )));
        }

        let request = CreateApplicationRequest {
            motivation: request.motivation.map(|m| m.trim().to_string()).filter(|m| !m.is_empty()),
            ..request
        };
        let application = self.db.applications.create(applicant.id, user.id, request).await?;

        log_status_change("application", application.id, "none", ApplicationStatus::Submitted.as_str(), user.id);
        info!(application_id = application.id, applicant_id = applicant.id, scholarship_id = scholarship.id, "Application submitted");
        Ok(application)
    }

    /// Load an application the actor is allowed to see
    pub async fn get(&self, actor: &User, application_id: i64) -> Result<ApplicantApplication> {
        let application = self.application(application_id).await?;
        self.require_visible(actor, &application).await?;
        Ok(application)
    }

    /// Move to the next stage
    pub async fn advance(&self, actor: &User, application_id: i64, note: Option<String>) -> Result<TransitionOutcome> {
        let application = self.application(application_id).await?;
        let next = application.status.next()
            .ok_or_else(|| ScholarDeskError::transition(application.status, application.status))?;
        self.transition(actor, application, next, note).await
    }

    /// Reject with a mandatory reason
    pub async fn reject(&self, actor: &User, application_id: i64, reason: String) -> Result<TransitionOutcome> {
        let application = self.application(application_id).await?;
        self.transition(actor, application, ApplicationStatus::Rejected, Some(reason)).await
    }

    async fn transition(
        &self,
        actor: &User,
        application: ApplicantApplication,
        next: ApplicationStatus,
        note: Option<String>,
    ) -> Result<TransitionOutcome> {
        self.auth.require_active(actor)?;
        let scholarship = self.scholarship(application.scholarship_id).await?;
        let current = application.status;

        let has_completed_meeting = current == ApplicationStatus::Meeting
            && self.db.applications.has_completed_appointment(application.id).await?;
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        let ctx = ApplicationTransition {
            actor_role: actor.role,
            actor_sponsors_scholarship: scholarship.sponsor_id == Some(actor.id),
            has_completed_meeting,
            require_meeting_appointment: self.workflow.require_meeting_appointment,
            note: note.as_deref(),
        };
        check_application_transition(current, next, &ctx)?;

        let outcome = if next == ApplicationStatus::FinalApproval {
            let (application, student) = self.db.applications
                .finalize(application.id, current, actor.id, note, &self.workflow.student_number_prefix)
                .await?;
            info!(application_id = application.id, student_id = student.id, student_number = %student.student_number, "Applicant enrolled as student");
            TransitionOutcome { application, student: Some(student) }
        } else {
            let application = self.db.applications
                .transition(application.id, current, next, actor.id, note)
                .await?;
            TransitionOutcome { application, student: None }
        };

        log_status_change("application", outcome.application.id, current.as_str(), next.as_str(), actor.id);
        self.notify_applicant(&outcome, &scholarship).await;
        Ok(outcome)
    }

    async fn notify_applicant(&self, outcome: &TransitionOutcome, scholarship: &Scholarship) {
        let Ok(Some(user)) = self.applicant_user(outcome.application.applicant_id).await else {
            return;
        };

        let application = &outcome.application;
        if application.status == ApplicationStatus::Rejected {
            let parameters = params([
                ("scholarship_title", scholarship.title.clone()),
                ("reason", application.rejection_reason.clone().unwrap_or_default()),
            ]);
            self.notifications.notify(&user, "application_rejected", &parameters).await;
            return;
        }

        let parameters = params([
            ("scholarship_title", scholarship.title.clone()),
            ("status", application.status.to_string()),
        ]);
        self.notifications.notify(&user, "application_status", &parameters).await;

        if let Some(student) = &outcome.student {
            let parameters = params([("student_number", student.student_number.clone())]);
            self.notifications.notify(&user, "student_enrolled", &parameters).await;
        }
    }

    /// Status trail, oldest first
    pub async fn history(&self, actor: &User, application_id: i64) -> Result<Vec<ApplicationStatusTrail>> {
        self.get(actor, application_id).await?;
        self.db.applications.trail(application_id).await
    }

    /// The caller's own applications
    pub async fn list_mine(&self, user: &User) -> Result<Vec<ApplicantApplication>> {
        match self.db.applicants.find_by_user_id(user.id).await? {
            Some(applicant) => self.db.applications.list_for_applicant(applicant.id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Review queue for admins
    pub async fn list_by_status(&self, admin: &User, status: ApplicationStatus, limit: i64, offset: i64) -> Result<Vec<ApplicantApplication>> {
        self.auth.require_permission(admin, Permission::ReviewApplications)?;
        let (limit, offset) = page_bounds(limit, offset)?;
        self.db.applications.list_by_status(status, limit, offset).await
    }

    /// Applications to a scholarship, for its sponsor or admins
    pub async fn list_for_scholarship(&self, actor: &User, scholarship_id: i64) -> Result<Vec<ApplicantApplication>> {
        let scholarship = self.scholarship(scholarship_id).await?;
        self.require_scholarship_staff(actor, &scholarship)?;
        self.db.applications.list_for_scholarship(scholarship_id).await
    }

    /// Application counts per status
    pub async fn statistics(&self, admin: &User) -> Result<Vec<StatusCount>> {
        self.auth.require_permission(admin, Permission::ViewStatistics)?;
        self.db.applications.count_by_status().await
    }

    // Appointments
    /// Schedule a meeting; only while the application is in the meeting stage
    pub async fn schedule_appointment(&self, admin: &User, request: ScheduleAppointmentRequest) -> Result<Appointment> {
        self.auth.require_permission(admin, Permission::ReviewApplications)?;
        let application = self.application(request.application_id).await?;

        if application.status != ApplicationStatus::Meeting {
            return Err(ScholarDeskError::InvalidInput(format!(
                "Appointments can only be scheduled in the meeting stage (application is {})",
                application.status
            )));
        }
        if request.scheduled_at <= Utc::now() {
            return Err(ScholarDeskError::InvalidInput("Appointment must be in the future".to_string()));
        }

        let appointment = self.db.applications.create_appointment(admin.id, request).await?;
        info!(appointment_id = appointment.id, application_id = application.id, "Appointment scheduled");

        if let Ok(Some(user)) = self.applicant_user(application.applicant_id).await {
            let parameters = params([
                ("scheduled_at", format_timestamp(appointment.scheduled_at)),
                ("location", appointment.location.clone().unwrap_or_else(|| "-".to_string())),
            ]);
            self.notifications.notify(&user, "appointment_scheduled", &parameters).await;
        }
        Ok(appointment)
    }

    pub async fn complete_appointment(&self, admin: &User, appointment_id: i64, notes: Option<String>) -> Result<Appointment> {
        self.settle_appointment(admin, appointment_id, AppointmentStatus::Completed, notes).await
    }

    pub async fn cancel_appointment(&self, admin: &User, appointment_id: i64, notes: Option<String>) -> Result<Appointment> {
        self.settle_appointment(admin, appointment_id, AppointmentStatus::Cancelled, notes).await
    }

    pub async fn mark_no_show(&self, admin: &User, appointment_id: i64, notes: Option<String>) -> Result<Appointment> {
        self.settle_appointment(admin, appointment_id, AppointmentStatus::NoShow, notes).await
    }

    async fn settle_appointment(&self, admin: &User, appointment_id: i64, to: AppointmentStatus, notes: Option<String>) -> Result<Appointment> {
        self.auth.require_permission(admin, Permission::ReviewApplications)?;
        let appointment = self.db.applications.find_appointment(appointment_id).await?
            .ok_or(ScholarDeskError::NotFound { entity: "Appointment", id: appointment_id })?;

        if !appointment.status.can_transition_to(to) {
            return Err(ScholarDeskError::transition(appointment.status, to));
        }

        let updated = self.db.applications
            .update_appointment_status(appointment_id, appointment.status, to, notes)
            .await?;
        log_status_change("appointment", appointment_id, appointment.status.as_str(), to.as_str(), admin.id);
        Ok(updated)
    }

    pub async fn list_appointments(&self, actor: &User, application_id: i64) -> Result<Vec<Appointment>> {
        self.get(actor, application_id).await?;
        self.db.applications.list_appointments(application_id).await
    }

    async fn application(&self, application_id: i64) -> Result<ApplicantApplication> {
        self.db.applications.find_by_id(application_id).await?
            .ok_or(ScholarDeskError::ApplicationNotFound { application_id })
    }

    async fn scholarship(&self, scholarship_id: i64) -> Result<Scholarship> {
        self.db.scholarships.find_by_id(scholarship_id).await?
            .ok_or(ScholarDeskError::ScholarshipNotFound { scholarship_id })
    }

    async fn applicant(&self, applicant_id: i64) -> Result<Applicant> {
        self.db.applicants.find_by_id(applicant_id).await?
            .ok_or(ScholarDeskError::ApplicantNotFound { applicant_id })
    }

    async fn applicant_user(&self, applicant_id: i64) -> Result<Option<User>> {
        let applicant = self.applicant(applicant_id).await?;
        self.db.users.find_by_id(applicant.user_id).await
    }

    fn require_scholarship_staff(&self, actor: &User, scholarship: &Scholarship) -> Result<()> {
        if actor.role == UserRole::Sponsor && scholarship.sponsor_id == Some(actor.id) {
            return self.auth.require_permission(actor, Permission::SponsorReview).map(|_| ());
        }
        self.auth.require_permission(actor, Permission::ReviewApplications).map(|_| ())
    }

    async fn require_visible(&self, actor: &User, application: &ApplicantApplication) -> Result<()> {
        match actor.role {
            UserRole::Applicant => {
                let applicant = self.applicant(application.applicant_id).await?;
                debug!(application_id = application.id, "Checking applicant ownership");
                self.auth.require_owner_or(actor, applicant.user_id, Permission::ReviewApplications)
            }
            _ => {
                let scholarship = self.scholarship(application.scholarship_id).await?;
                self.require_scholarship_staff(actor, &scholarship)
            }
        }
    }
}
