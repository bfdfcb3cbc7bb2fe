//! Programs and opportunities: publishing, applying, decisions and excuses

use chrono::{DateTime, Utc};
use tracing::info;
use crate::database::DatabaseService;
use crate::models::activity::{Activity, ActivityApplication, ActivityKind, CreateActivityRequest};
use crate::models::student::Student;
use crate::models::user::User;
use crate::services::auth::{AuthService, Permission};
use crate::services::notification::{params, NotificationService};
use crate::utils::errors::{ScholarDeskError, Result};
use crate::utils::helpers::require_text;
use crate::utils::logging::log_status_change;
use crate::workflow::ActivityApplicationStatus;

#[derive(Clone, Debug)]
pub struct ActivityService {
    db: DatabaseService,
    notifications: NotificationService,
    auth: AuthService,
}

impl ActivityService {
    pub fn new(db: DatabaseService, notifications: NotificationService) -> Self {
        Self {
            db,
            notifications,
            auth: AuthService::new(),
        }
    }

    pub async fn create(&self, admin: &User, request: CreateActivityRequest) -> Result<Activity> {
        self.auth.require_permission(admin, Permission::ManageActivities)?;
        if request.starts_at >= request.ends_at {
            return Err(ScholarDeskError::InvalidInput("Activity must start before it ends".to_string()));
        }
        if matches!(request.capacity, Some(c) if c <= 0) {
            return Err(ScholarDeskError::InvalidInput("Capacity must be positive".to_string()));
        }

        let request = CreateActivityRequest {
            title: require_text("Title", &request.title)?,
            ..request
        };
        let activity = self.db.activities.create(admin.id, request).await?;
        info!(activity_id = activity.id, kind = %activity.kind, "Activity created");
        Ok(activity)
    }

    pub async fn get(&self, activity_id: i64) -> Result<Activity> {
        self.db.activities.find_by_id(activity_id).await?
            .ok_or(ScholarDeskError::ActivityNotFound { activity_id })
    }

    pub async fn list_upcoming(&self, kind: Option<ActivityKind>, now: DateTime<Utc>) -> Result<Vec<Activity>> {
        self.db.activities.list_upcoming(kind, now).await
    }

    pub async fn set_active(&self, admin: &User, activity_id: i64, is_active: bool) -> Result<Activity> {
        self.auth.require_permission(admin, Permission::ManageActivities)?;
        self.db.activities.set_active(activity_id, is_active).await
    }

    /// Apply as an active student while the activity is open and has room
    pub async fn apply(&self, user: &User, activity_id: i64) -> Result<ActivityApplication> {
        let student = self.active_student(user).await?;
        let activity = self.get(activity_id).await?;

        if !activity.is_active || activity.has_ended(Utc::now()) {
            return Err(ScholarDeskError::InvalidInput(format!(
                "Activity {} is not accepting applications",
                activity_id
            )));
        }
        if let Some(capacity) = activity.capacity {
            let taken = self.db.activities.count_seats_taken(activity_id).await?;
            if taken >= capacity as i64 {
                return Err(ScholarDeskError::InvalidInput(format!(
                    "Activity {} is full ({} seats)",
                    activity_id, capacity
                )));
            }
        }

        let application = self.db.activities.create_application(activity_id, student.id).await?;
        info!(participation_id = application.id, activity_id = activity_id, student_id = student.id, "Activity application created");
        Ok(application)
    }

    /// Accept (capacity permitting) or reject a pending application
    pub async fn decide(&self, admin: &User, participation_id: i64, accept: bool) -> Result<ActivityApplication> {
        self.auth.require_permission(admin, Permission::ManageActivities)?;
        let current = self.participation(participation_id).await?;
        let to = if accept { ActivityApplicationStatus::Accepted } else { ActivityApplicationStatus::Rejected };
        if !current.status.can_transition_to(to) {
            return Err(ScholarDeskError::transition(current.status, to));
        }

        let updated = if accept {
            self.db.activities.accept_application(participation_id, admin.id).await?
        } else {
            self.db.activities
                .transition_application(participation_id, current.status, to, Some(admin.id), None)
                .await?
        };

        log_status_change("activity_application", participation_id, current.status.as_str(), to.as_str(), admin.id);
        self.notify_decision(&updated).await;
        Ok(updated)
    }

    /// Withdraw one's own pending application
    pub async fn cancel(&self, user: &User, participation_id: i64) -> Result<ActivityApplication> {
        let (_, current) = self.own_participation(user, participation_id).await?;
        let to = ActivityApplicationStatus::Cancelled;
        if !current.status.can_transition_to(to) {
            return Err(ScholarDeskError::transition(current.status, to));
        }

        let updated = self.db.activities
            .transition_application(participation_id, current.status, to, None, None)
            .await?;
        log_status_change("activity_application", participation_id, current.status.as_str(), to.as_str(), user.id);
        Ok(updated)
    }

    /// Ask to be excused from an accepted activity before it ends
    pub async fn request_excuse(&self, user: &User, participation_id: i64, reason: String) -> Result<ActivityApplication> {
        let (_, current) = self.own_participation(user, participation_id).await?;
        let reason = require_text("Excuse reason", &reason)?;
        let to = ActivityApplicationStatus::ExcuseRequested;
        if !current.status.can_transition_to(to) {
            return Err(ScholarDeskError::transition(current.status, to));
        }

        let activity = self.get(current.activity_id).await?;
        if activity.has_ended(Utc::now()) {
            return Err(ScholarDeskError::InvalidInput(
                "Excuses must be requested before the activity ends".to_string(),
            ));
        }

        let updated = self.db.activities
            .transition_application(participation_id, current.status, to, None, Some(reason))
            .await?;
        log_status_change("activity_application", participation_id, current.status.as_str(), to.as_str(), user.id);
        Ok(updated)
    }

    /// Grant the excuse or mark the student absent
    pub async fn decide_excuse(&self, admin: &User, participation_id: i64, approve: bool) -> Result<ActivityApplication> {
        self.auth.require_permission(admin, Permission::ManageActivities)?;
        let current = self.participation(participation_id).await?;
        let to = if approve { ActivityApplicationStatus::Excused } else { ActivityApplicationStatus::Absent };
        if current.status != ActivityApplicationStatus::ExcuseRequested {
            return Err(ScholarDeskError::transition(current.status, to));
        }

        let updated = self.db.activities
            .transition_application(participation_id, current.status, to, Some(admin.id), None)
            .await?;
        log_status_change("activity_application", participation_id, current.status.as_str(), to.as_str(), admin.id);
        self.notify_decision(&updated).await;
        Ok(updated)
    }

    pub async fn list_applications(&self, admin: &User, activity_id: i64) -> Result<Vec<ActivityApplication>> {
        self.auth.require_permission(admin, Permission::ManageActivities)?;
        self.db.activities.list_applications(activity_id).await
    }

    pub async fn list_mine(&self, user: &User) -> Result<Vec<ActivityApplication>> {
        match self.db.students.find_by_user_id(user.id).await? {
            Some(student) => self.db.activities.list_for_student(student.id).await,
            None => Ok(Vec::new()),
        }
    }

    async fn participation(&self, participation_id: i64) -> Result<ActivityApplication> {
        self.db.activities.find_application(participation_id).await?
            .ok_or(ScholarDeskError::NotFound { entity: "Activity application", id: participation_id })
    }

    async fn active_student(&self, user: &User) -> Result<Student> {
        self.auth.require_active(user)?;
        let student = self.db.students.find_by_user_id(user.id).await?
            .ok_or_else(|| ScholarDeskError::PermissionDenied(format!("User {} is not a student", user.id)))?;
        if !student.status.may_participate() {
            return Err(ScholarDeskError::PermissionDenied(format!(
                "Student {} is {}",
                student.id, student.status
            )));
        }
        Ok(student)
    }

    async fn own_participation(&self, user: &User, participation_id: i64) -> Result<(Student, ActivityApplication)> {
        self.auth.require_active(user)?;
        let student = self.db.students.find_by_user_id(user.id).await?
            .ok_or_else(|| ScholarDeskError::PermissionDenied(format!("User {} is not a student", user.id)))?;
        let participation = self.participation(participation_id).await?;
        if participation.student_id != student.id {
            return Err(ScholarDeskError::NotFound { entity: "Activity application", id: participation_id });
        }
        Ok((student, participation))
    }

    async fn notify_decision(&self, participation: &ActivityApplication) {
        let Ok(Some(student)) = self.db.students.find_by_id(participation.student_id).await else {
            return;
        };
        let Ok(Some(user)) = self.db.users.find_by_id(student.user_id).await else {
            return;
        };
        let Ok(activity) = self.get(participation.activity_id).await else {
            return;
        };

        let parameters = params([
            ("activity_title", activity.title),
            ("status", participation.status.to_string()),
        ]);
        self.notifications.notify(&user, "activity_decision", &parameters).await;
    }
}
