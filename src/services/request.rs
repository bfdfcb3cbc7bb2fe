//! Student service requests (letters, leave, transfers)

use tracing::info;
use crate::database::DatabaseService;
use crate::models::request::{CreateStudentRequest, RequestStatusTrail, StudentRequest};
use crate::models::student::Student;
use crate::models::user::User;
use crate::services::auth::{AuthService, Permission};
use crate::services::notification::{params, NotificationService};
use crate::utils::errors::{ScholarDeskError, Result};
use crate::utils::helpers::{page_bounds, require_text};
use crate::utils::logging::log_status_change;
use crate::workflow::RequestStatus;

#[derive(Clone, Debug)]
pub struct RequestService {
    db: DatabaseService,
    notifications: NotificationService,
    auth: AuthService,
}

impl RequestService {
    pub fn new(db: DatabaseService, notifications: NotificationService) -> Self {
        Self {
            db,
            notifications,
            auth: AuthService::new(),
        }
    }

    pub async fn create(&self, user: &User, request: CreateStudentRequest) -> Result<StudentRequest> {
        self.auth.require_active(user)?;
        let student = self.student_of(user).await?;
        if student.status.is_terminal() {
            return Err(ScholarDeskError::PermissionDenied(format!(
                "Student {} is {}",
                student.id, student.status
            )));
        }

        let request = CreateStudentRequest {
            details: require_text("Details", &request.details)?,
            ..request
        };
        let created = self.db.requests.create(student.id, user.id, request).await?;
        info!(request_id = created.id, student_id = student.id, kind = %created.kind, "Student request created");
        Ok(created)
    }

    pub async fn get(&self, actor: &User, request_id: i64) -> Result<StudentRequest> {
        let request = self.db.requests.find_by_id(request_id).await?
            .ok_or(ScholarDeskError::NotFound { entity: "Request", id: request_id })?;
        let student = self.db.students.find_by_id(request.student_id).await?
            .ok_or(ScholarDeskError::StudentNotFound { student_id: request.student_id })?;
        self.auth.require_owner_or(actor, student.user_id, Permission::ReviewRequests)?;
        Ok(request)
    }

    /// Owner withdraws a request that nobody picked up yet
    pub async fn cancel(&self, user: &User, request_id: i64) -> Result<StudentRequest> {
        let request = self.get(user, request_id).await?;
        let student = self.student_of(user).await?;
        if request.student_id != student.id {
            return Err(ScholarDeskError::PermissionDenied(format!(
                "Request {} belongs to another student",
                request_id
            )));
        }
        self.transition(user, request, RequestStatus::Cancelled, None).await
    }

    /// Staff move a request through review
    pub async fn review(&self, staff: &User, request_id: i64, to: RequestStatus, note: Option<String>) -> Result<StudentRequest> {
        self.auth.require_permission(staff, Permission::ReviewRequests)?;
        if to.owner_may_set() {
            return Err(ScholarDeskError::InvalidInput(format!("Reviewers cannot set {}", to)));
        }
        let request = self.get(staff, request_id).await?;
        let updated = self.transition(staff, request, to, note).await?;

        if let Ok(Some(student)) = self.db.students.find_by_id(updated.student_id).await {
            if let Ok(Some(owner)) = self.db.users.find_by_id(student.user_id).await {
                let parameters = params([
                    ("kind", updated.kind.to_string()),
                    ("status", updated.status.to_string()),
                ]);
                self.notifications.notify(&owner, "request_status", &parameters).await;
            }
        }

        Ok(updated)
    }

    async fn transition(&self, actor: &User, request: StudentRequest, to: RequestStatus, note: Option<String>) -> Result<StudentRequest> {
        let from = request.status;
        if !from.can_transition_to(to) {
            return Err(ScholarDeskError::transition(from, to));
        }

        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let updated = self.db.requests.transition(request.id, from, to, actor.id, note).await?;
        log_status_change("request", request.id, from.as_str(), to.as_str(), actor.id);
        Ok(updated)
    }

    pub async fn history(&self, actor: &User, request_id: i64) -> Result<Vec<RequestStatusTrail>> {
        self.get(actor, request_id).await?;
        self.db.requests.trail(request_id).await
    }

    pub async fn list_mine(&self, user: &User) -> Result<Vec<StudentRequest>> {
        match self.db.students.find_by_user_id(user.id).await? {
            Some(student) => self.db.requests.list_for_student(student.id).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn list_by_status(&self, staff: &User, status: RequestStatus, limit: i64, offset: i64) -> Result<Vec<StudentRequest>> {
        self.auth.require_permission(staff, Permission::ReviewRequests)?;
        let (limit, offset) = page_bounds(limit, offset)?;
        self.db.requests.list_by_status(status, limit, offset).await
    }

    async fn student_of(&self, user: &User) -> Result<Student> {
        self.db.students.find_by_user_id(user.id).await?
            .ok_or_else(|| ScholarDeskError::PermissionDenied(format!("User {} is not a student", user.id)))
    }
}
