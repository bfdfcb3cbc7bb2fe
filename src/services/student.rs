//! Student service

use tracing::info;
use crate::database::DatabaseService;
use crate::models::student::{Student, StudentStatusTrail};
use crate::models::user::User;
use crate::services::auth::{AuthService, Permission};
use crate::utils::errors::{ScholarDeskError, Result};
use crate::utils::helpers::page_bounds;
use crate::utils::logging::log_status_change;
use crate::workflow::StudentStatus;

#[derive(Clone, Debug)]
pub struct StudentService {
    db: DatabaseService,
    auth: AuthService,
}

impl StudentService {
    pub fn new(db: DatabaseService) -> Self {
        Self {
            db,
            auth: AuthService::new(),
        }
    }

    /// The caller's student record, if they have been enrolled
    pub async fn current(&self, user: &User) -> Result<Option<Student>> {
        self.db.students.find_by_user_id(user.id).await
    }

    pub async fn get(&self, actor: &User, student_id: i64) -> Result<Student> {
        let student = self.db.students.find_by_id(student_id).await?
            .ok_or(ScholarDeskError::StudentNotFound { student_id })?;
        self.auth.require_owner_or(actor, student.user_id, Permission::ManageStudents)?;
        Ok(student)
    }

    pub async fn find_by_number(&self, admin: &User, student_number: &str) -> Result<Option<Student>> {
        self.auth.require_permission(admin, Permission::ManageStudents)?;
        self.db.students.find_by_number(student_number.trim()).await
    }

    pub async fn list(&self, admin: &User, status: Option<StudentStatus>, limit: i64, offset: i64) -> Result<Vec<Student>> {
        self.auth.require_permission(admin, Permission::ManageStudents)?;
        let (limit, offset) = page_bounds(limit, offset)?;
        self.db.students.list(status, limit, offset).await
    }

    /// Admin-only lifecycle change with a trail entry
    pub async fn change_status(&self, admin: &User, student_id: i64, to: StudentStatus, note: Option<String>) -> Result<Student> {
        self.auth.require_permission(admin, Permission::ManageStudents)?;
        let student = self.db.students.find_by_id(student_id).await?
            .ok_or(ScholarDeskError::StudentNotFound { student_id })?;

        let from = student.status;
        if !from.can_transition_to(to) {
            return Err(ScholarDeskError::transition(from, to));
        }

        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let updated = self.db.students.transition(student_id, from, to, admin.id, note).await?;

        log_status_change("student", student_id, from.as_str(), to.as_str(), admin.id);
        info!(student_id = student_id, from = %from, to = %to, "Student status changed");
        Ok(updated)
    }

    pub async fn history(&self, actor: &User, student_id: i64) -> Result<Vec<StudentStatusTrail>> {
        self.get(actor, student_id).await?;
        self.db.students.trail(student_id).await
    }
}
