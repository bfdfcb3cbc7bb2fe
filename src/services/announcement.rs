//! Announcements addressed to audiences

use chrono::{DateTime, Utc};
use tracing::info;
use crate::database::DatabaseService;
use crate::models::announcement::{Announcement, Audience, CreateAnnouncementRequest};
use crate::models::user::{User, UserRole};
use crate::services::auth::{AuthService, Permission};
use crate::utils::errors::{ScholarDeskError, Result};
use crate::utils::helpers::require_text;
use crate::utils::logging::log_admin_action;

/// Audiences a reader belongs to
pub fn audiences_for(role: UserRole, is_student: bool) -> Vec<Audience> {
    Audience::ALL
        .iter()
        .copied()
        .filter(|audience| audience.includes(role, is_student))
        .collect()
}

#[derive(Clone, Debug)]
pub struct AnnouncementService {
    db: DatabaseService,
    auth: AuthService,
}

impl AnnouncementService {
    pub fn new(db: DatabaseService) -> Self {
        Self {
            db,
            auth: AuthService::new(),
        }
    }

    pub async fn publish(&self, admin: &User, request: CreateAnnouncementRequest) -> Result<Announcement> {
        self.auth.require_permission(admin, Permission::PublishAnnouncements)?;

        let published_at = request.published_at.unwrap_or_else(Utc::now);
        if matches!(request.expires_at, Some(end) if end <= published_at) {
            return Err(ScholarDeskError::InvalidInput(
                "Announcement must expire after it is published".to_string(),
            ));
        }

        let request = CreateAnnouncementRequest {
            title: require_text("Title", &request.title)?,
            body: require_text("Body", &request.body)?,
            published_at: Some(published_at),
            ..request
        };
        let announcement = self.db.announcements.create(admin.id, request).await?;

        info!(announcement_id = announcement.id, audience = %announcement.audience, "Announcement published");
        Ok(announcement)
    }

    /// Published, unexpired announcements addressed to the reader
    pub async fn list_visible(&self, user: &User, now: DateTime<Utc>) -> Result<Vec<Announcement>> {
        let is_student = self.db.students.find_by_user_id(user.id).await?.is_some();
        let audiences = audiences_for(user.role, is_student);
        self.db.announcements.list_visible(&audiences, now).await
    }

    pub async fn delete(&self, admin: &User, announcement_id: i64) -> Result<()> {
        self.auth.require_permission(admin, Permission::PublishAnnouncements)?;
        if !self.db.announcements.delete(announcement_id).await? {
            return Err(ScholarDeskError::NotFound { entity: "Announcement", id: announcement_id });
        }
        log_admin_action(admin.id, "delete_announcement", Some(&announcement_id.to_string()), None);
        Ok(())
    }
}
