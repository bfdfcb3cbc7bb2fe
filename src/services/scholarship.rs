//! Scholarship service

use chrono::{DateTime, Utc};
use tracing::info;
use crate::database::DatabaseService;
use crate::models::scholarship::{Scholarship, CreateScholarshipRequest, UpdateScholarshipRequest};
use crate::models::user::{User, UserRole};
use crate::services::auth::{AuthService, Permission};
use crate::utils::errors::{ScholarDeskError, Result};
use crate::utils::helpers::require_text;
use crate::utils::logging::log_admin_action;

#[derive(Clone, Debug)]
pub struct ScholarshipService {
    db: DatabaseService,
    auth: AuthService,
}

/// Opening must precede closing; seat limits must be positive
pub fn validate_window(opens_at: DateTime<Utc>, closes_at: DateTime<Utc>, seats: Option<i32>) -> Result<()> {
    if opens_at >= closes_at {
        return Err(ScholarDeskError::InvalidInput(
            "Scholarship must open before it closes".to_string(),
        ));
    }
    if matches!(seats, Some(s) if s <= 0) {
        return Err(ScholarDeskError::InvalidInput("Seats must be positive".to_string()));
    }
    Ok(())
}

impl ScholarshipService {
    pub fn new(db: DatabaseService) -> Self {
        Self {
            db,
            auth: AuthService::new(),
        }
    }

    pub async fn get(&self, scholarship_id: i64) -> Result<Scholarship> {
        self.db.scholarships.find_by_id(scholarship_id).await?
            .ok_or(ScholarDeskError::ScholarshipNotFound { scholarship_id })
    }

    pub async fn create(&self, admin: &User, request: CreateScholarshipRequest) -> Result<Scholarship> {
        self.auth.require_permission(admin, Permission::ManageScholarships)?;
        validate_window(request.opens_at, request.closes_at, request.seats)?;

        if let Some(sponsor_id) = request.sponsor_id {
            let sponsor = self.db.users.find_by_id(sponsor_id).await?
                .ok_or(ScholarDeskError::UserNotFound { user_id: sponsor_id })?;
            if sponsor.role != UserRole::Sponsor {
                return Err(ScholarDeskError::InvalidInput(format!("User {} is not a sponsor", sponsor_id)));
            }
        }

        let request = CreateScholarshipRequest {
            title: require_text("Title", &request.title)?,
            ..request
        };
        let scholarship = self.db.scholarships.create(request).await?;

        info!(scholarship_id = scholarship.id, admin_id = admin.id, "Scholarship created");
        Ok(scholarship)
    }

    pub async fn update(&self, admin: &User, scholarship_id: i64, request: UpdateScholarshipRequest) -> Result<Scholarship> {
        self.auth.require_permission(admin, Permission::ManageScholarships)?;
        let current = self.get(scholarship_id).await?;

        validate_window(
            request.opens_at.unwrap_or(current.opens_at),
            request.closes_at.unwrap_or(current.closes_at),
            request.seats.or(current.seats),
        )?;

        let request = UpdateScholarshipRequest {
            title: request.title.map(|t| require_text("Title", &t)).transpose()?,
            ..request
        };
        let scholarship = self.db.scholarships.update(scholarship_id, request).await?;

        info!(scholarship_id = scholarship_id, admin_id = admin.id, "Scholarship updated");
        Ok(scholarship)
    }

    pub async fn deactivate(&self, admin: &User, scholarship_id: i64) -> Result<Scholarship> {
        self.auth.require_permission(admin, Permission::ManageScholarships)?;
        let update = UpdateScholarshipRequest {
            is_active: Some(false),
            ..Default::default()
        };
        let scholarship = self.db.scholarships.update(scholarship_id, update).await?;
        log_admin_action(admin.id, "deactivate_scholarship", Some(&scholarship_id.to_string()), None);
        Ok(scholarship)
    }

    pub async fn list_open(&self, now: DateTime<Utc>) -> Result<Vec<Scholarship>> {
        self.db.scholarships.list_open(now).await
    }

    /// A sponsor sees their own; admins can look up any sponsor
    pub async fn list_by_sponsor(&self, actor: &User, sponsor_id: i64) -> Result<Vec<Scholarship>> {
        self.auth.require_owner_or(actor, sponsor_id, Permission::ManageScholarships)?;
        self.db.scholarships.list_by_sponsor(sponsor_id).await
    }
}
