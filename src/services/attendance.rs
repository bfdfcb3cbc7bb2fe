//! QR check-in for programs and opportunities

use chrono::{DateTime, Duration, Utc};
use tracing::info;
use crate::attendance::{IssuedQrToken, QrTokenService, ScanLimiter};
use crate::config::AttendanceConfig;
use crate::database::DatabaseService;
use crate::models::activity::{Activity, ActivityApplication};
use crate::models::user::User;
use crate::services::auth::{AuthService, Permission};
use crate::utils::errors::{ScholarDeskError, Result};
use crate::utils::logging::{log_admin_action, log_check_in};
use crate::workflow::ActivityApplicationStatus;

#[derive(Clone, Debug)]
pub struct AttendanceService {
    db: DatabaseService,
    tokens: QrTokenService,
    limiter: ScanLimiter,
    grace: Duration,
    auth: AuthService,
}

impl AttendanceService {
    pub fn new(db: DatabaseService, config: &AttendanceConfig) -> Self {
        Self {
            db,
            tokens: QrTokenService::new(config),
            limiter: ScanLimiter::per_minute(config.scans_per_minute),
            grace: config.check_in_grace(),
            auth: AuthService::new(),
        }
    }

    pub fn limiter(&self) -> &ScanLimiter {
        &self.limiter
    }

    /// Mint a token for staff to display at the venue
    pub async fn issue_token(&self, admin: &User, activity_id: i64) -> Result<IssuedQrToken> {
        self.auth.require_permission(admin, Permission::ManageActivities)?;
        let activity = self.activity(activity_id).await?;
        if !activity.is_active {
            return Err(ScholarDeskError::InvalidInput(format!("Activity {} is not active", activity_id)));
        }

        let issued = self.tokens.issue(&activity)?;
        info!(activity_id = activity_id, issued_by = admin.id, expires_at = %issued.expires_at, "QR token issued");
        Ok(issued)
    }

    pub async fn check_in(&self, user: &User, token: &str) -> Result<ActivityApplication> {
        self.check_in_at(user, token, Utc::now()).await
    }

    pub async fn check_in_at(&self, user: &User, token: &str, now: DateTime<Utc>) -> Result<ActivityApplication> {
        self.auth.require_active(user)?;
        self.limiter.check(user.id)?;

        let claims = self.tokens.verify(token).map_err(|e| {
            log_check_in(0, user.id, false, Some(&e.to_string()));
            ScholarDeskError::from(e)
        })?;

        match self.record_check_in(user, claims.activity_id, now, |activity| {
            claims.ensure_matches(activity).map_err(ScholarDeskError::from)
        }).await {
            Ok(participation) => {
                log_check_in(claims.activity_id, user.id, true, None);
                Ok(participation)
            }
            Err(e) => {
                log_check_in(claims.activity_id, user.id, false, Some(&e.to_string()));
                Err(e)
            }
        }
    }

    async fn record_check_in<F>(&self, user: &User, activity_id: i64, now: DateTime<Utc>, matches: F) -> Result<ActivityApplication>
    where
        F: FnOnce(&Activity) -> Result<()>,
    {
        let activity = self.activity(activity_id).await?;
        matches(&activity)?;

        if !activity.accepts_check_in_at(now, self.grace) {
            return Err(ScholarDeskError::InvalidInput(format!(
                "Check-in for activity {} is closed",
                activity_id
            )));
        }

        let student = self.db.students.find_by_user_id(user.id).await?
            .ok_or_else(|| ScholarDeskError::PermissionDenied(format!("User {} is not a student", user.id)))?;
        let participation = self.db.activities.find_application_for(activity_id, student.id).await?
            .ok_or_else(|| ScholarDeskError::PermissionDenied(format!(
                "Student {} has no application for activity {}",
                student.id, activity_id
            )))?;

        match participation.status {
            ActivityApplicationStatus::Attended => Err(ScholarDeskError::Duplicate(format!(
                "Student {} already checked in to activity {}",
                student.id, activity_id
            ))),
            ActivityApplicationStatus::Accepted => self.db.activities.check_in(participation.id, now).await,
            other => Err(ScholarDeskError::transition(other, ActivityApplicationStatus::Attended)),
        }
    }

    /// Close attendance once an activity and its check-in grace are over
    pub async fn mark_absentees(&self, admin: &User, activity_id: i64) -> Result<u64> {
        self.auth.require_permission(admin, Permission::ManageActivities)?;
        let activity = self.activity(activity_id).await?;
        if !activity.attendance_closed_at(Utc::now(), self.grace) {
            return Err(ScholarDeskError::InvalidInput(format!(
                "Check-in for activity {} is still open",
                activity_id
            )));
        }

        let marked = self.db.activities.mark_absentees(activity_id).await?;
        log_admin_action(admin.id, "mark_absentees", Some(&activity_id.to_string()), Some(&format!("{} absent", marked)));
        Ok(marked)
    }

    async fn activity(&self, activity_id: i64) -> Result<Activity> {
        self.db.activities.find_by_id(activity_id).await?
            .ok_or(ScholarDeskError::ActivityNotFound { activity_id })
    }
}
