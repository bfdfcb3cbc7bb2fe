//! Authorization service implementation
//!
//! Identity is established upstream; this service only decides what an
//! already-authenticated user may do based on their role.

use std::collections::HashSet;
use tracing::{info, warn, debug};
use crate::models::user::{User, UserRole};
use crate::utils::errors::{ScholarDeskError, Result};

/// Operations guarded by role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Own profile, applications, tickets and requests
    SelfService,
    /// Decide applications for scholarships the user sponsors
    SponsorReview,
    /// Move applications through the admin stages
    ReviewApplications,
    ManageCatalog,
    ManageScholarships,
    ManageStudents,
    ManageActivities,
    AnswerTickets,
    ReviewRequests,
    PublishAnnouncements,
    ViewStatistics,
}

/// Authorization context for a user
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: UserRole,
    pub permissions: HashSet<Permission>,
}

impl AuthContext {
    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Role-based access control over authenticated users
#[derive(Clone, Debug, Default)]
pub struct AuthService;

impl AuthService {
    pub fn new() -> Self {
        Self
    }

    /// Permissions granted to a role
    pub fn permissions_for(role: UserRole) -> HashSet<Permission> {
        let mut permissions = HashSet::new();
        permissions.insert(Permission::SelfService);

        match role {
            UserRole::Applicant => {}
            UserRole::Sponsor => {
                permissions.insert(Permission::SponsorReview);
            }
            UserRole::Admin => {
                permissions.extend([
                    Permission::SponsorReview,
                    Permission::ReviewApplications,
                    Permission::ManageCatalog,
                    Permission::ManageScholarships,
                    Permission::ManageStudents,
                    Permission::ManageActivities,
                    Permission::AnswerTickets,
                    Permission::ReviewRequests,
                    Permission::PublishAnnouncements,
                    Permission::ViewStatistics,
                ]);
            }
        }

        permissions
    }

    /// Get authorization context for a user
    pub fn get_auth_context(&self, user: &User) -> AuthContext {
        let context = AuthContext {
            user_id: user.id,
            role: user.role,
            permissions: Self::permissions_for(user.role),
        };

        debug!(user_id = user.id, role = %user.role, permissions = ?context.permissions, "Authorization context created");
        context
    }

    /// Check if user has specific permission
    pub fn has_permission(&self, user: &User, permission: Permission) -> bool {
        user.is_active && Self::permissions_for(user.role).contains(&permission)
    }

    /// Require specific permission or return error
    pub fn require_permission(&self, user: &User, permission: Permission) -> Result<AuthContext> {
        self.require_active(user)?;
        let context = self.get_auth_context(user);

        if !context.has(permission) {
            self.log_auth_event(user.id, &format!("{:?}", permission), false, None);
            return Err(ScholarDeskError::PermissionDenied(format!(
                "User {} lacks required permission: {:?}",
                user.id, permission
            )));
        }

        Ok(context)
    }

    /// Require one of the given roles
    pub fn require_role(&self, user: &User, roles: &[UserRole]) -> Result<()> {
        self.require_active(user)?;
        if !roles.contains(&user.role) {
            return Err(ScholarDeskError::PermissionDenied(format!(
                "Role {} is not allowed here",
                user.role
            )));
        }
        Ok(())
    }

    /// Deactivated accounts can do nothing
    pub fn require_active(&self, user: &User) -> Result<()> {
        if !user.is_active {
            self.log_auth_event(user.id, "access", false, Some("account deactivated"));
            return Err(ScholarDeskError::PermissionDenied(format!(
                "User {} is deactivated",
                user.id
            )));
        }
        Ok(())
    }

    /// Owner of a record or staff allowed by `permission`
    pub fn require_owner_or(&self, user: &User, owner_user_id: i64, permission: Permission) -> Result<()> {
        if user.id == owner_user_id {
            return self.require_active(user);
        }
        self.require_permission(user, permission).map(|_| ())
    }

    /// Log authorization event
    pub fn log_auth_event(&self, user_id: i64, action: &str, success: bool, details: Option<&str>) {
        if success {
            info!(
                user_id = user_id,
                action = action,
                details = details,
                "Authorization event: success"
            );
        } else {
            warn!(
                user_id = user_id,
                action = action,
                details = details,
                "Authorization event: failure"
            );
        }
    }
}
