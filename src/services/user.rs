//! User service implementation
//!
//! This service handles account registration, profile updates, language
//! preferences and account deactivation.

use tracing::{info, warn, debug};
use crate::config::settings::Settings;
use crate::database::repositories::UserRepository;
use crate::models::user::{User, UserRole, CreateUserRequest, UpdateUserRequest};
use crate::services::auth::{AuthService, Permission};
use crate::services::notification::SUPPORTED_LANGUAGES;
use crate::utils::errors::{ScholarDeskError, Result};
use crate::utils::helpers::{is_valid_email, is_valid_phone, normalize_email, page_bounds, require_text};
use crate::utils::logging::log_admin_action;

/// User service for managing user operations
#[derive(Clone, Debug)]
pub struct UserService {
    user_repository: UserRepository,
    auth: AuthService,
    settings: Settings,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(user_repository: UserRepository, settings: Settings) -> Self {
        Self {
            user_repository,
            auth: AuthService::new(),
            settings,
        }
    }

    /// Register a new account
    pub async fn register(&self, request: CreateUserRequest) -> Result<User> {
        let email = normalize_email(&request.email);
        debug!(email = %email, role = %request.role, "Registering user");

        if !is_valid_email(&email) {
            return Err(ScholarDeskError::InvalidInput(format!("Invalid email: {}", request.email)));
        }
        let full_name = require_text("Full name", &request.full_name)?;
        let phone = Self::validated_phone(request.phone)?;
        let language_code = self.validated_language(request.language_code)?;

        let user = self.user_repository.create(CreateUserRequest {
            email,
            full_name,
            phone,
            role: request.role,
            language_code: Some(language_code),
        }).await?;

        info!(user_id = user.id, role = %user.role, "New user registered successfully");
        Ok(user)
    }

    /// Get user by ID
    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        debug!(user_id = user_id, "Getting user by ID");
        self.user_repository.find_by_id(user_id).await?
            .ok_or(ScholarDeskError::UserNotFound { user_id })
    }

    /// Get user by email, case-insensitively
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repository.find_by_email(&normalize_email(email)).await
    }

    /// Update own profile, or anyone's as an admin
    pub async fn update_profile(&self, actor: &User, user_id: i64, request: UpdateUserRequest) -> Result<User> {
        self.auth.require_owner_or(actor, user_id, Permission::ManageStudents)?;
        debug!(user_id = user_id, actor_id = actor.id, "Updating user profile");

        if request.is_active.is_some() && actor.role != UserRole::Admin {
            return Err(ScholarDeskError::PermissionDenied(
                "Only admins can change account activation".to_string(),
            ));
        }

        let update = UpdateUserRequest {
            full_name: request.full_name.map(|n| require_text("Full name", &n)).transpose()?,
            phone: Self::validated_phone(request.phone)?,
            language_code: request.language_code.map(|l| self.validated_language(Some(l))).transpose()?,
            is_active: request.is_active,
        };

        let user = self.user_repository.update(user_id, update).await?;
        info!(user_id = user_id, actor_id = actor.id, "User profile updated successfully");
        Ok(user)
    }

    /// Set user language preference
    pub async fn set_language_preference(&self, actor: &User, language_code: String) -> Result<User> {
        let update = UpdateUserRequest {
            language_code: Some(language_code),
            ..Default::default()
        };
        self.update_profile(actor, actor.id, update).await
    }

    /// Deactivate an account (admin only)
    pub async fn deactivate(&self, admin: &User, user_id: i64) -> Result<User> {
        self.auth.require_role(admin, &[UserRole::Admin])?;
        if admin.id == user_id {
            return Err(ScholarDeskError::InvalidInput("Admins cannot deactivate themselves".to_string()));
        }

        let update = UpdateUserRequest {
            is_active: Some(false),
            ..Default::default()
        };
        let user = self.user_repository.update(user_id, update).await?;

        warn!(user_id = user_id, admin_id = admin.id, "User deactivated");
        log_admin_action(admin.id, "deactivate_user", Some(&user_id.to_string()), None);
        Ok(user)
    }

    /// List users with a role (admin only)
    pub async fn list_by_role(&self, admin: &User, role: UserRole, limit: i64, offset: i64) -> Result<Vec<User>> {
        self.auth.require_role(admin, &[UserRole::Admin])?;
        let (limit, offset) = page_bounds(limit, offset)?;
        self.user_repository.list_by_role(role, limit, offset).await
    }

    fn validated_phone(phone: Option<String>) -> Result<Option<String>> {
        match phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()) {
            Some(p) if !is_valid_phone(&p) => {
                Err(ScholarDeskError::InvalidInput(format!("Invalid phone number: {}", p)))
            }
            other => Ok(other),
        }
    }

    fn validated_language(&self, language_code: Option<String>) -> Result<String> {
        let code = language_code
            .map(|l| l.trim().to_lowercase())
            .unwrap_or_else(|| self.settings.notifications.default_language.clone());

        if !SUPPORTED_LANGUAGES.contains(&code.as_str()) {
            warn!(language_code = %code, "Unsupported language code");
            return Err(ScholarDeskError::InvalidInput(format!("Unsupported language: {}", code)));
        }
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service() -> UserService {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/scholardesk_unused")
            .unwrap();
        UserService::new(UserRepository::new(pool), Settings::default())
    }

    #[tokio::test]
    async fn test_language_validation() {
        let service = service();
        assert_eq!(service.validated_language(Some(" FR ".to_string())).unwrap(), "fr");
        assert_eq!(service.validated_language(None).unwrap(), "en");
        assert_matches!(
            service.validated_language(Some("xx".to_string())),
            Err(ScholarDeskError::InvalidInput(_))
        );
    }

    #[test]
    fn test_phone_validation() {
        assert_eq!(UserService::validated_phone(Some("  ".to_string())).unwrap(), None);
        assert!(UserService::validated_phone(Some("not a phone".to_string())).is_err());
    }

    #[tokio::test]
    async fn test_register_rejects_bad_email_before_touching_db() {
        let result = service()
            .register(CreateUserRequest {
                email: "nope".to_string(),
                full_name: "Nobody".to_string(),
                phone: None,
                role: UserRole::Applicant,
                language_code: None,
            })
            .await;
        assert_matches!(result, Err(ScholarDeskError::InvalidInput(_)));
    }
}
