//! User repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::database::connection::is_unique_violation;
use crate::models::user::{User, UserRole, CreateUserRequest, UpdateUserRequest};
use crate::utils::errors::ScholarDeskError;

const USER_COLUMNS: &str =
    "id, email, full_name, phone, role, language_code, is_active, created_at, updated_at";

#[derive(Clone)]
#[derive(Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, request: CreateUserRequest) -> Result<User, ScholarDeskError> {
        let sql = format!(
            r#"
            INSERT INTO users (email, full_name, phone, role, language_code, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        let email = request.email.clone();
        sqlx::query_as::<_, User>(&sql)
            .bind(request.email)
            .bind(request.full_name)
            .bind(request.phone)
            .bind(request.role)
            .bind(request.language_code.unwrap_or_else(|| "en".to_string()))
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ScholarDeskError::Duplicate(format!("user with email {}", email))
                } else {
                    e.into()
                }
            })
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, ScholarDeskError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find user by normalized email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ScholarDeskError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Update user
    pub async fn update(&self, id: i64, request: UpdateUserRequest) -> Result<User, ScholarDeskError> {
        let sql = format!(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                phone = COALESCE($3, phone),
                language_code = COALESCE($4, language_code),
                is_active = COALESCE($5, is_active),
                updated_at = $6
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(request.full_name)
            .bind(request.phone)
            .bind(request.language_code)
            .bind(request.is_active)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ScholarDeskError::UserNotFound { user_id: id })
    }

    /// List users with a role, newest first
    pub async fn list_by_role(&self, role: UserRole, limit: i64, offset: i64) -> Result<Vec<User>, ScholarDeskError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(role)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }
}
