//! Services module
//!
//! Business rules live here. Every operation takes the acting [`User`]
//! and checks permissions before touching the database.
//!
//! [`User`]: crate::models::user::User

pub mod activity;
pub mod announcement;
pub mod applicant;
pub mod application;
pub mod attendance;
pub mod auth;
pub mod catalog;
pub mod notification;
pub mod redis;
pub mod request;
pub mod scholarship;
pub mod student;
pub mod ticket;
pub mod user;

// Re-export commonly used services
pub use activity::ActivityService;
pub use announcement::AnnouncementService;
pub use applicant::ApplicantService;
pub use application::{ApplicationService, TransitionOutcome};
pub use attendance::AttendanceService;
pub use auth::{AuthService, AuthContext, Permission};
pub use catalog::CatalogService;
pub use notification::{
    LogChannel, MessageTemplate, Notification, NotificationChannel, NotificationService,
    NotificationStats, WebhookChannel,
};
pub use redis::RedisService;
pub use request::RequestService;
pub use scholarship::ScholarshipService;
pub use student::StudentService;
pub use ticket::TicketService;
pub use user::UserService;

use std::sync::Arc;
use tracing::{info, warn};
use crate::config::settings::Settings;
use crate::database::{DatabasePool, DatabaseService};
use crate::models::user::User;
use crate::storage::{storage_from_config, DocumentPolicy, DocumentStorage};
use crate::utils::errors::Result;

const STORAGE_HEALTH_KEY: &str = "health/check";

/// Service factory for creating and managing all services
#[derive(Clone, Debug)]
pub struct ServiceFactory {
    pub db: DatabaseService,
    pub storage: Arc<dyn DocumentStorage>,
    pub redis_service: Option<RedisService>,
    pub notification_service: NotificationService,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub applicant_service: ApplicantService,
    pub catalog_service: CatalogService,
    pub scholarship_service: ScholarshipService,
    pub application_service: ApplicationService,
    pub student_service: StudentService,
    pub activity_service: ActivityService,
    pub attendance_service: AttendanceService,
    pub ticket_service: TicketService,
    pub request_service: RequestService,
    pub announcement_service: AnnouncementService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: Settings, pool: DatabasePool) -> Result<Self> {
        let storage = storage_from_config(&settings.storage)?;
        Self::with_storage(settings, pool, storage)
    }

    /// Same as [`ServiceFactory::new`] with an explicit storage backend
    pub fn with_storage(settings: Settings, pool: DatabasePool, storage: Arc<dyn DocumentStorage>) -> Result<Self> {
        let db = DatabaseService::new(pool);
        let notification_service = NotificationService::new(&settings.notifications)?;
        Ok(Self::assemble(settings, db, storage, notification_service))
    }

    /// Wire services around already-built infrastructure
    pub fn assemble(
        settings: Settings,
        db: DatabaseService,
        storage: Arc<dyn DocumentStorage>,
        notification_service: NotificationService,
    ) -> Self {
        let redis_service = if settings.features.catalog_cache {
            match RedisService::new(&settings.redis) {
                Ok(service) => Some(service),
                Err(e) => {
                    warn!(error = %e, "Catalog cache disabled: Redis client could not be created");
                    None
                }
            }
        } else {
            None
        };

        let policy = DocumentPolicy::from_config(&settings.storage);

        let factory = Self {
            user_service: UserService::new(db.users.clone(), settings.clone()),
            applicant_service: ApplicantService::new(db.clone(), storage.clone(), policy),
            catalog_service: CatalogService::new(db.catalog.clone(), redis_service.clone()),
            scholarship_service: ScholarshipService::new(db.clone()),
            application_service: ApplicationService::new(
                db.clone(),
                notification_service.clone(),
                settings.workflow.clone(),
            ),
            student_service: StudentService::new(db.clone()),
            activity_service: ActivityService::new(db.clone(), notification_service.clone()),
            attendance_service: AttendanceService::new(db.clone(), &settings.attendance),
            ticket_service: TicketService::new(db.clone(), notification_service.clone()),
            request_service: RequestService::new(db.clone(), notification_service.clone()),
            announcement_service: AnnouncementService::new(db.clone()),
            auth_service: AuthService::new(),
            notification_service,
            redis_service,
            storage,
            db,
        };

        info!(
            storage = factory.storage.backend(),
            catalog_cache = factory.redis_service.is_some(),
            channels = ?factory.notification_service.channel_names(),
            "Services initialized"
        );
        factory
    }

    /// Dashboard counts across every table
    pub async fn system_stats(&self, admin: &User) -> Result<serde_json::Value> {
        self.auth_service.require_permission(admin, Permission::ViewStatistics)?;
        self.db.get_system_stats().await
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let redis_check = async {
            match &self.redis_service {
                Some(redis) => Some(redis.health_check().await),
                None => None,
            }
        };
        let (database, redis_healthy, storage) = futures::join!(
            crate::database::health_check(self.db.pool()),
            redis_check,
            self.storage.exists(STORAGE_HEALTH_KEY),
        );

        let database_healthy = database.is_ok();
        let storage_healthy = match storage {
            Ok(_) => true,
            Err(e) => {
                warn!(backend = self.storage.backend(), error = %e, "Storage health check failed");
                false
            }
        };

        ServiceHealthStatus {
            database_healthy,
            redis_healthy,
            storage_backend: self.storage.backend(),
            storage_healthy,
            notification_channels: self.notification_service.channel_names(),
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    /// `None` when the catalog cache is disabled
    pub redis_healthy: Option<bool>,
    pub storage_backend: &'static str,
    pub storage_healthy: bool,
    pub notification_channels: Vec<&'static str>,
}

impl ServiceHealthStatus {
    /// Check if all critical services are healthy
    pub fn is_healthy(&self) -> bool {
        self.database_healthy && self.storage_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }
        if self.redis_healthy == Some(false) {
            issues.push("Redis connection failed; catalog reads fall back to the database".to_string());
        }
        if !self.storage_healthy {
            issues.push(format!("Storage backend '{}' unreachable", self.storage_backend));
        }
        if self.notification_channels.is_empty() {
            issues.push("No notification channels configured".to_string());
        }

        issues
    }
}
