//! Database service layer
//!
//! This module provides a high-level interface to database operations

use std::time::Instant;
use chrono::{DateTime, Duration, Utc};
use crate::database::{
    DatabasePool, UserRepository, ApplicantRepository, CatalogRepository, ScholarshipRepository,
    ApplicationRepository, StudentRepository, ActivityRepository, TicketRepository,
    RequestRepository, AnnouncementRepository, StatsRepository,
};
use crate::config::Settings;
use crate::utils::errors::ScholarDeskError;
use crate::utils::logging::log_database_operation;

/// Windows applied by [`DatabaseService::run_maintenance`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaintenancePolicy {
    /// Check-in stays open this long after an activity ends
    pub check_in_grace: Duration,
    /// Answered tickets idle this long are closed; `None` disables
    pub ticket_idle: Option<Duration>,
}

impl MaintenancePolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            check_in_grace: settings.attendance.check_in_grace(),
            ticket_idle: settings.features.ticket_idle_window(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: DatabasePool,
    pub users: UserRepository,
    pub applicants: ApplicantRepository,
    pub catalog: CatalogRepository,
    pub scholarships: ScholarshipRepository,
    pub applications: ApplicationRepository,
    pub students: StudentRepository,
    pub activities: ActivityRepository,
    pub tickets: TicketRepository,
    pub requests: RequestRepository,
    pub announcements: AnnouncementRepository,
    pub stats: StatsRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            applicants: ApplicantRepository::new(pool.clone()),
            catalog: CatalogRepository::new(pool.clone()),
            scholarships: ScholarshipRepository::new(pool.clone()),
            applications: ApplicationRepository::new(pool.clone()),
            students: StudentRepository::new(pool.clone()),
            activities: ActivityRepository::new(pool.clone()),
            tickets: TicketRepository::new(pool.clone()),
            requests: RequestRepository::new(pool.clone()),
            announcements: AnnouncementRepository::new(pool.clone()),
            stats: StatsRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Get system statistics
    pub async fn get_system_stats(&self) -> Result<serde_json::Value, ScholarDeskError> {
        self.stats.get_stats().await
    }

    /// Periodic housekeeping: absentees for ended activities and idle answered tickets
    pub async fn run_maintenance(&self, now: DateTime<Utc>, policy: &MaintenancePolicy) -> Result<serde_json::Value, ScholarDeskError> {
        let started = Instant::now();
        let mut absentees = 0u64;
        // Students may still check in during the grace tail
        let ended = self.activities.list_ended_with_pending_attendance(now - policy.check_in_grace).await?;
        for activity in &ended {
            absentees += self.activities.mark_absentees(activity.id).await?;
        }
        log_database_operation("mark_absentees", "activity_applications", started.elapsed().as_millis() as u64, true);

        let started = Instant::now();
        let closed_tickets = if let Some(idle) = policy.ticket_idle {
            let closed = self.tickets.close_idle(now - idle).await;
            log_database_operation("close_idle", "tickets", started.elapsed().as_millis() as u64, closed.is_ok());
            closed?
        } else {
            0
        };

        let result = serde_json::json!({
            "activities_closed": ended.len(),
            "absentees_marked": absentees,
            "tickets_closed": closed_tickets
        });

        Ok(result)
    }
}
