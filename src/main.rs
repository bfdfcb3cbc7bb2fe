//! ScholarDesk daemon
//!
//! Connects to the database, wires services and runs periodic maintenance

use std::time::Duration;
use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn, error};

use scholardesk::{
    config::Settings,
    utils::logging,
    database::connection::{create_pool, run_migrations, DatabaseConfig},
    database::MaintenancePolicy,
    services::ServiceFactory,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    settings.validate()?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", scholardesk::info());

    // Initialize database connection
    info!("Connecting to database...");
    let pool = create_pool(&DatabaseConfig::from(&settings.database)).await?;

    run_migrations(&pool).await?;

    // Initialize services
    info!("Initializing services...");
    let services = ServiceFactory::new(settings.clone(), pool)?;

    let health = services.health_check().await;
    if health.is_healthy() {
        info!(
            storage = health.storage_backend,
            redis = ?health.redis_healthy,
            channels = ?health.notification_channels,
            "Health check passed"
        );
    } else {
        warn!(issues = ?health.get_issues(), "Health check reported problems");
    }

    let maintenance = MaintenancePolicy::from_settings(&settings);
    let interval_seconds = settings.features.maintenance_interval_seconds.max(1);
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
    info!(
        interval_seconds = interval_seconds,
        check_in_grace_minutes = maintenance.check_in_grace.num_minutes(),
        "ScholarDesk is ready"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match services.db.run_maintenance(Utc::now(), &maintenance).await {
                    Ok(report) => info!(report = %report, "Maintenance pass finished"),
                    Err(e) if e.is_recoverable() => {
                        warn!(error = %e, severity = %e.severity(), "Maintenance pass failed, retrying next tick")
                    }
                    Err(e) => error!(error = %e, severity = %e.severity(), "Maintenance pass failed"),
                }
                services.attendance_service.limiter().prune();
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for shutdown signal");
                }
                break;
            }
        }
    }

    info!("ScholarDesk has been shut down.");
    Ok(())
}
