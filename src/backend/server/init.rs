/**
 * Server Initialization
 *
 * Builds the application from the environment: configuration, database
 * pool with migrations, the collaborator implementations (Postgres
 * directory and notifier, SMTP or logging mailer), the service state and
 * the router. Also spawns the stale-case sweep interval task when enabled.
 *
 * # Initialization Process
 *
 * 1. Load configuration from the environment
 * 2. Connect the pool and run migrations (fatal on failure)
 * 3. Wire the collaborators behind their trait seams
 * 4. Build `AppState` and the router
 * 5. Spawn the sweep task (unless `SWEEP_INTERVAL_SECS=0`)
 */

use std::sync::Arc;

use axum::Router;
use chrono::Utc;

use crate::backend::cases::sweep::sweep_stale_cases;
use crate::backend::directory::{Directory, PgDirectory};
use crate::backend::mail::{LogMailer, ProposalMailer, SmtpMailer};
use crate::backend::notify::{Notifier, PgNotifier};
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_database, ServerConfig};
use crate::backend::server::state::AppState;

/// Create and configure the Axum application
///
/// # Returns
///
/// The configured router, ready to serve requests, or the startup error
/// (missing database, unusable SMTP credentials).
pub async fn create_app() -> Result<Router, Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env();
    create_app_with_config(&config).await
}

/// Like [`create_app`], with the configuration supplied by the caller.
pub async fn create_app_with_config(
    config: &ServerConfig,
) -> Result<Router, Box<dyn std::error::Error>> {
    tracing::info!("Initializing backend server");

    let pool = load_database().await?;

    let directory: Arc<dyn Directory> = Arc::new(PgDirectory::new(pool.clone()));
    let notifier: Arc<dyn Notifier> = Arc::new(PgNotifier::new(
        pool.clone(),
        config.push_gateway_url.clone(),
    ));
    let mailer: Arc<dyn ProposalMailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(
            &smtp.host,
            &smtp.username,
            &smtp.password,
            &smtp.from,
        )?),
        None => Arc::new(LogMailer),
    };

    let app_state = AppState::new(pool, directory, notifier, mailer);
    let app = create_router(app_state.clone());

    if config.sweep_interval_secs > 0 {
        spawn_sweep_task(app_state, config.sweep_interval_secs);
    } else {
        tracing::info!("Stale-case sweep disabled (SWEEP_INTERVAL_SECS=0)");
    }

    tracing::info!("Router configured");

    Ok(app)
}

/// Periodically force-close cases stuck in awaiting-acceptance. A failed
/// run is logged and the loop keeps going.
fn spawn_sweep_task(app_state: AppState, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            if let Err(err) = sweep_stale_cases(&app_state.pool, Utc::now()).await {
                tracing::error!("Stale-case sweep failed: {}", err);
            }
        }
    });
    tracing::info!("Stale-case sweep scheduled every {}s", interval_secs);
}
