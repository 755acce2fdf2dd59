/**
 * Server Configuration
 *
 * Loads the runtime configuration from environment variables. The database
 * is the one hard requirement; everything else degrades with a log line
 * (no push gateway means no pushes, no SMTP means proposals are logged).
 *
 * # Environment Variables
 *
 * - `DATABASE_URL` - PostgreSQL connection string (required)
 * - `SERVER_PORT` - HTTP port (default 3000)
 * - `PUSH_GATEWAY_URL` - base URL of the push relay (optional)
 * - `SMTP_HOST` / `SMTP_USERNAME` / `SMTP_PASSWORD` / `SMTP_FROM` - mail
 *   relay credentials; all four or nothing
 * - `SWEEP_INTERVAL_SECS` - stale-case sweep cadence (default 3600, 0
 *   disables the task)
 */

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Mail relay settings; present only when fully configured.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Runtime configuration, minus the database pool.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub push_gateway_url: Option<String>,
    pub smtp: Option<SmtpSettings>,
    /// Zero disables the background sweep.
    pub sweep_interval_secs: u64,
}

impl ServerConfig {
    /// Read the configuration from the environment. Missing optional pieces
    /// are logged, never fatal.
    pub fn from_env() -> Self {
        let port = std::env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .unwrap_or(3000);

        let push_gateway_url = std::env::var("PUSH_GATEWAY_URL").ok();
        if push_gateway_url.is_none() {
            tracing::info!("PUSH_GATEWAY_URL not set. Push delivery disabled.");
        }

        let smtp = match (
            std::env::var("SMTP_HOST"),
            std::env::var("SMTP_USERNAME"),
            std::env::var("SMTP_PASSWORD"),
            std::env::var("SMTP_FROM"),
        ) {
            (Ok(host), Ok(username), Ok(password), Ok(from)) => Some(SmtpSettings {
                host,
                username,
                password,
                from,
            }),
            _ => {
                tracing::info!("SMTP not fully configured. Proposal emails will be logged only.");
                None
            }
        };

        let sweep_interval_secs = std::env::var("SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(3600);

        Self {
            port,
            push_gateway_url,
            smtp,
            sweep_interval_secs,
        }
    }
}

/// Connect to PostgreSQL and run migrations.
///
/// Unlike the optional collaborators, the database is load-bearing: every
/// operation goes through it, so a missing `DATABASE_URL` or a failed
/// migration aborts startup.
pub async fn load_database() -> Result<PgPool, sqlx::Error> {
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| sqlx::Error::Configuration("DATABASE_URL is not set".into()))?;

    tracing::info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");

    tracing::info!("Running database migrations...");
    sqlx::migrate!()
        .run(&pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;
    tracing::info!("Database migrations completed successfully");

    Ok(pool)
}
