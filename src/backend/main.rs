/**
 * FixDesk Server Entry Point
 *
 * Boots the Axum HTTP server: environment, tracing, database pool with
 * migrations, router and the stale-case sweeper.
 */

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    // Build the Axum app (pool, migrations, services, sweeper)
    let config = fixdesk::backend::server::config::ServerConfig::from_env();
    let app = fixdesk::backend::server::init::create_app_with_config(&config).await?;

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
