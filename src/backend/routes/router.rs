/**
 * Router Configuration
 *
 * Assembles the full Axum router:
 *
 * 1. API routes (everything under `/api`, behind the auth middleware)
 * 2. `GET /health` (public liveness probe)
 * 3. Fallback handler (404)
 *
 * The auth middleware is installed with `route_layer` right after the API
 * table so it covers exactly those routes; `/health` and the fallback stay
 * public.
 */

use axum::extract::State;
use axum::http::StatusCode;
use axum::Router;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::backend::error::ApiResult;
use crate::backend::middleware::auth::auth_middleware;
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::server::state::AppState;
use crate::shared::error::CoreError;

/// Create the Axum router with all routes configured
///
/// # Arguments
///
/// * `app_state` - Application state holding the pool and domain services
///
/// # Returns
///
/// Configured Axum Router ready to serve requests
pub fn create_router(app_state: AppState) -> Router<()> {
    // API routes first so the route_layer below covers exactly them
    let router = configure_api_routes(Router::new());
    let router = router.route_layer(axum::middleware::from_fn(auth_middleware));

    // Public routes
    let router = router.route("/health", axum::routing::get(health_check));

    // Fallback handler for 404
    let router = router.fallback(|| async { (StatusCode::NOT_FOUND, "Not Found") });

    router
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Liveness probe: answers only if the database pool still does
async fn health_check(State(pool): State<PgPool>) -> ApiResult<&'static str> {
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(CoreError::from)?;
    Ok("OK")
}
