//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(handlers::FILES_PATH, get(handlers::list_files))
        .route(handlers::MEASUREMENTS_PATH, get(handlers::list_measurements))
        .route(
            "/api/v1/measurement/{measurement_id}",
            get(handlers::get_measurement),
        )
        .route(
            "/api/v2/ooniprobe/vpn-config/{provider}",
            get(handlers::get_vpn_config),
        )
        .route("/api/_/version", get(handlers::get_version))
        // Health check for load balancers
        .route("/health", get(handlers::health_check));

    let mut router = Router::new().merge(api_routes);

    // SECURITY: when enabled, restrict /metrics to Prometheus scrapers at
    // the network level.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
