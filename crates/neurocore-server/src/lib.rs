pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Actions
        .route("/api/actions", get(routes::actions::list_actions))
        .route("/api/actions/{id}", get(routes::actions::get_action))
        .route("/api/actions/{id}/run", post(routes::actions::run_action))
        // Status
        .route("/api/status", get(routes::status::list_statuses))
        .route("/api/status/{id}", get(routes::status::get_status))
        // Metrics
        .route("/api/metrics", get(routes::metrics::get_metrics))
        // Preferences
        .route(
            "/api/preferences/{key}",
            get(routes::preferences::get_preference)
                .put(routes::preferences::put_preference)
                .delete(routes::preferences::delete_preference),
        )
        // Settings
        .route(
            "/api/settings",
            get(routes::settings::get_settings).put(routes::settings::put_settings),
        )
        // Config
        .route("/api/config", get(routes::config::get_config))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Serve the API on a pre-bound listener.
///
/// Taking the listener lets the caller learn the actual port first when it
/// bound port 0.
pub async fn serve_on(
    root: PathBuf,
    listener: tokio::net::TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(AppState::new(root)?);

    tracing::info!("NeuroCore API listening on http://localhost:{actual_port}");

    if open_browser {
        let url = format!("http://localhost:{actual_port}/api/actions");
        if let Err(e) = open::that(&url) {
            tracing::warn!(error = %e, "could not open browser");
        }
    }

    axum::serve(listener, app).await?;
    Ok(())
}
