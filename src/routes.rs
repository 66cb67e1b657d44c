//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod archive;
mod divisions;
mod schedule;
mod sessions;
mod years;

use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    http::{header, Method},
    routing::{delete, get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    // Build the router
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Division routes
        .route("/api/divisions", get(divisions::list_divisions))
        .route("/api/divisions/{id}", get(divisions::get_division))

        // Edit session routes
        .route("/api/sessions", post(sessions::open_session))
        .route("/api/sessions/{id}", get(sessions::get_session))
        .route("/api/sessions/{id}/edits", post(sessions::apply_edits))
        .route("/api/sessions/{id}/save", post(sessions::save_session))
        .route("/api/sessions/{id}/reset", post(sessions::reset_session))
        .route("/api/sessions/{id}/exit", post(sessions::exit_session))
        .route("/api/sessions/{id}/select", post(sessions::select_division))
        .route("/api/sessions/{id}/improvement", post(sessions::toggle_improvement))

        // Academic year routes
        .route("/api/years", get(years::list_years).post(years::create_year))
        .route("/api/years/next", post(years::create_next_year))
        .route("/api/years/latest", delete(years::delete_latest_year))
        .route("/api/years/{id}", delete(years::delete_year))
        .route("/api/years/{id}/current", post(years::set_current_year))

        // Schedule routes
        .route("/api/schedule", get(schedule::list_schedule).post(schedule::toggle_selection))
        .route("/api/schedule/grid", get(schedule::get_grid))
        .route("/api/schedule/grid/toggle", post(schedule::toggle_from_grid))

        // Archive routes
        .route("/api/submissions", get(archive::list_submissions))
        .route("/api/submissions/diff", get(archive::diff_submissions))
        .route("/api/recent-changes", get(archive::list_recent_changes))
        .route("/api/archive", get(archive::get_archive))

        // Apply middleware and state
        .layer(middleware)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .max_age(Duration::from_secs(3600))
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .max_age(Duration::from_secs(3600))
    }
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
