//! HTTP surface: viewer routes, admin routes, and admin sign-in.

pub mod admin;
pub mod auth;
pub mod error;
pub mod middleware;
pub mod state;
pub mod viewer;
pub mod views;

use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use axum::{Json, Router, middleware as axum_middleware};
use serde_json::{Value, json};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use error::ApiError;
pub use state::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/matches", get(admin::list_matches).post(admin::create_match))
        .route(
            "/matches/{id}",
            get(admin::get_match)
                .put(admin::update_match)
                .delete(admin::delete_match),
        )
        .route("/users", get(admin::list_users))
        .route(
            "/users/{id}",
            get(admin::get_user)
                .patch(admin::edit_user)
                .delete(admin::delete_user),
        )
        .route("/users/{id}/xp", post(admin::change_xp))
        .route("/users/{id}/premium", post(admin::set_premium))
        .route("/settings", put(admin::update_settings))
        .route(
            "/broadcasts",
            get(admin::list_broadcasts).post(admin::send_broadcast),
        )
        .route(
            "/activities",
            get(admin::list_activities).delete(admin::clear_activities),
        )
        .route("/activities/export", get(admin::export_activities))
        .route("/admins", post(admin::create_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin,
        ))
}

fn viewer_routes() -> Router<AppState> {
    Router::new()
        .route("/settings", get(viewer::get_settings))
        .route("/stats", get(viewer::stats))
        .route("/viewers", post(viewer::create_viewer))
        .route(
            "/viewers/{id}",
            get(viewer::get_viewer).put(viewer::bootstrap_viewer),
        )
        .route("/viewers/{id}/premium", post(viewer::subscribe_premium))
        .route("/viewers/{id}/broadcasts", get(viewer::viewer_broadcasts))
        .route("/matches", get(viewer::list_matches))
        .route("/matches/{id}", get(viewer::open_match))
        .route("/matches/{id}/join", post(viewer::join))
        .route("/matches/{id}/heartbeat", post(viewer::heartbeat))
        .route("/matches/{id}/leave", post(viewer::leave))
        .route("/matches/{id}/presence", get(viewer::presence))
        .route(
            "/matches/{id}/chat",
            get(viewer::chat_history).post(viewer::post_chat),
        )
        .route("/matches/{id}/chat/stream", get(viewer::chat_stream))
        .route("/leaderboard", get(viewer::leaderboard))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let api = viewer_routes().nest("/admin", admin_routes(&state));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors(&state.config.server.allowed_origins))
        .with_state(state)
}
