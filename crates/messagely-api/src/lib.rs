pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod users;

use std::time::Duration;

use axum::{
    Json, Router,
    http::{StatusCode, header},
    middleware::{from_fn, from_fn_with_state, map_response},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::timeout::TimeoutLayer;
use tracing::error;

use messagely_db::Database;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::{ensure_admin, ensure_logged_in};

/// All routes, without transport layers (CORS, tracing, timeouts).
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health))
        .method_not_allowed_fallback(method_not_allowed);

    let protected_routes = Router::new()
        .route("/users", get(users::list_users).route_layer(from_fn(ensure_admin)))
        .route("/users/{username}", get(users::get_user))
        .route("/users/{username}/from", get(users::messages_from))
        .route("/users/{username}/to", get(users::messages_to))
        .route("/messages", post(messages::send_message))
        .route("/messages/{id}", get(messages::get_message))
        .route("/messages/{id}/read", get(messages::mark_read))
        .method_not_allowed_fallback(method_not_allowed)
        .route_layer(from_fn_with_state(state.clone(), ensure_logged_in));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .with_state(state)
}

/// Bound every request by `timeout`. Timed-out requests get the usual JSON
/// error body.
pub fn with_request_timeout(router: Router, timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(map_response(render_timeout))
}

async fn render_timeout(response: Response) -> Response {
    // TimeoutLayer answers with a bare status and no body
    if response.status() == StatusCode::REQUEST_TIMEOUT && !response.headers().contains_key(header::CONTENT_TYPE) {
        ApiError::Timeout("Request timed out".into()).into_response()
    } else {
        response
    }
}

/// Run a blocking data-access call off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> messagely_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("blocking task failed: {e}")
        })?;

    Ok(result?)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("No such route".into())
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed("Method not allowed".into())
}
