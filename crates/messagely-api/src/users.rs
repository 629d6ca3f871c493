use axum::{
    Extension, Json,
    extract::{Path, State, rejection::PathRejection},
    response::IntoResponse,
};

use messagely_types::api::{
    Claims, ReceivedMessagesResponse, SentMessagesResponse, UserListResponse, UserProfileResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::ensure_correct_user;
use crate::run_db;

/// Every user's public fields. Admin only; not paginated.
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = run_db(&state, |db| db.all_users()).await?;
    Ok(Json(UserListResponse { users }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(username) = path?;
    ensure_correct_user(&claims, &username)?;

    let user = run_db(&state, move |db| db.get_user(&username)).await?;
    Ok(Json(UserProfileResponse { user }))
}

/// Messages this user sent.
pub async fn messages_from(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(username) = path?;
    ensure_correct_user(&claims, &username)?;

    let messages = run_db(&state, move |db| db.messages_from(&username)).await?;
    Ok(Json(SentMessagesResponse { messages }))
}

/// Messages this user received.
pub async fn messages_to(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(username) = path?;
    ensure_correct_user(&claims, &username)?;

    let messages = run_db(&state, move |db| db.messages_to(&username)).await?;
    Ok(Json(ReceivedMessagesResponse { messages }))
}
