use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection, rejection::PathRejection},
    http::StatusCode,
    response::IntoResponse,
};

use messagely_types::api::{Claims, CreateMessageRequest, MessageDetailResponse, NewMessageResponse, ReadReceiptResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_db;

/// Detail of one message. Only its sender or recipient may see it.
pub async fn get_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;

    let message = run_db(&state, move |db| db.get_message(id)).await?;

    if claims.username != message.from_user.username && claims.username != message.to_user.username {
        return Err(ApiError::Forbidden(
            "Only the sender or recipient may view this message".into(),
        ));
    }

    Ok(Json(MessageDetailResponse { message }))
}

/// The sender is always the logged-in user.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let message = run_db(&state, move |db| {
        db.create_message(&claims.username, &req.to_username, &req.body)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(NewMessageResponse { message })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;

    // Recipients never change, so checking before the update is race-free
    let (_, recipient) = run_db(&state, move |db| db.message_participants(id)).await?;
    if recipient != claims.username {
        return Err(ApiError::Forbidden(
            "Only the recipient may mark this message as read".into(),
        ));
    }

    let receipt = run_db(&state, move |db| db.mark_read(id)).await?;

    Ok(Json(ReadReceiptResponse { message: receipt }))
}
