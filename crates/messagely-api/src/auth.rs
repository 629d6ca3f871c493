use std::collections::HashSet;
use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use messagely_db::{Database, NewUser};
use messagely_types::api::{Claims, LoginRequest, RegisterRequest, TokenResponse};

use crate::error::ApiError;
use crate::run_db;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    /// Usernames whose tokens carry the admin flag.
    pub admins: HashSet<String>,
}

/// Register a user, stamp their first login and hand back a session token.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let username = run_db(&state, move |db| {
        let profile = db.register(&NewUser {
            username: &req.username,
            password: &req.password,
            first_name: &req.first_name,
            last_name: &req.last_name,
            phone: &req.phone,
        })?;
        db.update_login_timestamp(&profile.username)?;
        Ok(profile.username)
    })
    .await?;

    let token = create_token(&state, &username)?;

    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let username = req.username.clone();

    let authenticated = run_db(&state, move |db| {
        if !db.authenticate(&req.username, &req.password)? {
            return Ok(false);
        }
        db.update_login_timestamp(&req.username)?;
        Ok(true)
    })
    .await?;

    if !authenticated {
        info!(username = %username, "Rejected login");
        return Err(ApiError::Unauthorized("Invalid username or password".into()));
    }

    let token = create_token(&state, &username)?;

    Ok(Json(TokenResponse { token }))
}

pub(crate) fn create_token(state: &AppStateInner, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        username: username.to_string(),
        admin: state.admins.contains(username),
        exp: (chrono::Utc::now() + state.token_ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )?;

    Ok(token)
}
