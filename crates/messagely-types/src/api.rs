use serde::{Deserialize, Serialize};

use crate::models::{MessageDetail, NewMessage, ReadReceipt, ReceivedMessage, SentMessage, UserProfile, UserSummary};

// -- JWT Claims --

/// Session token claims. The username is the identity; `admin` is decided
/// when the token is issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    #[serde(default)]
    pub admin: bool,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMessageRequest {
    pub to_username: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct MessageDetailResponse {
    pub message: MessageDetail,
}

#[derive(Debug, Serialize)]
pub struct NewMessageResponse {
    pub message: NewMessage,
}

#[derive(Debug, Serialize)]
pub struct ReadReceiptResponse {
    pub message: ReadReceipt,
}

// -- Users --

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct UserProfileResponse {
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct SentMessagesResponse {
    pub messages: Vec<SentMessage>,
}

#[derive(Debug, Serialize)]
pub struct ReceivedMessagesResponse {
    pub messages: Vec<ReceivedMessage>,
}

// -- Errors --

/// Body of every failed response: `{"error": {"message": ..., "status": ...}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub status: u16,
}
