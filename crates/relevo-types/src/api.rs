use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DayPeriod, MessageKind, Party};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub name: String,
    pub role: Party,
    pub token: String,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub name: String,
    pub username: String,
    pub password: String,
    pub role: Party,
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user_id: Uuid,
}

// -- Conversations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveConversationRequest {
    pub user_id: Uuid,
}

// -- Messages --

/// Inline media payload: bytes travel base64-encoded in the JSON body, the
/// same shape the mobile client already sends. A missing content type falls
/// back to the one the message kind implies.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaPayload {
    pub data: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub body: Option<String>,
    pub kind: MessageKind,
    pub reply_to_id: Option<i64>,
    pub task_id: Option<i64>,
    pub media: Option<MediaPayload>,
}

// -- Attendance --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeRecordRequest {
    pub user_id: Uuid,
    pub date: String,
    pub period: DayPeriod,
    pub time: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskCompletionRequest {
    pub user_id: Uuid,
    pub task_id: i64,
    pub date: String,
    pub completed: bool,
}

// -- Tasks --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTaskRequest {
    pub name: String,
    pub period: Option<String>,
    pub deadline: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub period: Option<String>,
    pub deadline: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvidenceUploadRequest {
    pub user_id: Uuid,
    pub observation: Option<String>,
    pub media: MediaPayload,
}

#[derive(Debug, Serialize)]
pub struct EvidenceUploadResponse {
    pub id: i64,
    pub image_url: String,
}

// -- Admin cleanup --

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CleanupRequest {
    /// Override for the operational-records window, in days.
    pub days_to_keep: Option<i64>,
}
