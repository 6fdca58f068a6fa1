use crate::handlers::users::UserResponse;
use crate::schemas::{ApiError, ApiResponse, AppState, ErrorResponse, error_response};
use crate::session::CurrentUser;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use model::entities::message;
use serde::{Deserialize, Serialize};
use social::likes::{self, LikeState};
use social::messages;
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;

/// Request body for posting a message
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateMessageRequest {
    /// 1 to 140 characters
    pub text: String,
}

/// Message response model
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: i32,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i32,
}

impl From<message::Model> for MessageResponse {
    fn from(model: message::Model) -> Self {
        Self {
            id: model.id,
            text: model.text,
            timestamp: model.timestamp,
            user_id: model.user_id,
        }
    }
}

/// A message together with its author
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageDetailResponse {
    pub message: MessageResponse,
    pub author: UserResponse,
}

/// Like state after a toggle
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LikeResponse {
    pub message_id: i32,
    pub liked: bool,
}

/// Post a new message
#[utoipa::path(
    post,
    path = "/api/v1/messages",
    tag = "messages",
    security(("bearer" = [])),
    request_body = CreateMessageRequest,
    responses(
        (status = 201, description = "Message created successfully", body = ApiResponse<MessageResponse>),
        (status = 400, description = "Invalid text", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(author_id = author.id))]
pub async fn create_message(
    State(state): State<AppState>,
    CurrentUser(author): CurrentUser,
    Json(request): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MessageResponse>>), ApiError> {
    trace!("Entering create_message function");

    let created = messages::create(&state.db, &author, &request.text)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(created.into(), "Message created successfully"),
    ))
}

/// Show one message with its author
#[utoipa::path(
    get,
    path = "/api/v1/messages/{message_id}",
    tag = "messages",
    params(
        ("message_id" = i32, Path, description = "Message ID"),
    ),
    responses(
        (status = 200, description = "Message retrieved successfully", body = ApiResponse<MessageDetailResponse>),
        (status = 404, description = "Message not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_message(
    Path(message_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<MessageDetailResponse>>, ApiError> {
    let (found, author) = messages::get_with_author(&state.db, message_id)
        .await
        .map_err(error_response)?;

    debug!("Message {} written by user {}", found.id, author.id);
    Ok(ApiResponse::ok(
        MessageDetailResponse {
            message: found.into(),
            author: author.into(),
        },
        "Message retrieved successfully",
    ))
}

/// Delete one of the caller's messages
#[utoipa::path(
    delete,
    path = "/api/v1/messages/{message_id}",
    tag = "messages",
    security(("bearer" = [])),
    params(
        ("message_id" = i32, Path, description = "Message ID"),
    ),
    responses(
        (status = 200, description = "Message deleted successfully", body = ApiResponse<String>),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Message not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, requester), fields(requester_id = requester.id))]
pub async fn delete_message(
    Path(message_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    trace!("Entering delete_message function");

    let found = messages::get(&state.db, message_id)
        .await
        .map_err(error_response)?;
    messages::delete(&state.db, &found, &requester)
        .await
        .map_err(error_response)?;

    Ok(ApiResponse::ok(
        format!("Message {} deleted", message_id),
        "Message deleted successfully",
    ))
}

/// Like a message, or unlike it if already liked
#[utoipa::path(
    post,
    path = "/api/v1/messages/{message_id}/like",
    tag = "messages",
    security(("bearer" = [])),
    params(
        ("message_id" = i32, Path, description = "Message ID"),
    ),
    responses(
        (status = 200, description = "Like toggled", body = ApiResponse<LikeResponse>),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "Message not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn toggle_like(
    Path(message_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<LikeResponse>>, ApiError> {
    let found = messages::get(&state.db, message_id)
        .await
        .map_err(error_response)?;
    let outcome = likes::toggle_like(&state.db, &user, &found)
        .await
        .map_err(error_response)?;

    info!("Like on message {} is now {:?}", message_id, outcome);
    let (liked, message) = match outcome {
        LikeState::Liked => (true, "Message liked"),
        LikeState::Unliked => (false, "Message unliked"),
    };
    Ok(ApiResponse::ok(LikeResponse { message_id, liked }, message))
}
