use crate::handlers::users::UserResponse;
use crate::schemas::{ApiError, ApiResponse, AppState, ErrorResponse, error_response};
use crate::session::{self, CurrentUser};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::{Deserialize, Serialize};
use social::users::{self, NewUser};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;

/// Request body for signing up
#[derive(Deserialize, Serialize, ToSchema)]
pub struct SignupRequest {
    /// Username (must be unique, at most 50 characters)
    pub username: String,
    /// Email address (must be unique)
    pub email: String,
    /// Password, at least 6 characters
    pub password: String,
    /// Profile image URL; the default picture is used when omitted
    pub image_url: Option<String>,
}

/// Request body for logging in
#[derive(Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// A fresh session for the signed-in user
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    /// Bearer token for the `Authorization` header
    pub token: String,
    pub user: UserResponse,
}

/// Create an account and sign in
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(username = %request.username))]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ApiError> {
    trace!("Entering signup handler");

    let new_user = NewUser {
        username: request.username,
        email: request.email,
        password: request.password,
        image_url: request.image_url,
    };
    let created = users::signup(&state.db, new_user)
        .await
        .map_err(error_response)?;

    let token = session::issue(&state, created.id).await;
    info!("User {} signed up", created.id);

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(
            AuthResponse {
                token,
                user: created.into(),
            },
            "User created successfully",
        ),
    ))
}

/// Sign in with username and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(username = %request.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    trace!("Entering login handler");

    let found = users::authenticate(&state.db, &request.username, &request.password)
        .await
        .map_err(error_response)?;

    let token = session::issue(&state, found.id).await;
    debug!("User {} logged in", found.id);

    let message = format!("Hello, {}!", found.username);
    Ok(ApiResponse::ok(
        AuthResponse {
            token,
            user: found.into(),
        },
        &message,
    ))
}

/// End the current session
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<String>),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    match session::bearer_token(&headers) {
        Some(token) => session::revoke(&state, token).await,
        None => warn!("Logout without a bearer token"),
    }

    info!("User {} logged out", user.id);
    Ok(ApiResponse::ok(
        format!("User {} logged out", user.id),
        "You have successfully logged out.",
    ))
}
