use axum::{http::StatusCode, response::Json};
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use social::SocialError;
use tracing::error;
use utoipa::{
    Modify, OpenApi, ToSchema,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::handlers::{
    auth::{AuthResponse, LoginRequest, SignupRequest},
    feed::{FeedItemResponse, FeedQuery},
    follows::FollowResponse,
    messages::{CreateMessageRequest, LikeResponse, MessageDetailResponse, MessageResponse},
    users::{ProfileResponse, SearchQuery, UpdateProfileRequest, UserResponse},
};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Live sessions, token to user id
    pub sessions: Cache<String, i32>,
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: &str) -> Json<Self> {
        Json(Self {
            data,
            message: message.to_string(),
            success: true,
        })
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
            success: false,
        }),
    )
}

/// Rejection for requests that need a signed-in user and have none.
pub fn unauthenticated() -> ApiError {
    api_error(
        StatusCode::UNAUTHORIZED,
        "ACCESS_UNAUTHORIZED",
        "Access unauthorized.",
    )
}

/// Maps a core error onto its HTTP status and stable error code.
pub fn error_response(err: SocialError) -> ApiError {
    match err {
        SocialError::Validation { field, reason } => api_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            format!("Invalid {}: {}", field, reason),
        ),
        SocialError::Uniqueness(_) => api_error(
            StatusCode::CONFLICT,
            "USERNAME_ALREADY_TAKEN",
            "Username already taken",
        ),
        SocialError::AuthFailure => api_error(
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            "Invalid credentials.",
        ),
        SocialError::Authorization(_) => api_error(
            StatusCode::FORBIDDEN,
            "ACCESS_UNAUTHORIZED",
            "Access unauthorized.",
        ),
        SocialError::NotFound(what) => {
            api_error(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{} not found", what))
        }
        err @ SocialError::Hashing(_) => {
            error!("Internal error: {}", err);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
            )
        }
        err @ SocialError::Database(_) => {
            error!("Internal error: {}", err);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Internal server error",
            )
        }
    }
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::signup,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::users::search_users,
        crate::handlers::users::get_profile,
        crate::handlers::users::list_following,
        crate::handlers::users::list_followers,
        crate::handlers::users::list_likes,
        crate::handlers::users::update_profile,
        crate::handlers::users::delete_account,
        crate::handlers::follows::follow_user,
        crate::handlers::follows::unfollow_user,
        crate::handlers::messages::create_message,
        crate::handlers::messages::get_message,
        crate::handlers::messages::delete_message,
        crate::handlers::messages::toggle_like,
        crate::handlers::feed::home_feed,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            SignupRequest,
            LoginRequest,
            AuthResponse,
            UserResponse,
            ProfileResponse,
            UpdateProfileRequest,
            SearchQuery,
            FollowResponse,
            CreateMessageRequest,
            MessageResponse,
            MessageDetailResponse,
            LikeResponse,
            FeedItemResponse,
            FeedQuery,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Signup, login and logout"),
        (name = "users", description = "Profiles, search and account management"),
        (name = "follows", description = "Following and unfollowing users"),
        (name = "messages", description = "Posting, reading and liking messages"),
        (name = "feed", description = "Home feed of followed users"),
    ),
    info(
        title = "Warbler API",
        description = "Warbler - a small social network of short messages, follows and likes",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DbErr;

    #[test]
    fn test_internal_errors_have_distinct_codes() {
        let (status, Json(body)) = error_response(SocialError::Hashing("bad params".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "INTERNAL_ERROR");
        assert!(!body.error.contains("bad params"));

        let (status, Json(body)) =
            error_response(SocialError::Database(DbErr::Custom("boom".to_string())));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "DATABASE_ERROR");
    }

    #[test]
    fn test_client_errors_map_to_their_codes() {
        let (status, Json(body)) = error_response(SocialError::validation("username", "must not be blank"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "VALIDATION_ERROR");
        assert_eq!(body.error, "Invalid username: must not be blank");

        let (status, Json(body)) = error_response(SocialError::AuthFailure);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.code, "INVALID_CREDENTIALS");
    }
}
