use crate::handlers::messages::MessageResponse;
use crate::schemas::{ApiError, ApiResponse, AppState, ErrorResponse, error_response};
use crate::session::{self, CurrentUser, MaybeUser};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use axum_valid::Valid;
use model::entities::user;
use serde::{Deserialize, Serialize};
use social::users::ProfileUpdate;
use social::{graph, likes, messages, users};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// How many messages a profile shows.
const PROFILE_MESSAGE_LIMIT: u64 = 100;

/// Public view of a user; never carries the email or password hash
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            image_url: model.image_url,
            header_image_url: model.header_image_url,
            bio: model.bio,
            location: model.location,
        }
    }
}

/// Query parameters for user search
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Substring of the username; every user is listed when omitted
    #[validate(length(max = 50))]
    pub q: Option<String>,
}

/// A profile page: the user, their newest messages and the counters
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub user: UserResponse,
    /// Up to 100 newest messages
    pub messages: Vec<MessageResponse>,
    pub message_count: u64,
    pub following_count: u64,
    pub followers_count: u64,
    pub likes_count: u64,
    /// Whether the viewer follows this user; absent for anonymous viewers
    pub is_following: Option<bool>,
    /// Whether this user follows the viewer; absent for anonymous viewers
    pub is_followed_by: Option<bool>,
}

/// Request body for editing the caller's own profile
#[derive(Deserialize, Serialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    /// An empty string resets to the default picture
    pub image_url: Option<String>,
    /// An empty string resets to the default header image
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    /// Current password, required to confirm the change
    pub password: String,
}

/// Search users by username
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(SearchQuery),
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Vec<UserResponse>>),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(q = ?query.q))]
pub async fn search_users(
    State(state): State<AppState>,
    Valid(Query(query)): Valid<Query<SearchQuery>>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    trace!("Entering search_users function");

    let found = users::search(&state.db, query.q.as_deref())
        .await
        .map_err(error_response)?;

    debug!("Search returned {} users", found.len());
    Ok(ApiResponse::ok(
        found.into_iter().map(UserResponse::from).collect(),
        "Users retrieved successfully",
    ))
}

/// Show a user's profile
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<ProfileResponse>),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, viewer))]
pub async fn get_profile(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
) -> Result<Json<ApiResponse<ProfileResponse>>, ApiError> {
    trace!("Entering get_profile function for user_id: {}", user_id);

    let db = &state.db;
    let profile_user = users::get(db, user_id).await.map_err(error_response)?;

    let recent = messages::list_by_user(db, user_id, PROFILE_MESSAGE_LIMIT)
        .await
        .map_err(error_response)?;
    let message_count = messages::count_by_user(db, user_id)
        .await
        .map_err(error_response)?;
    let (followers_count, following_count) =
        graph::counts(db, user_id).await.map_err(error_response)?;
    let likes_count = likes::count_for_user(db, user_id)
        .await
        .map_err(error_response)?;

    let (is_following, is_followed_by) = match &viewer {
        Some(viewer) => (
            Some(
                graph::is_following(db, viewer, &profile_user)
                    .await
                    .map_err(error_response)?,
            ),
            Some(
                graph::is_followed_by(db, viewer, &profile_user)
                    .await
                    .map_err(error_response)?,
            ),
        ),
        None => (None, None),
    };

    debug!(
        "Profile of user {} has {} messages, {} followers, {} following",
        user_id, message_count, followers_count, following_count
    );

    Ok(ApiResponse::ok(
        ProfileResponse {
            user: profile_user.into(),
            messages: recent.into_iter().map(MessageResponse::from).collect(),
            message_count,
            following_count,
            followers_count,
            likes_count,
            is_following,
            is_followed_by,
        },
        "User retrieved successfully",
    ))
}

/// List the users someone follows
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/following",
    tag = "users",
    security(("bearer" = [])),
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Following retrieved successfully", body = ApiResponse<Vec<UserResponse>>),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, _viewer))]
pub async fn list_following(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    _viewer: CurrentUser,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    let target = users::get(&state.db, user_id).await.map_err(error_response)?;
    let following = graph::list_following(&state.db, &target)
        .await
        .map_err(error_response)?;

    Ok(ApiResponse::ok(
        following.into_iter().map(UserResponse::from).collect(),
        "Following retrieved successfully",
    ))
}

/// List the followers of someone
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/followers",
    tag = "users",
    security(("bearer" = [])),
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Followers retrieved successfully", body = ApiResponse<Vec<UserResponse>>),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, _viewer))]
pub async fn list_followers(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    _viewer: CurrentUser,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    let target = users::get(&state.db, user_id).await.map_err(error_response)?;
    let followers = graph::list_followers(&state.db, &target)
        .await
        .map_err(error_response)?;

    Ok(ApiResponse::ok(
        followers.into_iter().map(UserResponse::from).collect(),
        "Followers retrieved successfully",
    ))
}

/// List the messages someone likes
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/likes",
    tag = "users",
    security(("bearer" = [])),
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Liked messages retrieved successfully", body = ApiResponse<Vec<MessageResponse>>),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, _viewer))]
pub async fn list_likes(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    _viewer: CurrentUser,
) -> Result<Json<ApiResponse<Vec<MessageResponse>>>, ApiError> {
    let target = users::get(&state.db, user_id).await.map_err(error_response)?;
    let liked = likes::liked_messages(&state.db, target.id)
        .await
        .map_err(error_response)?;

    Ok(ApiResponse::ok(
        liked.into_iter().map(MessageResponse::from).collect(),
        "Liked messages retrieved successfully",
    ))
}

/// Edit the caller's own profile
#[utoipa::path(
    put,
    path = "/api/v1/profile",
    tag = "users",
    security(("bearer" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "User updated successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not signed in or wrong password", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    trace!("Entering update_profile function");

    let update = ProfileUpdate {
        username: request.username,
        email: request.email,
        image_url: request.image_url,
        header_image_url: request.header_image_url,
        bio: request.bio,
        location: request.location,
    };
    let updated = users::update_profile(&state.db, &user, update, &request.password)
        .await
        .map_err(error_response)?;

    Ok(ApiResponse::ok(updated.into(), "User updated successfully"))
}

/// Delete the caller's account and everything it owns
#[utoipa::path(
    delete,
    path = "/api/v1/profile",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User deleted successfully", body = ApiResponse<String>),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn delete_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    trace!("Entering delete_account function");

    users::delete(&state.db, &user, user.id)
        .await
        .map_err(error_response)?;
    session::revoke_all(&state, user.id).await;

    info!("User {} deleted their account", user.id);
    Ok(ApiResponse::ok(
        format!("User {} deleted", user.id),
        "User deleted successfully",
    ))
}
