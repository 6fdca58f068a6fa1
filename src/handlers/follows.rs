use crate::schemas::{ApiError, ApiResponse, AppState, ErrorResponse, error_response};
use crate::session::CurrentUser;
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use social::{graph, users};
use tracing::{instrument, trace};
use utoipa::ToSchema;

/// Follow state between the caller and another user after a change
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FollowResponse {
    pub user_id: i32,
    pub following: bool,
}

/// Start following a user
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/follow",
    tag = "follows",
    security(("bearer" = [])),
    params(
        ("user_id" = i32, Path, description = "User to follow"),
    ),
    responses(
        (status = 200, description = "Now following", body = ApiResponse<FollowResponse>),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, follower), fields(follower_id = follower.id))]
pub async fn follow_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(follower): CurrentUser,
) -> Result<Json<ApiResponse<FollowResponse>>, ApiError> {
    trace!("Entering follow_user function");

    let followee = users::get(&state.db, user_id).await.map_err(error_response)?;
    graph::follow(&state.db, &follower, &followee)
        .await
        .map_err(error_response)?;

    Ok(ApiResponse::ok(
        FollowResponse {
            user_id: followee.id,
            following: true,
        },
        "Followed successfully",
    ))
}

/// Stop following a user
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}/follow",
    tag = "follows",
    security(("bearer" = [])),
    params(
        ("user_id" = i32, Path, description = "User to unfollow"),
    ),
    responses(
        (status = 200, description = "No longer following", body = ApiResponse<FollowResponse>),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, follower), fields(follower_id = follower.id))]
pub async fn unfollow_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(follower): CurrentUser,
) -> Result<Json<ApiResponse<FollowResponse>>, ApiError> {
    trace!("Entering unfollow_user function");

    let followee = users::get(&state.db, user_id).await.map_err(error_response)?;
    graph::unfollow(&state.db, &follower, &followee)
        .await
        .map_err(error_response)?;

    Ok(ApiResponse::ok(
        FollowResponse {
            user_id: followee.id,
            following: false,
        },
        "Unfollowed successfully",
    ))
}
