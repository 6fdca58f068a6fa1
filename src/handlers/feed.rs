use crate::handlers::messages::MessageResponse;
use crate::handlers::users::UserResponse;
use crate::schemas::{ApiError, ApiResponse, AppState, ErrorResponse, error_response};
use crate::session::MaybeUser;
use axum::{
    extract::{Query, State},
    response::Json,
};
use axum_valid::Valid;
use serde::{Deserialize, Serialize};
use social::feed::{self, DEFAULT_FEED_LIMIT, FeedItem};
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Query parameters for the home feed
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct FeedQuery {
    /// Number of messages, 1 to 100 (default 100)
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
}

/// One feed entry
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeedItemResponse {
    pub message: MessageResponse,
    pub author: UserResponse,
    pub liked_by_viewer: bool,
}

impl From<FeedItem> for FeedItemResponse {
    fn from(item: FeedItem) -> Self {
        Self {
            message: item.message.into(),
            author: item.author.into(),
            liked_by_viewer: item.liked_by_viewer,
        }
    }
}

/// Home feed of the signed-in user
///
/// Anonymous callers get `data: null` rather than an error.
#[utoipa::path(
    get,
    path = "/api/v1/feed",
    tag = "feed",
    params(FeedQuery),
    responses(
        (status = 200, description = "Feed retrieved successfully", body = ApiResponse<Option<Vec<FeedItemResponse>>>),
        (status = 400, description = "Invalid limit", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(viewer_id = ?viewer.as_ref().map(|v| v.id), limit = ?query.limit))]
pub async fn home_feed(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Valid(Query(query)): Valid<Query<FeedQuery>>,
) -> Result<Json<ApiResponse<Option<Vec<FeedItemResponse>>>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_FEED_LIMIT);

    let items = feed::build_home_feed(&state.db, viewer.as_ref(), limit)
        .await
        .map_err(error_response)?;

    match items {
        Some(items) => {
            debug!("Feed has {} items", items.len());
            Ok(ApiResponse::ok(
                Some(items.into_iter().map(FeedItemResponse::from).collect()),
                "Feed retrieved successfully",
            ))
        }
        None => Ok(ApiResponse::ok(None, "Sign in to see your feed")),
    }
}
