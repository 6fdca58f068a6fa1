use crate::handlers::{
    auth::{login, logout, signup},
    feed::home_feed,
    follows::{follow_user, unfollow_user},
    health::health_check,
    messages::{create_message, delete_message, get_message, toggle_like},
    users::{
        delete_account, get_profile, list_followers, list_following, list_likes, search_users,
        update_profile,
    },
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Sessions
        .route("/api/v1/auth/signup", post(signup))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/logout", post(logout))
        // Users and the follow graph
        .route("/api/v1/users", get(search_users))
        .route("/api/v1/users/:user_id", get(get_profile))
        .route("/api/v1/users/:user_id/following", get(list_following))
        .route("/api/v1/users/:user_id/followers", get(list_followers))
        .route("/api/v1/users/:user_id/likes", get(list_likes))
        .route(
            "/api/v1/users/:user_id/follow",
            post(follow_user).delete(unfollow_user),
        )
        // The caller's own account
        .route("/api/v1/profile", put(update_profile).delete(delete_account))
        // Messages and likes
        .route("/api/v1/messages", post(create_message))
        .route(
            "/api/v1/messages/:message_id",
            get(get_message).delete(delete_message),
        )
        .route("/api/v1/messages/:message_id/like", post(toggle_like))
        // Home feed
        .route("/api/v1/feed", get(home_feed))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
