use crate::config::{DEFAULT_SESSION_TTL_SECS, session_cache};
use crate::router::create_router;
use crate::schemas::{ApiResponse, AppState};
use axum::http::{HeaderName, HeaderValue, header::AUTHORIZATION};
use axum_test::TestServer;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde_json::{Value, json};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub const TEST_PASSWORD: &str = "testuser";

/// Create an in-memory SQLite database for testing
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Create AppState for testing
pub async fn setup_test_app_state() -> AppState {
    let db = setup_test_db().await;
    AppState {
        db,
        sessions: session_cache(DEFAULT_SESSION_TTL_SECS),
    }
}

/// Initialize tracing for tests, writing through the test harness capture.
///
/// The log level comes from RUST_LOG and defaults to WARN. The subscriber is
/// global, so it is installed once per test binary.
fn init_test_tracing() {
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or(Level::WARN);

    // Only the first call installs; later ones find a subscriber in place
    let _ = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_test_writer()
        .try_init();
}

/// Create a test server over a fresh database
pub async fn setup_test_server() -> TestServer {
    init_test_tracing();

    let state = setup_test_app_state().await;
    TestServer::new(create_router(state)).expect("Failed to create test server")
}

/// `Authorization: Bearer <token>` header pair
pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).expect("Token is a valid header value"),
    )
}

/// A signed-up user as seen by the tests
pub struct TestUser {
    pub id: i64,
    pub token: String,
}

/// Sign up `username` through the API with the shared test password
pub async fn signup(server: &TestServer, username: &str) -> TestUser {
    let response = server
        .post("/api/v1/auth/signup")
        .json(&json!({
            "username": username,
            "email": format!("{}@test.com", username),
            "password": TEST_PASSWORD,
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body: ApiResponse<Value> = response.json();
    TestUser {
        id: body.data["user"]["id"].as_i64().expect("user id"),
        token: body.data["token"].as_str().expect("token").to_string(),
    }
}

/// Post `text` as `user` and return the new message id
pub async fn post_message(server: &TestServer, user: &TestUser, text: &str) -> i64 {
    let (name, value) = bearer(&user.token);
    let response = server
        .post("/api/v1/messages")
        .add_header(name, value)
        .json(&json!({ "text": text }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body: ApiResponse<Value> = response.json();
    body.data["id"].as_i64().expect("message id")
}

/// Make `follower` follow user `followee_id`
pub async fn follow(server: &TestServer, follower: &TestUser, followee_id: i64) {
    let (name, value) = bearer(&follower.token);
    server
        .post(&format!("/api/v1/users/{}/follow", followee_id))
        .add_header(name, value)
        .await
        .assert_status_ok();
}
