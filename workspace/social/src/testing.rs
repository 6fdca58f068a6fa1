//! Shared fixtures for the core tests.

use migration::{Migrator, MigratorTrait};
use model::entities::{message, user};
use sea_orm::{Database, DatabaseConnection};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::{messages, users};

pub const TEST_PASSWORD: &str = "testuser";

/// Create an in-memory SQLite database with the schema applied
pub async fn setup_db() -> DatabaseConnection {
    setup_db_at("sqlite::memory:").await
}

/// Connect to `url` and apply the schema
pub async fn setup_db_at(url: &str) -> DatabaseConnection {
    init_test_tracing();

    let db = Database::connect(url)
        .await
        .expect("Failed to connect to test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Sign up `username` with `<username>@test.com` and the shared test password
pub async fn create_user(db: &DatabaseConnection, username: &str) -> user::Model {
    users::signup(
        db,
        users::NewUser {
            username: username.to_string(),
            email: format!("{}@test.com", username),
            password: TEST_PASSWORD.to_string(),
            image_url: None,
        },
    )
    .await
    .expect("Failed to sign up test user")
}

pub async fn post(db: &DatabaseConnection, author: &user::Model, text: &str) -> message::Model {
    messages::create(db, author, text)
        .await
        .expect("Failed to create test message")
}

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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_setup_installs_a_subscriber() {
        let _db = setup_db().await;
        assert!(tracing::dispatcher::has_been_set());
    }
}
