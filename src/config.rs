use anyhow::Result;
use moka::future::Cache;
use sea_orm::Database;
use std::time::Duration;
use tracing::{debug, info};

use crate::schemas::AppState;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://warbler.db?mode=rwc";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;

const MAX_SESSIONS: u64 = 100_000;

/// Session store whose entries expire `ttl_secs` after login.
pub fn session_cache(ttl_secs: u64) -> Cache<String, i32> {
    Cache::builder()
        .max_capacity(MAX_SESSIONS)
        .time_to_live(Duration::from_secs(ttl_secs))
        .build()
}

/// Connect to `database_url` and build the shared application state
pub async fn initialize_app_state_with_url(database_url: &str, session_ttl_secs: u64) -> Result<AppState> {
    info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    debug!("Sessions expire after {} seconds", session_ttl_secs);
    let sessions = session_cache(session_ttl_secs);

    Ok(AppState { db, sessions })
}
