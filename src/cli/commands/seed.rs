use anyhow::{Context, Result};
use sea_orm::Database;
use social::seed::{SeedData, bulk_load};
use tracing::{debug, error, info, trace};

pub async fn seed(json_path: &str, database_url: &str) -> Result<()> {
    trace!("Entering seed function");
    info!("Seeding database from {}", json_path);
    debug!("Database URL: {}", database_url);

    let raw = tokio::fs::read_to_string(json_path)
        .await
        .with_context(|| format!("Failed to read seed file {}", json_path))?;
    let data: SeedData = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse seed file {}", json_path))?;
    debug!(
        "Parsed {} users, {} messages and {} follows",
        data.users.len(),
        data.messages.len(),
        data.follows.len()
    );

    let db = Database::connect(database_url).await?;

    match bulk_load(&db, data).await {
        Ok(summary) => {
            info!(
                "Seed completed: {} users, {} messages, {} follows",
                summary.users, summary.messages, summary.follows
            );
            Ok(())
        }
        Err(e) => {
            error!("Seed failed, nothing was written: {}", e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;
    use social::users;

    #[tokio::test]
    async fn test_demo_seed_file_loads() {
        let data: SeedData = serde_json::from_str(include_str!("../../../demos/seed.json")).unwrap();
        let db = setup_test_db().await;

        let summary = bulk_load(&db, data).await.unwrap();
        assert_eq!(summary.users, 3);
        assert_eq!(summary.messages, 4);
        assert_eq!(summary.follows, 4);

        let alice = users::authenticate(&db, "alice", "password1").await.unwrap();
        assert_eq!(alice.location.as_deref(), Some("Lisbon"));
    }

    #[tokio::test]
    async fn test_missing_seed_file_is_an_error() {
        let err = seed("does/not/exist.json", "sqlite::memory:").await.unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
