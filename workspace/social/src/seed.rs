//! Bulk loading of flat record sets, used to seed a fresh database.
//!
//! Records keep their identifiers so messages and follows can point at the
//! users loaded alongside them. Everything is written in one transaction in
//! dependency order: users, then messages, then follows.

use chrono::{DateTime, Utc};
use model::entities::{follow, message, user};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityName, EntityTrait,
    IntoActiveModel, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{debug, info, instrument, trace};
use validator::Validate;

use crate::credentials;
use crate::error::{Result, SocialError};
use crate::messages::validate_text;
use crate::users::NewUser;

// Keeps each INSERT well under SQLite's bound-parameter limit.
const BATCH_SIZE: usize = 500;

#[derive(Clone, Deserialize)]
pub struct UserRecord {
    pub id: i32,
    pub email: String,
    pub username: String,
    /// Plaintext; hashed before it is stored.
    pub password: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub header_image_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MessageRecord {
    pub id: i32,
    pub text: String,
    /// Defaults to the load time.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub user_id: i32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FollowRecord {
    pub user_being_followed_id: i32,
    pub user_following_id: i32,
}

/// One record set per table.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
    #[serde(default)]
    pub follows: Vec<FollowRecord>,
}

/// Row counts written by [`bulk_load`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub messages: usize,
    pub follows: usize,
}

async fn insert_batched<C, E, A>(db: &C, rows: Vec<A>) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait<ActiveModel = A>,
    A: ActiveModelTrait<Entity = E>,
    E::Model: IntoActiveModel<A>,
{
    let mut rows = rows.into_iter().peekable();
    while rows.peek().is_some() {
        let batch: Vec<A> = rows.by_ref().take(BATCH_SIZE).collect();
        trace!("Inserting batch of {} rows", batch.len());
        E::insert_many(batch)
            .exec_without_returning(db)
            .await
            .map_err(|e| SocialError::from_insert(e, "seed record"))?;
    }
    Ok(())
}

// PostgreSQL serial sequences do not see explicit ids, so move them past the
// loaded rows; otherwise the next signup would collide with a seeded user.
async fn advance_sequences<C: ConnectionTrait>(db: &C) -> Result<()> {
    if db.get_database_backend() != DbBackend::Postgres {
        return Ok(());
    }

    for table in [user::Entity.table_name(), message::Entity.table_name()] {
        debug!("Advancing id sequence of {}", table);
        db.execute_unprepared(&format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
             COALESCE((SELECT MAX(id) FROM {table}), 0) + 1, false)"
        ))
        .await?;
    }
    Ok(())
}

/// Loads `data` in one transaction; nothing is written if any record fails.
#[instrument(skip_all, fields(users = data.users.len(), messages = data.messages.len(), follows = data.follows.len()))]
pub async fn bulk_load(db: &DatabaseConnection, data: SeedData) -> Result<SeedSummary> {
    trace!("Entering bulk_load function");

    let summary = SeedSummary {
        users: data.users.len(),
        messages: data.messages.len(),
        follows: data.follows.len(),
    };

    // Hash up front so the transaction is not held open during the slow part
    let mut users = Vec::with_capacity(data.users.len());
    for record in data.users {
        let new_user = NewUser {
            username: record.username,
            email: record.email,
            password: record.password,
            image_url: record.image_url,
        };
        new_user.validate()?;

        let password = credentials::hash(&new_user.password)?;
        users.push(user::ActiveModel {
            id: Set(record.id),
            email: Set(new_user.email),
            username: Set(new_user.username),
            password: Set(password),
            image_url: Set(new_user
                .image_url
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| user::DEFAULT_IMAGE_URL.to_string())),
            header_image_url: Set(record
                .header_image_url
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| user::DEFAULT_HEADER_IMAGE_URL.to_string())),
            bio: Set(record.bio),
            location: Set(record.location),
        });
    }
    debug!("Hashed {} passwords", users.len());

    let loaded_at = Utc::now();
    let mut messages = Vec::with_capacity(data.messages.len());
    for record in data.messages {
        validate_text(&record.text)?;
        messages.push(message::ActiveModel {
            id: Set(record.id),
            text: Set(record.text),
            timestamp: Set(record.timestamp.unwrap_or(loaded_at)),
            user_id: Set(record.user_id),
        });
    }

    let follows: Vec<follow::ActiveModel> = data
        .follows
        .into_iter()
        .map(|record| follow::ActiveModel {
            user_being_followed_id: Set(record.user_being_followed_id),
            user_following_id: Set(record.user_following_id),
        })
        .collect();

    let txn = db.begin().await?;
    insert_batched(&txn, users).await?;
    insert_batched(&txn, messages).await?;
    insert_batched(&txn, follows).await?;
    advance_sequences(&txn).await?;
    txn.commit().await?;

    info!(
        "Seeded {} users, {} messages and {} follows",
        summary.users, summary.messages, summary.follows
    );
    Ok(summary)
}
