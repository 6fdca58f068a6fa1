//! Message Store: creating, reading and deleting short posts.
//!
//! Listings are newest first by timestamp, ties broken by id descending so
//! the order is deterministic.

use std::collections::HashSet;

use chrono::Utc;
use model::entities::{follow, like, message, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Select, Set,
    TransactionTrait,
};
use tracing::{debug, info, instrument, trace, warn};
use validator::Validate;

use crate::error::{Result, SocialError};

// Keeps each id list well under the store's bound-parameter limit.
const ID_CHUNK: usize = 500;

#[derive(Debug, Validate)]
struct NewMessage {
    #[validate(length(
        min = 1,
        max = 140,
        message = "must be between 1 and 140 characters"
    ))]
    text: String,
}

/// Rejects blank text and anything longer than [`message::MAX_TEXT_LENGTH`] characters.
pub fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(SocialError::validation("text", "must not be blank"));
    }
    NewMessage {
        text: text.to_string(),
    }
    .validate()?;
    Ok(())
}

pub(crate) fn newest_first(select: Select<message::Entity>) -> Select<message::Entity> {
    select
        .order_by_desc(message::Column::Timestamp)
        .order_by_desc(message::Column::Id)
}

/// Posts `text` as `author`, stamped with the current time.
#[instrument(skip(db, author), fields(author_id = author.id))]
pub async fn create(db: &DatabaseConnection, author: &user::Model, text: &str) -> Result<message::Model> {
    trace!("Entering create function");
    validate_text(text)?;

    let created = message::ActiveModel {
        text: Set(text.to_string()),
        timestamp: Set(Utc::now()),
        user_id: Set(author.id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Message {} created by user {}", created.id, author.id);
    Ok(created)
}

/// Fetches one message by id.
#[instrument(skip(db))]
pub async fn get<C: ConnectionTrait>(db: &C, message_id: i32) -> Result<message::Model> {
    message::Entity::find_by_id(message_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            warn!("Message with ID {} not found", message_id);
            SocialError::NotFound(format!("Message {}", message_id))
        })
}

/// Fetches one message together with its author.
#[instrument(skip(db))]
pub async fn get_with_author<C: ConnectionTrait>(
    db: &C,
    message_id: i32,
) -> Result<(message::Model, user::Model)> {
    match message::Entity::find_by_id(message_id)
        .find_also_related(user::Entity)
        .one(db)
        .await?
    {
        Some((found, Some(author))) => Ok((found, author)),
        _ => {
            warn!("Message with ID {} not found", message_id);
            Err(SocialError::NotFound(format!("Message {}", message_id)))
        }
    }
}

/// Deletes `message` and the likes it received. Only its author may do this.
#[instrument(skip_all, fields(message_id = message.id, requester_id = requester.id))]
pub async fn delete(
    db: &DatabaseConnection,
    message: &message::Model,
    requester: &user::Model,
) -> Result<()> {
    trace!("Entering delete function");

    if message.user_id != requester.id {
        warn!(
            "User {} tried to delete message {} owned by user {}",
            requester.id, message.id, message.user_id
        );
        return Err(SocialError::Authorization(
            "only the author can delete a message".to_string(),
        ));
    }

    let txn = db.begin().await?;
    let likes = like::Entity::delete_many()
        .filter(like::Column::MessageId.eq(message.id))
        .exec(&txn)
        .await?;
    let deleted = message::Entity::delete_by_id(message.id).exec(&txn).await?;
    if deleted.rows_affected == 0 {
        return Err(SocialError::NotFound(format!("Message {}", message.id)));
    }
    txn.commit().await?;

    info!(
        "Message {} deleted along with {} likes",
        message.id, likes.rows_affected
    );
    Ok(())
}

/// The `limit` newest messages written by any of `user_ids`.
#[instrument(skip(db, user_ids), fields(num_users = user_ids.len()))]
pub async fn recent_by_users<C: ConnectionTrait>(
    db: &C,
    user_ids: &HashSet<i32>,
    limit: u64,
) -> Result<Vec<message::Model>> {
    if user_ids.is_empty() || limit == 0 {
        debug!("Nothing to fetch");
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = user_ids.iter().copied().collect();
    let mut messages = Vec::new();
    for chunk in ids.chunks(ID_CHUNK) {
        let batch = newest_first(
            message::Entity::find().filter(message::Column::UserId.is_in(chunk.iter().copied())),
        )
        .limit(limit)
        .all(db)
        .await?;
        messages.extend(batch);
    }

    if ids.len() > ID_CHUNK {
        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        messages.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    }

    debug!("Fetched {} messages", messages.len());
    Ok(messages)
}

/// The `limit` newest messages written by anyone `follower_id` follows.
#[instrument(skip(db))]
pub async fn recent_by_followed<C: ConnectionTrait>(
    db: &C,
    follower_id: i32,
    limit: u64,
) -> Result<Vec<message::Model>> {
    let followed = follow::Entity::find()
        .select_only()
        .column(follow::Column::UserBeingFollowedId)
        .filter(follow::Column::UserFollowingId.eq(follower_id))
        .into_query();

    let messages = newest_first(
        message::Entity::find().filter(message::Column::UserId.in_subquery(followed)),
    )
    .limit(limit)
    .all(db)
    .await?;

    debug!("Fetched {} messages from followed users", messages.len());
    Ok(messages)
}

/// The `limit` newest messages written by `user_id`.
#[instrument(skip(db))]
pub async fn list_by_user<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    limit: u64,
) -> Result<Vec<message::Model>> {
    let messages = newest_first(message::Entity::find().filter(message::Column::UserId.eq(user_id)))
        .limit(limit)
        .all(db)
        .await?;

    debug!("User {} has {} messages in range", user_id, messages.len());
    Ok(messages)
}

/// How many messages `user_id` has written in total.
pub async fn count_by_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<u64> {
    Ok(message::Entity::find()
        .filter(message::Column::UserId.eq(user_id))
        .count(db)
        .await?)
}
