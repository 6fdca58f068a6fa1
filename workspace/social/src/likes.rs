//! Like Registry: which users like which messages.

use std::collections::HashSet;

use model::entities::{like, message, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, info, instrument, trace};

use crate::error::{Result, SocialError, is_unique_violation};
use crate::messages::newest_first;

/// Outcome of [`toggle_like`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeState {
    Liked,
    Unliked,
}

/// Flips whether `user` likes `message`.
///
/// The check and the flip run in one transaction. When a concurrent toggle
/// inserts the same edge first, this call coalesces into a no-op and
/// reports the message as liked.
#[instrument(skip_all, fields(user_id = user.id, message_id = message.id))]
pub async fn toggle_like(
    db: &DatabaseConnection,
    user: &user::Model,
    message: &message::Model,
) -> Result<LikeState> {
    trace!("Entering toggle_like function");

    let txn = db.begin().await?;

    let removed = like::Entity::delete_many()
        .filter(like::Column::UserId.eq(user.id))
        .filter(like::Column::MessageId.eq(message.id))
        .exec(&txn)
        .await?;

    if removed.rows_affected > 0 {
        txn.commit().await?;
        info!("User {} unliked message {}", user.id, message.id);
        return Ok(LikeState::Unliked);
    }

    let edge = like::ActiveModel {
        user_id: Set(user.id),
        message_id: Set(message.id),
    };
    match edge.insert(&txn).await {
        Ok(_) => {
            txn.commit().await?;
            info!("User {} liked message {}", user.id, message.id);
            Ok(LikeState::Liked)
        }
        // Dropping the transaction rolls it back; the other writer's edge stands
        Err(e) if is_unique_violation(&e) => {
            debug!("Like by user {} on message {} already present", user.id, message.id);
            Ok(LikeState::Liked)
        }
        Err(e) => Err(SocialError::Database(e)),
    }
}

/// Ids of every message `user_id` currently likes.
pub async fn liked_message_ids<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<HashSet<i32>> {
    let ids: Vec<i32> = like::Entity::find()
        .select_only()
        .column(like::Column::MessageId)
        .filter(like::Column::UserId.eq(user_id))
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Messages `user_id` likes, newest first.
#[instrument(skip(db))]
pub async fn liked_messages<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<message::Model>> {
    let liked = newest_first(
        message::Entity::find()
            .join(JoinType::InnerJoin, message::Relation::Like.def())
            .filter(like::Column::UserId.eq(user_id)),
    )
    .all(db)
    .await?;

    debug!("User {} likes {} messages", user_id, liked.len());
    Ok(liked)
}

/// How many likes `user_id` has handed out.
pub async fn count_for_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<u64> {
    Ok(like::Entity::find()
        .filter(like::Column::UserId.eq(user_id))
        .count(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{create_user, post, setup_db, setup_db_at};

    async fn edge_count(db: &DatabaseConnection, user: &user::Model, message: &message::Model) -> u64 {
        like::Entity::find()
            .filter(like::Column::UserId.eq(user.id))
            .filter(like::Column::MessageId.eq(message.id))
            .count(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_toggle_once_then_twice() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let hi = post(&db, &bob, "hi").await;

        assert_eq!(toggle_like(&db, &alice, &hi).await.unwrap(), LikeState::Liked);
        assert_eq!(edge_count(&db, &alice, &hi).await, 1);

        assert_eq!(toggle_like(&db, &alice, &hi).await.unwrap(), LikeState::Unliked);
        assert_eq!(edge_count(&db, &alice, &hi).await, 0);
    }

    #[tokio::test]
    async fn test_likes_are_per_user() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let carol = create_user(&db, "carol").await;
        let first = post(&db, &carol, "first").await;
        let second = post(&db, &carol, "second").await;

        toggle_like(&db, &alice, &first).await.unwrap();
        toggle_like(&db, &alice, &second).await.unwrap();
        toggle_like(&db, &bob, &second).await.unwrap();

        assert_eq!(
            liked_message_ids(&db, alice.id).await.unwrap(),
            HashSet::from([first.id, second.id])
        );
        assert_eq!(
            liked_message_ids(&db, bob.id).await.unwrap(),
            HashSet::from([second.id])
        );
        assert!(liked_message_ids(&db, carol.id).await.unwrap().is_empty());

        let liked = liked_messages(&db, alice.id).await.unwrap();
        let texts: Vec<_> = liked.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);

        assert_eq!(count_for_user(&db, alice.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_toggles_coalesce() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "warbler-likes-{}-{}.db",
            std::process::id(),
            nanos
        ));
        let db = setup_db_at(&format!("sqlite://{}?mode=rwc", path.display())).await;

        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let hi = post(&db, &bob, "hi").await;

        let (first, second) = tokio::join!(
            toggle_like(&db, &alice, &hi),
            toggle_like(&db, &alice, &hi)
        );
        let first = first.unwrap();
        let second = second.unwrap();

        let edges = edge_count(&db, &alice, &hi).await;
        assert!(edges <= 1);
        // Two unlikes would mean a like was recorded twice
        assert!(first == LikeState::Liked || second == LikeState::Liked);
        if first == second {
            assert_eq!(edges, 1);
        } else {
            assert_eq!(edges, 0);
        }

        db.close().await.unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_like_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LikeState::Liked).unwrap(), "\"liked\"");
        assert_eq!(serde_json::to_string(&LikeState::Unliked).unwrap(), "\"unliked\"");
    }
}
