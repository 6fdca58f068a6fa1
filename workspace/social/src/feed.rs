//! Feed Assembler: the home timeline of a viewer.
//!
//! The feed holds messages from the users the viewer follows. The viewer's
//! own messages only appear if they follow themself.

use std::collections::{HashMap, HashSet};

use model::entities::{message, user};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::{likes, messages};

/// How many messages the home feed shows unless told otherwise.
pub const DEFAULT_FEED_LIMIT: u64 = 100;

/// One entry of the home feed.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedItem {
    pub message: message::Model,
    pub author: user::Model,
    pub liked_by_viewer: bool,
}

/// Builds the home feed for `viewer`.
///
/// Returns `None` for an anonymous caller; presenting something else in
/// that case is up to the caller.
#[instrument(skip_all, fields(viewer_id = ?viewer.map(|v| v.id), limit = limit))]
pub async fn build_home_feed<C: ConnectionTrait>(
    db: &C,
    viewer: Option<&user::Model>,
    limit: u64,
) -> Result<Option<Vec<FeedItem>>> {
    let Some(viewer) = viewer else {
        debug!("Anonymous viewer, no feed");
        return Ok(None);
    };

    let recent = messages::recent_by_followed(db, viewer.id, limit).await?;
    let liked = likes::liked_message_ids(db, viewer.id).await?;

    let author_ids: HashSet<i32> = recent.iter().map(|m| m.user_id).collect();
    let authors: HashMap<i32, user::Model> = if author_ids.is_empty() {
        HashMap::new()
    } else {
        user::Entity::find()
            .filter(user::Column::Id.is_in(author_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|author| (author.id, author))
            .collect()
    };

    let feed: Vec<FeedItem> = recent
        .into_iter()
        .filter_map(|message| {
            let author = authors.get(&message.user_id)?.clone();
            let liked_by_viewer = liked.contains(&message.id);
            Some(FeedItem {
                message,
                author,
                liked_by_viewer,
            })
        })
        .collect();

    info!(
        "Built feed of {} messages from {} authors",
        feed.len(),
        authors.len()
    );
    Ok(Some(feed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph;
    use crate::likes::{LikeState, toggle_like};
    use crate::testing::{create_user, post, setup_db};

    fn summary(feed: &[FeedItem]) -> Vec<(&str, bool)> {
        feed.iter()
            .map(|item| (item.message.text.as_str(), item.liked_by_viewer))
            .collect()
    }

    #[tokio::test]
    async fn test_feed_shows_followed_users_messages() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;

        graph::follow(&db, &alice, &bob).await.unwrap();
        post(&db, &bob, "hi").await;

        let feed = build_home_feed(&db, Some(&alice), DEFAULT_FEED_LIMIT)
            .await
            .unwrap()
            .expect("signed-in viewer gets a feed");

        assert_eq!(summary(&feed), vec![("hi", false)]);
        assert_eq!(feed[0].author.username, "bob");
    }

    #[tokio::test]
    async fn test_feed_reflects_like_toggles() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        graph::follow(&db, &alice, &bob).await.unwrap();
        let hi = post(&db, &bob, "hi").await;

        assert_eq!(toggle_like(&db, &alice, &hi).await.unwrap(), LikeState::Liked);
        let feed = build_home_feed(&db, Some(&alice), DEFAULT_FEED_LIMIT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary(&feed), vec![("hi", true)]);

        assert_eq!(toggle_like(&db, &alice, &hi).await.unwrap(), LikeState::Unliked);
        let feed = build_home_feed(&db, Some(&alice), DEFAULT_FEED_LIMIT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary(&feed), vec![("hi", false)]);
    }

    #[tokio::test]
    async fn test_feed_is_capped_newest_first() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        graph::follow(&db, &alice, &bob).await.unwrap();

        for i in 0..150 {
            post(&db, &bob, &format!("warble {}", i)).await;
        }

        let feed = build_home_feed(&db, Some(&alice), DEFAULT_FEED_LIMIT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(feed.len(), 100);
        assert_eq!(feed[0].message.text, "warble 149");
        assert_eq!(feed[99].message.text, "warble 50");
    }

    #[tokio::test]
    async fn test_anonymous_viewer_gets_no_feed() {
        let db = setup_db().await;
        let bob = create_user(&db, "bob").await;
        post(&db, &bob, "hi").await;

        let feed = build_home_feed(&db, None, DEFAULT_FEED_LIMIT).await.unwrap();
        assert!(feed.is_none());
    }

    #[tokio::test]
    async fn test_own_messages_need_a_self_follow() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let carol = create_user(&db, "carol").await;
        graph::follow(&db, &alice, &bob).await.unwrap();

        post(&db, &alice, "mine").await;
        post(&db, &bob, "followed").await;
        post(&db, &carol, "stranger").await;

        let feed = build_home_feed(&db, Some(&alice), DEFAULT_FEED_LIMIT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary(&feed), vec![("followed", false)]);

        graph::follow(&db, &alice, &alice).await.unwrap();
        let feed = build_home_feed(&db, Some(&alice), DEFAULT_FEED_LIMIT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary(&feed), vec![("followed", false), ("mine", false)]);
    }

    #[tokio::test]
    async fn test_feed_without_follows_is_empty() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;

        let feed = build_home_feed(&db, Some(&alice), DEFAULT_FEED_LIMIT)
            .await
            .unwrap()
            .unwrap();
        assert!(feed.is_empty());
    }
}
