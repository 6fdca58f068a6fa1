//! Social Graph: the directed "follows" relation between users.
//!
//! Self-follows are allowed, matching the schema. Following someone twice
//! is a no-op rather than an error.

use std::collections::HashSet;

use model::entities::{follow, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use tracing::{debug, info, instrument, trace};

use crate::error::{Result, SocialError, is_unique_violation};

/// Makes `follower` follow `followee`.
#[instrument(skip_all, fields(follower_id = follower.id, followee_id = followee.id))]
pub async fn follow(
    db: &DatabaseConnection,
    follower: &user::Model,
    followee: &user::Model,
) -> Result<()> {
    trace!("Entering follow function");

    let edge = follow::ActiveModel {
        user_being_followed_id: Set(followee.id),
        user_following_id: Set(follower.id),
    };

    match edge.insert(db).await {
        Ok(_) => {
            info!("User {} now follows user {}", follower.id, followee.id);
            Ok(())
        }
        // The composite key makes a second identical edge impossible
        Err(e) if is_unique_violation(&e) => {
            debug!("User {} already follows user {}", follower.id, followee.id);
            Ok(())
        }
        Err(e) => Err(SocialError::Database(e)),
    }
}

/// Removes the edge from `follower` to `followee` if there is one.
#[instrument(skip_all, fields(follower_id = follower.id, followee_id = followee.id))]
pub async fn unfollow(
    db: &DatabaseConnection,
    follower: &user::Model,
    followee: &user::Model,
) -> Result<()> {
    trace!("Entering unfollow function");

    let result = follow::Entity::delete_many()
        .filter(follow::Column::UserFollowingId.eq(follower.id))
        .filter(follow::Column::UserBeingFollowedId.eq(followee.id))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        info!("User {} stopped following user {}", follower.id, followee.id);
    } else {
        debug!("User {} was not following user {}", follower.id, followee.id);
    }
    Ok(())
}

async fn edge_exists<C: ConnectionTrait>(db: &C, follower_id: i32, followed_id: i32) -> Result<bool> {
    let count = follow::Entity::find()
        .filter(follow::Column::UserFollowingId.eq(follower_id))
        .filter(follow::Column::UserBeingFollowedId.eq(followed_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Is `a` following `b`?
pub async fn is_following<C: ConnectionTrait>(db: &C, a: &user::Model, b: &user::Model) -> Result<bool> {
    edge_exists(db, a.id, b.id).await
}

/// Is `a` followed by `b`?
pub async fn is_followed_by<C: ConnectionTrait>(db: &C, a: &user::Model, b: &user::Model) -> Result<bool> {
    edge_exists(db, b.id, a.id).await
}

/// Everyone `user` follows, ordered by id.
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn list_following<C: ConnectionTrait>(db: &C, user: &user::Model) -> Result<Vec<user::Model>> {
    let following = user::Entity::find()
        .join_rev(JoinType::InnerJoin, follow::Relation::Followed.def())
        .filter(follow::Column::UserFollowingId.eq(user.id))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?;

    debug!("User {} follows {} users", user.id, following.len());
    Ok(following)
}

/// Everyone following `user`, ordered by id.
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn list_followers<C: ConnectionTrait>(db: &C, user: &user::Model) -> Result<Vec<user::Model>> {
    let followers = user::Entity::find()
        .join_rev(JoinType::InnerJoin, follow::Relation::Follower.def())
        .filter(follow::Column::UserBeingFollowedId.eq(user.id))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?;

    debug!("User {} has {} followers", user.id, followers.len());
    Ok(followers)
}

/// Ids of everyone `user_id` follows.
pub async fn following_ids<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<HashSet<i32>> {
    let ids: Vec<i32> = follow::Entity::find()
        .select_only()
        .column(follow::Column::UserBeingFollowedId)
        .filter(follow::Column::UserFollowingId.eq(user_id))
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

/// `(followers, following)` for the profile summary.
pub async fn counts<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<(u64, u64)> {
    let followers = follow::Entity::find()
        .filter(follow::Column::UserBeingFollowedId.eq(user_id))
        .count(db)
        .await?;
    let following = follow::Entity::find()
        .filter(follow::Column::UserFollowingId.eq(user_id))
        .count(db)
        .await?;
    Ok((followers, following))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{create_user, setup_db};

    async fn edge_count(db: &DatabaseConnection, follower: &user::Model, followee: &user::Model) -> u64 {
        follow::Entity::find()
            .filter(follow::Column::UserFollowingId.eq(follower.id))
            .filter(follow::Column::UserBeingFollowedId.eq(followee.id))
            .count(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_follow_and_membership() {
        let db = setup_db().await;
        let testuser = create_user(&db, "testuser").await;
        let testfollowing = create_user(&db, "testfollowing").await;
        let testfollower = create_user(&db, "testfollower").await;

        follow(&db, &testuser, &testfollowing).await.unwrap();
        follow(&db, &testfollower, &testuser).await.unwrap();

        assert!(is_following(&db, &testuser, &testfollowing).await.unwrap());
        assert!(!is_following(&db, &testfollowing, &testuser).await.unwrap());
        assert!(is_followed_by(&db, &testuser, &testfollower).await.unwrap());
        assert!(!is_followed_by(&db, &testuser, &testfollowing).await.unwrap());

        let following = list_following(&db, &testuser).await.unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].username, "testfollowing");

        let followers = list_followers(&db, &testuser).await.unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].username, "testfollower");

        assert_eq!(counts(&db, testuser.id).await.unwrap(), (1, 1));
        assert_eq!(
            following_ids(&db, testuser.id).await.unwrap(),
            HashSet::from([testfollowing.id])
        );
    }

    #[tokio::test]
    async fn test_follow_twice_keeps_one_edge() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;

        follow(&db, &alice, &bob).await.unwrap();
        follow(&db, &alice, &bob).await.unwrap();

        assert_eq!(edge_count(&db, &alice, &bob).await, 1);
    }

    #[tokio::test]
    async fn test_follow_then_unfollow_leaves_others_alone() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let carol = create_user(&db, "carol").await;

        follow(&db, &alice, &bob).await.unwrap();
        follow(&db, &carol, &bob).await.unwrap();
        unfollow(&db, &alice, &bob).await.unwrap();

        assert_eq!(edge_count(&db, &alice, &bob).await, 0);
        assert_eq!(edge_count(&db, &carol, &bob).await, 1);
        assert!(!is_following(&db, &alice, &bob).await.unwrap());
    }

    #[tokio::test]
    async fn test_unfollow_without_edge_is_noop() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;

        unfollow(&db, &alice, &bob).await.unwrap();
        assert!(list_following(&db, &alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_self_follow_is_allowed() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;

        follow(&db, &alice, &alice).await.unwrap();

        assert!(is_following(&db, &alice, &alice).await.unwrap());
        assert!(is_followed_by(&db, &alice, &alice).await.unwrap());
    }
}
