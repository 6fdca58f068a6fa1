//! Root of the SeaORM entity modules.
//! Warbler keeps four tables: users, their messages, the self-referential
//! follows relation, and likes linking users to messages.

pub mod follow;
pub mod like;
pub mod message;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::follow::Entity as Follow;
    pub use super::like::Entity as Like;
    pub use super::message::Entity as Message;
    pub use super::user::Entity as User;
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, DbErr, EntityTrait,
        ModelTrait, PaginatorTrait, QueryFilter, Set,
    };

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;
        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    async fn insert_user(db: &DatabaseConnection, name: &str) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            email: Set(format!("{}@test.com", name)),
            username: Set(name.to_string()),
            password: Set("HASHED_PASSWORD".to_string()),
            image_url: Set(user::DEFAULT_IMAGE_URL.to_string()),
            header_image_url: Set(user::DEFAULT_HEADER_IMAGE_URL.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let alice = insert_user(&db, "alice").await?;
        let bob = insert_user(&db, "bob").await?;

        // Fresh users have no messages and no followers
        assert_eq!(alice.find_related(Message).count(&db).await?, 0);
        assert_eq!(
            Follow::find()
                .filter(follow::Column::UserBeingFollowedId.eq(alice.id))
                .count(&db)
                .await?,
            0
        );

        let hi = message::ActiveModel {
            text: Set("hi".to_string()),
            timestamp: Set(Utc::now()),
            user_id: Set(bob.id),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        follow::ActiveModel {
            user_being_followed_id: Set(bob.id),
            user_following_id: Set(alice.id),
        }
        .insert(&db)
        .await?;

        like::ActiveModel {
            user_id: Set(alice.id),
            message_id: Set(hi.id),
        }
        .insert(&db)
        .await?;

        let author = hi.find_related(User).one(&db).await?.expect("author exists");
        assert_eq!(author.username, "bob");

        let liked_by_alice = Like::find()
            .filter(like::Column::UserId.eq(alice.id))
            .all(&db)
            .await?;
        assert_eq!(liked_by_alice.len(), 1);
        assert_eq!(liked_by_alice[0].message_id, hi.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() -> Result<(), DbErr> {
        let db = setup_db().await?;
        insert_user(&db, "testuser").await?;

        let duplicate = insert_user(&db, "testuser").await;
        assert!(duplicate.is_err());
        assert_eq!(User::find().count(&db).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_follow_edge_rejected() -> Result<(), DbErr> {
        let db = setup_db().await?;
        let alice = insert_user(&db, "alice").await?;
        let bob = insert_user(&db, "bob").await?;

        let edge = follow::ActiveModel {
            user_being_followed_id: Set(bob.id),
            user_following_id: Set(alice.id),
        };
        edge.clone().insert(&db).await?;
        assert!(edge.insert(&db).await.is_err());

        Ok(())
    }
}
