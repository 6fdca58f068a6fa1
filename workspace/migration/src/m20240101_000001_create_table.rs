use model::entities::user::{DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL};
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Email).unique_key())
                    .col(string(Users::Username).unique_key())
                    .col(string(Users::Password))
                    .col(string(Users::ImageUrl).default(DEFAULT_IMAGE_URL))
                    .col(string(Users::HeaderImageUrl).default(DEFAULT_HEADER_IMAGE_URL))
                    .col(text_null(Users::Bio))
                    .col(text_null(Users::Location))
                    .to_owned(),
            )
            .await?;

        // Create messages table
        manager
            .create_table(
                Table::create()
                    .table(Messages::Table)
                    .if_not_exists()
                    .col(pk_auto(Messages::Id))
                    .col(string_len(Messages::Text, 140))
                    .col(
                        timestamp_with_time_zone(Messages::Timestamp)
                            .default(Expr::current_timestamp()),
                    )
                    .col(integer(Messages::UserId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_messages_user")
                            .from(Messages::Table, Messages::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_messages_user_timestamp")
                    .table(Messages::Table)
                    .col(Messages::UserId)
                    .col(Messages::Timestamp)
                    .to_owned(),
            )
            .await?;

        // Create follows table (self-referential join table on users)
        manager
            .create_table(
                Table::create()
                    .table(Follows::Table)
                    .if_not_exists()
                    .col(integer(Follows::UserBeingFollowedId))
                    .col(integer(Follows::UserFollowingId))
                    .primary_key(
                        Index::create()
                            .name("pk_follows")
                            .col(Follows::UserBeingFollowedId)
                            .col(Follows::UserFollowingId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_follows_followed")
                            .from(Follows::Table, Follows::UserBeingFollowedId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_follows_follower")
                            .from(Follows::Table, Follows::UserFollowingId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create likes table (join table between users and messages)
        manager
            .create_table(
                Table::create()
                    .table(Likes::Table)
                    .if_not_exists()
                    .col(integer(Likes::UserId))
                    .col(integer(Likes::MessageId))
                    .primary_key(
                        Index::create()
                            .name("pk_likes")
                            .col(Likes::UserId)
                            .col(Likes::MessageId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_likes_user")
                            .from(Likes::Table, Likes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_likes_message")
                            .from(Likes::Table, Likes::MessageId)
                            .to(Messages::Table, Messages::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse dependency order
        manager
            .drop_table(Table::drop().table(Likes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Follows::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Messages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Username,
    Password,
    ImageUrl,
    HeaderImageUrl,
    Bio,
    Location,
}

#[derive(DeriveIden)]
enum Messages {
    Table,
    Id,
    Text,
    Timestamp,
    UserId,
}

#[derive(DeriveIden)]
enum Follows {
    Table,
    UserBeingFollowedId,
    UserFollowingId,
}

#[derive(DeriveIden)]
enum Likes {
    Table,
    UserId,
    MessageId,
}
