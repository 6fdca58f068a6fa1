use sea_orm::entity::prelude::*;

/// Profile picture assigned when a user does not provide one.
pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";
/// Profile header assigned when a user does not provide one.
pub const DEFAULT_HEADER_IMAGE_URL: &str = "/static/images/warbler-hero.jpg";

/// Represents a Warbler user.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub username: String,
    /// Argon2 PHC string, never the plaintext.
    pub password: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A user authors many messages.
    #[sea_orm(has_many = "super::message::Entity")]
    Message,
    /// Likes handed out by this user.
    #[sea_orm(has_many = "super::like::Entity")]
    Like,
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Message.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
