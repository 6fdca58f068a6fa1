//! User Directory: signup, authentication, profile edits, account deletion
//! and username search.

use model::entities::{follow, like, message, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set, TransactionTrait,
    sea_query::{Expr, LikeExpr},
};
use tracing::{debug, info, instrument, trace, warn};
use validator::{Validate, ValidationError};

use crate::credentials;
use crate::error::{Result, SocialError};

/// Input for [`signup`].
#[derive(Clone, Validate)]
pub struct NewUser {
    #[validate(
        length(min = 1, max = 50, message = "must be between 1 and 50 characters"),
        custom(function = "not_blank")
    )]
    pub username: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
    /// Falls back to [`user::DEFAULT_IMAGE_URL`] when absent or empty.
    pub image_url: Option<String>,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("image_url", &self.image_url)
            .finish_non_exhaustive()
    }
}

/// Fields a user may change on their own profile. `None` leaves a field as
/// it is; an empty image URL resets it to the default.
#[derive(Clone, Debug, Default, Validate)]
pub struct ProfileUpdate {
    #[validate(
        length(min = 1, max = 50, message = "must be between 1 and 50 characters"),
        custom(function = "not_blank")
    )]
    pub username: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

fn or_default(url: Option<String>, default: &str) -> String {
    match url {
        Some(url) if !url.trim().is_empty() => url,
        _ => default.to_string(),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

/// Creates a user, storing only the hash of the password.
///
/// A colliding username or email surfaces as [`SocialError::Uniqueness`];
/// which of the two collided is not distinguished.
#[instrument(skip(db))]
pub async fn signup(db: &DatabaseConnection, new_user: NewUser) -> Result<user::Model> {
    trace!("Entering signup function");
    new_user.validate()?;

    let password = credentials::hash(&new_user.password)?;
    let new_user_model = user::ActiveModel {
        username: Set(new_user.username.clone()),
        email: Set(new_user.email),
        password: Set(password),
        image_url: Set(or_default(new_user.image_url, user::DEFAULT_IMAGE_URL)),
        header_image_url: Set(user::DEFAULT_HEADER_IMAGE_URL.to_string()),
        ..Default::default()
    };

    let created = new_user_model
        .insert(db)
        .await
        .map_err(|e| SocialError::from_insert(e, "username"))?;

    info!("User created with ID: {}, username: {}", created.id, created.username);
    Ok(created)
}

/// Returns the user when `username` exists and `password` matches.
///
/// An unknown username and a wrong password both produce
/// [`SocialError::AuthFailure`], so callers cannot tell them apart.
#[instrument(skip(db, password))]
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    username: &str,
    password: &str,
) -> Result<user::Model> {
    trace!("Entering authenticate function");

    let found = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;

    match found {
        Some(found) if credentials::verify(password, &found.password) => {
            debug!("User {} authenticated", found.id);
            Ok(found)
        }
        _ => {
            warn!("Authentication failed for username: {}", username);
            Err(SocialError::AuthFailure)
        }
    }
}

/// Applies `update` to `acting`'s profile after re-checking the current
/// password. Either every field is written or none is.
#[instrument(skip(db, acting, update, current_password), fields(user_id = acting.id))]
pub async fn update_profile(
    db: &DatabaseConnection,
    acting: &user::Model,
    update: ProfileUpdate,
    current_password: &str,
) -> Result<user::Model> {
    trace!("Entering update_profile function");

    let txn = db.begin().await?;

    // Re-read so a stale snapshot cannot authenticate against an old hash
    let current = user::Entity::find_by_id(acting.id)
        .one(&txn)
        .await?
        .ok_or_else(|| SocialError::NotFound(format!("User {}", acting.id)))?;
    authenticate(&txn, &current.username, current_password).await?;

    update.validate()?;

    let mut active: user::ActiveModel = current.into();
    let mut updated_fields = Vec::new();

    if let Some(username) = update.username {
        active.username = Set(username);
        updated_fields.push("username");
    }
    if let Some(email) = update.email {
        active.email = Set(email);
        updated_fields.push("email");
    }
    if let Some(image_url) = update.image_url {
        active.image_url = Set(or_default(Some(image_url), user::DEFAULT_IMAGE_URL));
        updated_fields.push("image_url");
    }
    if let Some(header_image_url) = update.header_image_url {
        active.header_image_url = Set(or_default(
            Some(header_image_url),
            user::DEFAULT_HEADER_IMAGE_URL,
        ));
        updated_fields.push("header_image_url");
    }
    if let Some(bio) = update.bio {
        active.bio = Set(non_empty(bio));
        updated_fields.push("bio");
    }
    if let Some(location) = update.location {
        active.location = Set(non_empty(location));
        updated_fields.push("location");
    }

    if updated_fields.is_empty() {
        debug!("No fields to update for user ID: {}", acting.id);
        txn.commit().await?;
        return get(db, acting.id).await;
    }

    let updated = active
        .update(&txn)
        .await
        .map_err(|e| SocialError::from_insert(e, "username"))?;
    txn.commit().await?;

    info!(
        "User with ID {} updated. Updated fields: {}",
        updated.id,
        updated_fields.join(", ")
    );
    Ok(updated)
}

/// Deletes `user_id` together with its messages, follow edges in both
/// directions, the likes it gave and the likes its messages received.
/// Only the user themself may do this.
#[instrument(skip(db, requester), fields(requester_id = requester.id))]
pub async fn delete(db: &DatabaseConnection, requester: &user::Model, user_id: i32) -> Result<()> {
    trace!("Entering delete function for user_id: {}", user_id);

    if requester.id != user_id {
        warn!("User {} tried to delete user {}", requester.id, user_id);
        return Err(SocialError::Authorization(
            "users can only delete themselves".to_string(),
        ));
    }

    let txn = db.begin().await?;

    if user::Entity::find_by_id(user_id).one(&txn).await?.is_none() {
        return Err(SocialError::NotFound(format!("User {}", user_id)));
    }

    let own_messages = message::Entity::find()
        .select_only()
        .column(message::Column::Id)
        .filter(message::Column::UserId.eq(user_id))
        .into_query();
    let like_condition = Condition::any()
        .add(like::Column::UserId.eq(user_id))
        .add(like::Column::MessageId.in_subquery(own_messages));
    let likes = like::Entity::delete_many()
        .filter(like_condition)
        .exec(&txn)
        .await?;

    let follows = follow::Entity::delete_many()
        .filter(
            Condition::any()
                .add(follow::Column::UserFollowingId.eq(user_id))
                .add(follow::Column::UserBeingFollowedId.eq(user_id)),
        )
        .exec(&txn)
        .await?;

    let messages = message::Entity::delete_many()
        .filter(message::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;

    user::Entity::delete_by_id(user_id).exec(&txn).await?;
    txn.commit().await?;

    info!(
        "User {} deleted along with {} messages, {} follow edges and {} likes",
        user_id, messages.rows_affected, follows.rows_affected, likes.rows_affected
    );
    Ok(())
}

/// Fetches one user by id.
#[instrument(skip(db))]
pub async fn get<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<user::Model> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            warn!("User with ID {} not found", user_id);
            SocialError::NotFound(format!("User {}", user_id))
        })
}

// `%`, `_` and the escape character itself match literally in the pattern.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Users whose username contains `query`, case-sensitively; every user when
/// the query is absent or blank. Ordered by id.
#[instrument(skip(db))]
pub async fn search<C: ConnectionTrait>(db: &C, query: Option<&str>) -> Result<Vec<user::Model>> {
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        let users = user::Entity::find()
            .order_by_asc(user::Column::Id)
            .all(db)
            .await?;
        debug!("Search listed all {} users", users.len());
        return Ok(users);
    };

    let candidates = user::Entity::find()
        .filter(
            Expr::col((user::Entity, user::Column::Username))
                .like(LikeExpr::new(like_pattern(query)).escape('\\')),
        )
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?;

    // SQLite's LIKE folds ASCII case, so the store only narrows the set
    let users: Vec<user::Model> = candidates
        .into_iter()
        .filter(|candidate| candidate.username.contains(query))
        .collect();
    debug!("Search matched {} users", users.len());
    Ok(users)
}
