pub mod auth;
pub mod feed;
pub mod follows;
pub mod health;
pub mod messages;
pub mod users;
