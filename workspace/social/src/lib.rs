//! The Warbler social core: users, the follow graph, messages, likes and
//! the home feed, all expressed as explicit operations over a SeaORM
//! connection. Every operation takes the acting user as a parameter; nothing
//! here reads ambient session state.

pub mod credentials;
pub mod error;
pub mod feed;
pub mod graph;
pub mod likes;
pub mod messages;
pub mod seed;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, SocialError};
