//! Bearer-token sessions.
//!
//! Tokens are random v4 UUIDs held in the moka cache of [`AppState`]; the
//! cache TTL is the session lifetime. Handlers receive the acting user
//! through the [`CurrentUser`] and [`MaybeUser`] extractors.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use model::entities::user;
use social::{SocialError, users};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::schemas::{ApiError, AppState, error_response, unauthenticated};

/// The signed-in user making the request. Rejects with 401 when absent.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

/// The signed-in user, if any.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<user::Model>);

/// Starts a session for `user_id` and returns its token.
pub async fn issue(state: &AppState, user_id: i32) -> String {
    let token = Uuid::new_v4().to_string();
    state.sessions.insert(token.clone(), user_id).await;
    debug!("Issued session for user {}", user_id);
    token
}

/// Ends the session behind `token`.
pub async fn revoke(state: &AppState, token: &str) {
    state.sessions.invalidate(token).await;
}

/// Ends every session belonging to `user_id`.
pub async fn revoke_all(state: &AppState, user_id: i32) {
    let tokens: Vec<String> = state
        .sessions
        .iter()
        .filter(|(_, owner)| *owner == user_id)
        .map(|(token, _)| (*token).clone())
        .collect();

    for token in &tokens {
        state.sessions.invalidate(token).await;
    }
    debug!("Revoked {} sessions for user {}", tokens.len(), user_id);
}

/// The raw token from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<user::Model>, ApiError> {
    let Some(token) = bearer_token(&parts.headers) else {
        trace!("No bearer token on request");
        return Ok(None);
    };

    let Some(user_id) = state.sessions.get(token).await else {
        debug!("Unknown or expired session token");
        return Ok(None);
    };

    match users::get(&state.db, user_id).await {
        Ok(found) => Ok(Some(found)),
        Err(SocialError::NotFound(_)) => {
            warn!("Session points at deleted user {}", user_id);
            revoke(state, token).await;
            Ok(None)
        }
        Err(e) => Err(error_response(e)),
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await?
            .map(CurrentUser)
            .ok_or_else(unauthenticated)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(resolve(parts, state).await?))
    }
}
