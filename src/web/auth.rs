//! Bearer-token authentication for handlers.

use crate::{core::account, entities::user, errors::Error, web::AppState};
use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};

/// The logged-in user, resolved from `Authorization: Bearer <token>`.
///
/// Extracting it fails with [`Error::Unauthorized`] when the header is
/// missing, malformed, or names an unknown or expired session.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// The user owning the session
    pub user: user::Model,
    /// The session token presented
    pub token: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(Error::Unauthorized)?.to_string();
        let user = account::user_for_token(&state.db, &token)
            .await?
            .ok_or(Error::Unauthorized)?;
        Ok(Self { user, token })
    }
}
