use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::jwt::JwtKeys;
use crate::{error::AppError, state::AppState, storage::UserStore, users::repo_types::UserRecord};

/// Resolves a bearer token to the user it was issued for.
///
/// The subject is looked up again on every call, so a token for a deleted
/// account stops working even though the token itself never expires.
pub async fn authenticate(
    keys: &JwtKeys,
    store: &UserStore,
    token: &str,
) -> Result<UserRecord, AppError> {
    let user_id = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid token");
        AppError::Unauthorized("Invalid token".into())
    })?;

    match UserRecord::find_by_id(store, user_id).await? {
        Some(user) => Ok(user),
        None => {
            warn!(user_id, "token subject no longer exists");
            Err(AppError::Unauthorized(
                "Login first to access this endpoint.".into(),
            ))
        }
    }
}

/// The authenticated user behind the request's bearer token.
pub struct AuthUser(pub UserRecord);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Invalid auth scheme".into()))?;

        let keys = JwtKeys::from_ref(state);
        let user = authenticate(&keys, &state.store, token.trim()).await?;
        Ok(AuthUser(user))
    }
}
