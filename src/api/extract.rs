//! Request extractors that reject with [`AppError`], so every failure renders as
//! `{"error": ...}` with the right status code.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use super::AppState;
use crate::{
    db::store::UserStore, error::AppError, models::User, services::authorization::Principal,
};

/// JSON request body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Path parameters
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParams<T>(pub T);

/// Query string parameters
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(Some)
        .ok_or_else(|| AppError::Unauthenticated("Malformed authorization header".to_string()))
}

async fn authenticate(token: &str, state: &AppState) -> Result<User, AppError> {
    let claims = state.tokens.verify(token)?;
    state
        .store
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Unknown user".to_string()))
}

/// The authenticated caller, freshly loaded so role changes apply immediately
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn principal(&self) -> Principal {
        Principal::from(&self.0)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::Unauthenticated("Missing bearer token".to_string()))?;
        Ok(AuthUser(authenticate(token, state).await?))
    }
}

/// Caller identity on routes that also serve anonymous requests. A token that is
/// present but invalid is still rejected.
pub struct MaybeAuthUser(pub Option<User>);

impl MaybeAuthUser {
    pub fn principal(&self) -> Option<Principal> {
        self.0.as_ref().map(Principal::from)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(MaybeAuthUser(Some(authenticate(token, state).await?))),
            None => Ok(MaybeAuthUser(None)),
        }
    }
}
