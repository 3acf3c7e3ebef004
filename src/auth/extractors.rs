use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use crate::auth::repo::AuthStore;
use crate::error::{ApiError, ValidationErrors};
use crate::state::AppState;

/// Resolves the bearer token of a request to its user id. Handlers receive
/// the authenticated principal explicitly instead of reading ambient state.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or(ApiError::Unauthenticated)?;

        match state.store.user_id_for_token(token).await? {
            Some(user_id) => Ok(AuthUser(user_id)),
            None => {
                warn!("request with unknown bearer token");
                Err(ApiError::Unauthenticated)
            }
        }
    }
}

/// `Json` that fails into the API envelope: a missing or malformed body
/// becomes a 422 field error instead of axum's plain-text rejection.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                warn!(error = %rejection, "malformed request body");
                let mut errors = ValidationErrors::default();
                errors.add("body", "Request body must be valid JSON");
                Err(ApiError::Validation(errors))
            }
        }
    }
}
