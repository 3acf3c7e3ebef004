use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::auth::dto::{ApiResponse, PublicUser};
use crate::auth::extractors::AuthUser;
use crate::auth::services;
use crate::error::ApiError;
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users/profile", get(profile))
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<PublicUser>>, ApiError> {
    let user = services::profile(state.store.as_ref(), user_id).await?;
    Ok(Json(ApiResponse::with_data("Profile fetched", user)))
}
