use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::auth::dto::{
    ApiResponse, LoginRequest, RefreshRequest, RegisterRequest, SessionResponse,
    VerifyEmailRequest,
};
use crate::auth::extractors::{ApiJson, AuthUser};
use crate::auth::services;
use crate::error::ApiError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = payload.validate()?;
    let user = services::register(state.store.as_ref(), input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_data(
            "Registration successful, please verify your email",
            user,
        )),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let input = payload.validate()?;
    let session = services::login(
        state.store.as_ref(),
        state.config.auth.token_ttl_seconds,
        input,
    )
    .await?;
    Ok(Json(SessionResponse::new("Login successful", session)))
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyEmailRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let email = payload.validate()?;
    services::verify_email(state.store.as_ref(), &email).await?;
    Ok(Json(ApiResponse::message(
        "Your email has been successfully verified",
    )))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    services::logout(state.store.as_ref(), user_id).await?;
    Ok(Json(ApiResponse::message("Logout successful")))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let client_time = payload.validate()?;
    let session = services::refresh(
        state.store.as_ref(),
        state.config.auth.token_ttl_seconds,
        user_id,
        client_time,
    )
    .await?;
    Ok(Json(SessionResponse::new(
        "Token refreshed successfully",
        session,
    )))
}
