use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::dto::{LoginInput, PublicUser, RegisterInput};
use crate::auth::expiry::{self, TokenExpiry};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::AuthStore;
use crate::auth::token::generate_token;
use crate::error::{ApiError, ValidationErrors};

/// Result of a successful login or refresh.
#[derive(Debug)]
pub struct Session {
    pub user: PublicUser,
    pub token: String,
    pub expiry: TokenExpiry,
}

pub async fn register(
    store: &dyn AuthStore,
    input: RegisterInput,
) -> Result<PublicUser, ApiError> {
    if store.find_by_email(&input.email).await?.is_some() {
        let mut errors = ValidationErrors::default();
        errors.add("email", "Email has already been taken");
        return Err(errors.into());
    }

    let hash = hash_password(&input.password)?;
    let name = format!("{} {}", input.first_name, input.last_name);
    let user = store
        .create_user(Uuid::new_v4(), &name, &input.email, &hash)
        .await?;

    info!(user_id = %user.id, "user registered");
    Ok(PublicUser::from(&user))
}

/// Unknown email and wrong password answer identically, so a caller cannot
/// probe which addresses are registered.
pub async fn login(
    store: &dyn AuthStore,
    ttl_seconds: i64,
    input: LoginInput,
) -> Result<Session, ApiError> {
    let user = match store.find_by_email(&input.email).await? {
        Some(user) => user,
        None => {
            warn!("login attempt for unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !verify_password(&input.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    if user.email_verified_at.is_none() {
        return Err(ApiError::UnverifiedEmail);
    }

    // Login adds a token without revoking earlier ones; sessions on other
    // devices stay alive.
    let token = generate_token();
    store.create_token(user.id, &token).await?;

    let expiry = expiry::compute(OffsetDateTime::now_utc(), input.client_time, ttl_seconds);
    info!(user_id = %user.id, "user logged in");
    Ok(Session {
        user: PublicUser::from(&user),
        token,
        expiry,
    })
}

pub async fn verify_email(store: &dyn AuthStore, email: &str) -> Result<(), ApiError> {
    let user = store
        .find_by_email(email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if user.email_verified_at.is_some() {
        return Err(ApiError::AlreadyVerified);
    }

    // The store only flips the column while it is still NULL, so a
    // concurrent second call surfaces as a conflict rather than an update.
    if !store
        .set_email_verified(user.id, OffsetDateTime::now_utc())
        .await?
    {
        return Err(ApiError::AlreadyVerified);
    }

    info!(user_id = %user.id, "email verified");
    Ok(())
}

pub async fn logout(store: &dyn AuthStore, user_id: Uuid) -> Result<(), ApiError> {
    let revoked = store.delete_tokens_for_user(user_id).await?;
    info!(user_id = %user_id, revoked, "user logged out");
    Ok(())
}

pub async fn refresh(
    store: &dyn AuthStore,
    ttl_seconds: i64,
    user_id: Uuid,
    client_time: OffsetDateTime,
) -> Result<Session, ApiError> {
    let user = store
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    let token = generate_token();
    store.replace_tokens(user.id, &token).await?;

    let expiry = expiry::compute(OffsetDateTime::now_utc(), client_time, ttl_seconds);
    info!(user_id = %user.id, "token refreshed");
    Ok(Session {
        user: PublicUser::from(&user),
        token,
        expiry,
    })
}

pub async fn profile(store: &dyn AuthStore, user_id: Uuid) -> Result<PublicUser, ApiError> {
    let user = store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(PublicUser::from(&user))
}
