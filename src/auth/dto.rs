use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::expiry;
use crate::auth::repo_types::User;
use crate::auth::services::Session;
use crate::error::{ApiError, ValidationErrors};

time::serde::format_description!(
    datetime_format,
    OffsetDateTime,
    "[year]-[month]-[day] [hour]:[minute]:[second]"
);

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Public projection of a user. The only user shape that is ever serialized.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(with = "datetime_format::option")]
    pub email_verified_at: Option<OffsetDateTime>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            email_verified_at: user.email_verified_at,
        }
    }
}

/// Standard success envelope for everything except login/refresh.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn with_data(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: None,
        }
    }
}

/// Flat response of login and refresh: user, token and the advisory expiry.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
    pub token: String,
    #[serde(with = "datetime_format")]
    pub expired_at: OffsetDateTime,
    pub is_expired: bool,
    #[serde(with = "datetime_format")]
    pub server_time: OffsetDateTime,
}

impl SessionResponse {
    pub fn new(message: &str, session: Session) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            user: session.user,
            token: session.token,
            expired_at: session.expiry.expired_at,
            is_expired: session.expiry.is_expired,
            server_time: session.expiry.server_time,
        }
    }
}

// Request bodies deserialize every field as Option so that a missing field
// becomes a field-level validation message instead of a deserialize error.

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug)]
pub struct RegisterInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<RegisterInput, ApiError> {
        let mut errors = ValidationErrors::default();

        let first_name = non_empty(self.first_name);
        if first_name.is_none() {
            errors.add("first_name", "First name is required");
        }
        let last_name = non_empty(self.last_name);
        if last_name.is_none() {
            errors.add("last_name", "Last name is required");
        }
        let email = non_empty(self.email).map(|e| e.to_lowercase());
        match &email {
            None => errors.add("email", "Email is required"),
            Some(e) if !is_valid_email(e) => {
                errors.add("email", "Email must be a valid email address")
            }
            _ => {}
        }
        let password = self.password.filter(|p| !p.is_empty());
        if password.is_none() {
            errors.add("password", "Password is required");
        }

        match (first_name, last_name, email, password) {
            (Some(first_name), Some(last_name), Some(email), Some(password))
                if errors.is_empty() =>
            {
                Ok(RegisterInput {
                    first_name,
                    last_name,
                    email,
                    password,
                })
            }
            _ => Err(errors.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub client_time_at_login: Option<String>,
}

#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub client_time: OffsetDateTime,
}

impl LoginRequest {
    pub fn validate(self) -> Result<LoginInput, ApiError> {
        let mut errors = ValidationErrors::default();

        let email = non_empty(self.email).map(|e| e.to_lowercase());
        match &email {
            None => errors.add("email", "Email is required"),
            Some(e) if !is_valid_email(e) => {
                errors.add("email", "Email must be a valid email address")
            }
            _ => {}
        }
        let password = self.password.filter(|p| !p.is_empty());
        if password.is_none() {
            errors.add("password", "Password is required");
        }
        let client_time = validate_client_time(self.client_time_at_login, &mut errors);

        match (email, password, client_time) {
            (Some(email), Some(password), Some(client_time)) if errors.is_empty() => {
                Ok(LoginInput {
                    email,
                    password,
                    client_time,
                })
            }
            _ => Err(errors.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: Option<String>,
}

impl VerifyEmailRequest {
    pub fn validate(self) -> Result<String, ApiError> {
        let mut errors = ValidationErrors::default();
        let email = non_empty(self.email).map(|e| e.to_lowercase());
        match &email {
            None => errors.add("email", "Email is required"),
            Some(e) if !is_valid_email(e) => {
                errors.add("email", "Email must be a valid email address")
            }
            _ => {}
        }
        match email {
            Some(email) if errors.is_empty() => Ok(email),
            _ => Err(errors.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub client_time_at_login: Option<String>,
}

impl RefreshRequest {
    pub fn validate(self) -> Result<OffsetDateTime, ApiError> {
        let mut errors = ValidationErrors::default();
        let client_time = validate_client_time(self.client_time_at_login, &mut errors);
        match client_time {
            Some(client_time) if errors.is_empty() => Ok(client_time),
            _ => Err(errors.into()),
        }
    }
}

fn validate_client_time(
    value: Option<String>,
    errors: &mut ValidationErrors,
) -> Option<OffsetDateTime> {
    match non_empty(value) {
        None => {
            errors.add("client_time_at_login", "Client time at login is required");
            None
        }
        Some(raw) => match expiry::parse_client_time(&raw) {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                errors.add(
                    "client_time_at_login",
                    "Client time at login must be in the format YYYY-MM-DD HH:MM:SS",
                );
                None
            }
        },
    }
}
