use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod expiry;
pub(crate) mod extractors;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod token;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
