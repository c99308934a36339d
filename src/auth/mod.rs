use crate::state::AppState;
use axum::Router;

pub mod claims;
mod dto;
pub mod extractors;
pub mod guard;
pub mod handlers;
pub mod jwt;
mod password;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
