use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod model;
pub mod pg;
pub mod resolver;
pub mod service;
pub mod store;

pub fn router(state: &AppState) -> Router<AppState> {
    handlers::chat_routes(state)
}
