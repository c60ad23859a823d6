mod dto;
pub mod handlers;
pub mod repo;
mod services;

use crate::state::AppState;
use axum::Router;

pub fn router(body_limit: usize) -> Router<AppState> {
    handlers::routes(body_limit)
}
