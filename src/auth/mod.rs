use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod services;

/// Routes reachable without a session.
pub fn public_router() -> Router<AppState> {
    handlers::auth_routes()
}

pub fn router() -> Router<AppState> {
    handlers::me_routes()
}
