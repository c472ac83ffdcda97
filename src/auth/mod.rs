use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod services;
pub mod jwt;
pub mod password;
pub(crate) mod extractors;
mod claims;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
