use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod signature;

pub fn router() -> Router<AppState> {
    handlers::webhook_routes()
}
