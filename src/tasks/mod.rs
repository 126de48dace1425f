use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod export;
pub mod filter;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod stats;

pub use repo_types::{Priority, Task};

pub fn router() -> Router<AppState> {
    handlers::task_routes()
}
