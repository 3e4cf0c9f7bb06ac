//! Route modules.

pub mod characters;
pub mod health;
pub mod scenes;

use axum::Router;

use crate::state::AppState;

/// Assembles every route of the API.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/characters", characters::router())
        .nest("/api/v1/scenes", scenes::router())
        .with_state(state)
}
