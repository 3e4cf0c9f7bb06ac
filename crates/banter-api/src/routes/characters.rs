//! Routes for the character roster.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use banter_core::character::Character;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /
#[instrument(skip(state))]
async fn list_characters(State(state): State<AppState>) -> Result<Json<Vec<Character>>, ApiError> {
    let characters = state.roster.list_characters().await?;
    Ok(Json(characters))
}

/// Returns the router for the roster.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_characters))
}
