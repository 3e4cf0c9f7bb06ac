//! Routes for the Scene bounded context.
//!
//! Reactions fanned out by starting a scene or updating its narration run in
//! the background; the moderator UI polls `GET /{scene_id}` for the tracks.
//! Single-character commands wait for their dispatch and return its outcome.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{
    Json, Router,
    routing::{get, post},
};
use banter_core::character::CharacterId;
use banter_core::generation::ActionKind;
use banter_scene::application::query_handlers::SceneView;
use banter_scene::application::{command_handlers, query_handlers};
use banter_scene::domain::commands;
use banter_scene::domain::outcome::{ActionResult, ReactionOutcome};
use banter_scene::domain::session::ReactionBatch;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct StartSceneRequest {
    /// Opening narration.
    pub narration: String,
    /// Roster ids of the characters in the scene, PCs included.
    pub character_ids: Vec<CharacterId>,
}

/// Response body for POST /.
#[derive(Debug, Serialize)]
pub struct SceneStartedResponse {
    /// The new scene.
    pub scene_id: Uuid,
    /// Characters with a conversation track.
    pub participants: Vec<CharacterId>,
    /// Characters asked to react.
    pub reacting: Vec<CharacterId>,
}

/// Request body for POST /{scene_id}/narration.
#[derive(Debug, Deserialize)]
pub struct NarrationRequest {
    /// Narration to append.
    pub text: String,
}

/// Response body for POST /{scene_id}/narration.
#[derive(Debug, Serialize)]
pub struct ReactionsIssuedResponse {
    /// Characters asked to react.
    pub reacting: Vec<CharacterId>,
}

/// Request body for POST /{scene_id}/characters/{character_id}/actions.
#[derive(Debug, Deserialize)]
pub struct TriggerActionRequest {
    /// The action, by wire name.
    pub action: ActionKind,
}

/// Request body for POST /{scene_id}/characters/{character_id}/options/select.
#[derive(Debug, Deserialize)]
pub struct SelectOptionRequest {
    /// Zero-based index into the offered options.
    pub option_index: usize,
}

/// Request body for POST /{scene_id}/characters/{character_id}/address.
#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    /// Who speaks; the moderator when absent.
    #[serde(default)]
    pub speaker: Option<String>,
    /// The line.
    pub text: String,
}

/// Outcome of a single-character dispatch.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchResponse {
    /// An action was acknowledged.
    Accepted {
        /// Summary recorded on the track.
        message: String,
        /// Surfaced options, for actions that produce them.
        #[serde(skip_serializing_if = "Option::is_none")]
        options: Option<Vec<String>>,
    },
    /// The character answered.
    Spoke {
        /// The appended line.
        line: String,
    },
    /// The dispatch failed and the failure is on the track.
    Failed {
        /// Machine-readable reason.
        error: &'static str,
        /// Human-readable reason.
        message: String,
    },
}

impl From<ActionResult> for DispatchResponse {
    fn from(result: ActionResult) -> Self {
        match result {
            ActionResult::Accepted { message, options } => Self::Accepted { message, options },
            ActionResult::Failed { reason } => Self::Failed {
                error: reason.code(),
                message: reason.to_string(),
            },
        }
    }
}

impl From<ReactionOutcome> for DispatchResponse {
    fn from(outcome: ReactionOutcome) -> Self {
        match outcome {
            ReactionOutcome::Spoke { line } => Self::Spoke { line },
            ReactionOutcome::Failed { reason } => Self::Failed {
                error: reason.code(),
                message: reason.to_string(),
            },
        }
    }
}

/// Lets a batch finish in the background and reports who was asked.
fn detach(batch: ReactionBatch) -> Vec<CharacterId> {
    let reacting = batch.character_ids();
    tokio::spawn(async move {
        batch.wait().await;
    });
    reacting
}

/// POST /
#[instrument(skip(state, request))]
async fn start_scene(
    State(state): State<AppState>,
    Json(request): Json<StartSceneRequest>,
) -> Result<(StatusCode, Json<SceneStartedResponse>), ApiError> {
    let command = commands::StartScene {
        correlation_id: Uuid::new_v4(),
        narration: request.narration,
        character_ids: request.character_ids,
    };

    info!(correlation_id = %command.correlation_id, "handling start_scene command");

    let started = command_handlers::handle_start_scene(
        &command,
        state.roster.as_ref(),
        &state.services,
        &state.registry,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SceneStartedResponse {
            scene_id: started.scene_id,
            participants: started.participants,
            reacting: detach(started.reactions),
        }),
    ))
}

/// GET /{scene_id}
#[instrument(skip(state))]
async fn get_scene(
    State(state): State<AppState>,
    Path(scene_id): Path<Uuid>,
) -> Result<Json<SceneView>, ApiError> {
    let view = query_handlers::get_scene_by_id(scene_id, &state.registry)?;
    Ok(Json(view))
}

/// DELETE /{scene_id}
#[instrument(skip(state))]
async fn end_scene(
    State(state): State<AppState>,
    Path(scene_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = commands::EndScene {
        correlation_id: Uuid::new_v4(),
        scene_id,
    };

    info!(correlation_id = %command.correlation_id, "handling end_scene command");

    command_handlers::handle_end_scene(&command, &state.registry)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /{scene_id}/narration
#[instrument(skip(state, request))]
async fn update_narration(
    State(state): State<AppState>,
    Path(scene_id): Path<Uuid>,
    Json(request): Json<NarrationRequest>,
) -> Result<(StatusCode, Json<ReactionsIssuedResponse>), ApiError> {
    let command = commands::UpdateNarration {
        correlation_id: Uuid::new_v4(),
        scene_id,
        text: request.text,
    };

    info!(correlation_id = %command.correlation_id, "handling update_narration command");

    let batch = command_handlers::handle_update_narration(&command, &state.registry)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ReactionsIssuedResponse {
            reacting: detach(batch),
        }),
    ))
}

/// POST /{scene_id}/characters/{character_id}/actions
#[instrument(skip(state, request), fields(action = %request.action))]
async fn trigger_action(
    State(state): State<AppState>,
    Path((scene_id, character_id)): Path<(Uuid, String)>,
    Json(request): Json<TriggerActionRequest>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let command = commands::TriggerAction {
        correlation_id: Uuid::new_v4(),
        scene_id,
        character_id: CharacterId::new(character_id),
        action: request.action,
    };

    info!(correlation_id = %command.correlation_id, "handling trigger_action command");

    let result = command_handlers::handle_trigger_action(&command, &state.registry).await?;
    Ok(Json(result.into()))
}

/// POST /{scene_id}/characters/{character_id}/options/select
#[instrument(skip(state, request))]
async fn select_option(
    State(state): State<AppState>,
    Path((scene_id, character_id)): Path<(Uuid, String)>,
    Json(request): Json<SelectOptionRequest>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let command = commands::SelectOption {
        correlation_id: Uuid::new_v4(),
        scene_id,
        character_id: CharacterId::new(character_id),
        option_index: request.option_index,
    };

    info!(correlation_id = %command.correlation_id, "handling select_option command");

    let outcome = command_handlers::handle_select_option(&command, &state.registry).await?;
    Ok(Json(outcome.into()))
}

/// POST /{scene_id}/characters/{character_id}/address
#[instrument(skip(state, request))]
async fn address_character(
    State(state): State<AppState>,
    Path((scene_id, character_id)): Path<(Uuid, String)>,
    Json(request): Json<AddressRequest>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let command = commands::AddressCharacter {
        correlation_id: Uuid::new_v4(),
        scene_id,
        character_id: CharacterId::new(character_id),
        speaker: request.speaker,
        text: request.text,
    };

    info!(correlation_id = %command.correlation_id, "handling address_character command");

    let outcome = command_handlers::handle_address_character(&command, &state.registry).await?;
    Ok(Json(outcome.into()))
}

/// Returns the router for the scene context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(start_scene))
        .route("/{scene_id}", get(get_scene).delete(end_scene))
        .route("/{scene_id}/narration", post(update_narration))
        .route(
            "/{scene_id}/characters/{character_id}/actions",
            post(trigger_action),
        )
        .route(
            "/{scene_id}/characters/{character_id}/options/select",
            post(select_option),
        )
        .route(
            "/{scene_id}/characters/{character_id}/address",
            post(address_character),
        )
}
