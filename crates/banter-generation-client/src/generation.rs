//! Generation service client over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use banter_core::generation::{
    ActionReply, ActionRequest, GenerationError, GenerationService, ReactionReply, ReactionRequest,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::wire::{ErrorBody, GenerateLineBody, GenerateLineResponse, NpcActionBody, NpcActionResponse};
use crate::{ACTION_PATH, REACTION_PATH, endpoint};

/// [`GenerationService`] backed by the game server's dialogue routes.
#[derive(Debug, Clone)]
pub struct HttpGenerationService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGenerationService {
    /// Creates a client for the service at `base_url`. Every request is
    /// abandoned after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a client that reuses an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, GenerationError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(endpoint(&self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = ErrorBody::describe(&raw);
            warn!(status = status.as_u16(), %message, "generation service refused request");
            return Err(GenerationError::Service {
                status: status.as_u16(),
                message: if message.is_empty() {
                    status.to_string()
                } else {
                    message
                },
            });
        }

        response.json().await.map_err(|e| GenerationError::Service {
            status: status.as_u16(),
            message: format!("malformed response: {e}"),
        })
    }
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    #[instrument(skip(self, request), fields(character_id = %request.character_id))]
    async fn generate_reaction(
        &self,
        request: &ReactionRequest,
    ) -> Result<ReactionReply, GenerationError> {
        debug!(history = request.history.len(), "requesting character line");
        let response: GenerateLineResponse = self
            .post(REACTION_PATH, &GenerateLineBody::from(request))
            .await?;
        Ok(ReactionReply {
            line: response.dialogue_text.unwrap_or_default(),
        })
    }

    #[instrument(skip(self, request), fields(character_id = %request.character_id, action = %request.action))]
    async fn perform_action(&self, request: &ActionRequest) -> Result<ActionReply, GenerationError> {
        debug!(history = request.history.len(), "performing action");
        let response: NpcActionResponse = self
            .post(ACTION_PATH, &NpcActionBody::from(request))
            .await?;
        Ok(response.into_reply(request.action))
    }
}
