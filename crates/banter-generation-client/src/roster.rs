//! Character roster client over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use banter_core::character::{Character, CharacterRoster};
use banter_core::error::DomainError;
use tracing::{debug, instrument};

use crate::wire::{ErrorBody, RosterRecord};
use crate::{ROSTER_PATH, endpoint};

/// [`CharacterRoster`] read from the game server.
#[derive(Debug, Clone)]
pub struct HttpCharacterRoster {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCharacterRoster {
    /// Creates a roster client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a roster client that reuses an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CharacterRoster for HttpCharacterRoster {
    #[instrument(skip(self))]
    async fn list_characters(&self) -> Result<Vec<Character>, DomainError> {
        let response = self
            .client
            .get(endpoint(&self.base_url, ROSTER_PATH))
            .send()
            .await
            .map_err(|e| DomainError::Infrastructure(format!("roster unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(DomainError::Infrastructure(format!(
                "roster request failed ({status}): {}",
                ErrorBody::describe(&raw)
            )));
        }

        let records: Vec<RosterRecord> = response
            .json()
            .await
            .map_err(|e| DomainError::Infrastructure(format!("malformed roster: {e}")))?;
        debug!(count = records.len(), "roster loaded");
        Ok(records.into_iter().map(Character::from).collect())
    }
}
