//! Server configuration from the environment.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use banter_scene::domain::session::{SceneConfig, StaggerPolicy};

use crate::error::AppError;

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Base URL of the game server hosting the generation service and roster.
    pub generation_service_url: String,
    /// Per-request timeout towards the game server.
    pub generation_timeout: Duration,
    /// Scene tunables.
    pub scene: SceneConfig,
}

impl ApiConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is missing or malformed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `GENERATION_SERVICE_URL` is missing or a
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let generation_service_url = lookup("GENERATION_SERVICE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("GENERATION_SERVICE_URL environment variable must be set".into())
            })?;

        let history_window: usize = parse_or(&lookup, "HISTORY_WINDOW", 10)?;
        if history_window == 0 {
            return Err(AppError::Config("HISTORY_WINDOW must be at least 1".into()));
        }

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: parse_or(&lookup, "PORT", 3000)?,
            generation_service_url,
            generation_timeout: Duration::from_secs(parse_or(&lookup, "GENERATION_TIMEOUT_SECS", 60)?),
            scene: SceneConfig {
                history_window,
                stagger: StaggerPolicy {
                    base: Duration::from_millis(parse_or(&lookup, "STAGGER_BASE_MS", 400)?),
                    step: Duration::from_millis(parse_or(&lookup, "STAGGER_STEP_MS", 700)?),
                },
            },
        })
    }

    /// The address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if host and port do not form an address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse_or<T>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        None => Ok(default),
    }
}
