//! Dispatch sources, failures and outcomes.

use std::fmt;

use banter_core::generation::{ActionKind, GenerationError};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// What started a dispatch. At most one dispatch per source and character is
/// in flight at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DispatchSource {
    /// The character reacting to narration, a choice, or an addressed line.
    Reaction,
    /// A moderator action.
    Action(ActionKind),
}

impl fmt::Display for DispatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reaction => f.write_str("reaction"),
            Self::Action(kind) => write!(f, "{kind}"),
        }
    }
}

impl Serialize for DispatchSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Whether a dispatch source is free or busy for a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPhase {
    /// Accepts a new request.
    Idle,
    /// A request is in flight; new requests from the same source are refused.
    Dispatching,
}

/// Why a dispatch failed. Always recorded on the character's track.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Nothing on the track qualifies for a memory commit.
    #[error("no recent dialogue to submit to memory")]
    NoRecentDialogue,

    /// The generation service could not be reached.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The generation service answered with a failure.
    #[error("service error (status {status}): {message}")]
    ServiceError {
        /// Status reported by the service.
        status: u16,
        /// Error detail reported by the service.
        message: String,
    },

    /// The same source is already in flight for this character.
    #[error("{pending} is already in progress")]
    ReentrantActionRejected {
        /// The busy source.
        pending: DispatchSource,
    },

    /// The service replied with nothing usable.
    #[error("the generation service returned an empty line")]
    EmptyReply,
}

impl DispatchError {
    /// Machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoRecentDialogue => "no_recent_dialogue",
            Self::NetworkFailure(_) => "network_failure",
            Self::ServiceError { .. } => "service_error",
            Self::ReentrantActionRejected { .. } => "reentrant_action_rejected",
            Self::EmptyReply => "empty_reply",
        }
    }
}

impl From<GenerationError> for DispatchError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Network(message) => Self::NetworkFailure(message),
            GenerationError::Service { status, message } => Self::ServiceError { status, message },
        }
    }
}

/// Result of a moderator action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    /// The service acknowledged the action.
    Accepted {
        /// Summary recorded on the track.
        message: String,
        /// Options surfaced to the moderator, for actions that produce them.
        /// These are not appended to the track.
        options: Option<Vec<String>>,
    },
    /// The action failed; the reason is on the track as well.
    Failed {
        /// Why.
        reason: DispatchError,
    },
}

impl ActionResult {
    /// Returns `true` for [`ActionResult::Accepted`].
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Surfaced options, empty when there are none.
    #[must_use]
    pub fn options(&self) -> &[String] {
        match self {
            Self::Accepted {
                options: Some(options),
                ..
            } => options,
            _ => &[],
        }
    }
}

/// Result of a reaction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// The character said something; the line is on the track.
    Spoke {
        /// The appended line.
        line: String,
    },
    /// The reaction failed; the reason is on the track as well.
    Failed {
        /// Why.
        reason: DispatchError,
    },
}

impl ReactionOutcome {
    /// Returns `true` for [`ReactionOutcome::Spoke`].
    #[must_use]
    pub fn is_spoke(&self) -> bool {
        matches!(self, Self::Spoke { .. })
    }
}
