//! Fake generation services with scripted, failing and gated replies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use banter_core::character::CharacterId;
use banter_core::generation::{
    ActionKind, ActionReply, ActionRequest, GenerationError, GenerationService, ReactionReply,
    ReactionRequest,
};
use tokio::sync::{Notify, Semaphore};

/// A request observed by a fake generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    /// A `generate_reaction` call.
    Reaction(ReactionRequest),
    /// A `perform_action` call.
    Action(ActionRequest),
}

impl RecordedCall {
    /// The character the call was made for.
    #[must_use]
    pub fn character_id(&self) -> &CharacterId {
        match self {
            Self::Reaction(request) => &request.character_id,
            Self::Action(request) => &request.character_id,
        }
    }
}

/// A generation service with scripted replies that records every call.
///
/// Unless scripted otherwise, a reaction reply is
/// `"<name> reacts to: <latest event>"` and an action reply carries the
/// message `"<action> done"` and no options.
#[derive(Debug, Default)]
pub struct ScriptedGenerationService {
    lines: HashMap<CharacterId, String>,
    failures: HashMap<CharacterId, GenerationError>,
    action_replies: HashMap<ActionKind, ActionReply>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGenerationService {
    /// Create a service with default replies for everyone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Always reply to reactions of `character_id` with `line`.
    #[must_use]
    pub fn with_line(mut self, character_id: &str, line: impl Into<String>) -> Self {
        self.lines.insert(CharacterId::new(character_id), line.into());
        self
    }

    /// Fail every call made for `character_id`.
    #[must_use]
    pub fn failing_for(mut self, character_id: &str, error: GenerationError) -> Self {
        self.failures.insert(CharacterId::new(character_id), error);
        self
    }

    /// Reply to `action` with `reply`.
    #[must_use]
    pub fn with_action_reply(mut self, action: ActionKind, reply: ActionReply) -> Self {
        self.action_replies.insert(action, reply);
        self
    }

    /// Returns a snapshot of all recorded calls, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded calls made for one character.
    pub fn calls_for(&self, character_id: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.character_id().as_str() == character_id)
            .collect()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn reaction_reply(&self, request: &ReactionRequest) -> Result<ReactionReply, GenerationError> {
        if let Some(error) = self.failures.get(&request.character_id) {
            return Err(error.clone());
        }
        let line = self.lines.get(&request.character_id).cloned().unwrap_or_else(|| {
            format!(
                "{} reacts to: {}",
                request.character_name, request.latest_event
            )
        });
        Ok(ReactionReply { line })
    }

    fn action_reply(&self, request: &ActionRequest) -> Result<ActionReply, GenerationError> {
        if let Some(error) = self.failures.get(&request.character_id) {
            return Err(error.clone());
        }
        Ok(self
            .action_replies
            .get(&request.action)
            .cloned()
            .unwrap_or_else(|| ActionReply {
                message: format!("{} done", request.action),
                options: None,
            }))
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerationService {
    async fn generate_reaction(
        &self,
        request: &ReactionRequest,
    ) -> Result<ReactionReply, GenerationError> {
        self.record(RecordedCall::Reaction(request.clone()));
        self.reaction_reply(request)
    }

    async fn perform_action(&self, request: &ActionRequest) -> Result<ActionReply, GenerationError> {
        self.record(RecordedCall::Action(request.clone()));
        self.action_reply(request)
    }
}

/// A generation service that always fails with a network error.
#[derive(Debug)]
pub struct FailingGenerationService;

#[async_trait]
impl GenerationService for FailingGenerationService {
    async fn generate_reaction(
        &self,
        _request: &ReactionRequest,
    ) -> Result<ReactionReply, GenerationError> {
        Err(GenerationError::Network("connection refused".into()))
    }

    async fn perform_action(&self, _request: &ActionRequest) -> Result<ActionReply, GenerationError> {
        Err(GenerationError::Network("connection refused".into()))
    }
}

/// A scripted generation service that holds every call until the test
/// releases it. Used to observe behaviour while a call is in flight.
#[derive(Debug)]
pub struct GatedGenerationService {
    inner: ScriptedGenerationService,
    gate: Semaphore,
    entered: Notify,
}

impl GatedGenerationService {
    /// Wrap `inner`; no call completes until [`release`](Self::release).
    #[must_use]
    pub fn new(inner: ScriptedGenerationService) -> Self {
        Self {
            inner,
            gate: Semaphore::new(0),
            entered: Notify::new(),
        }
    }

    /// Let `count` held calls complete.
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    /// Resolves once a call has reached the service.
    pub async fn wait_until_entered(&self) {
        self.entered.notified().await;
    }

    /// Returns a snapshot of all recorded calls, in call order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.calls()
    }

    async fn hold(&self) {
        self.entered.notify_one();
        self.gate
            .acquire()
            .await
            .expect("gate semaphore is never closed")
            .forget();
    }
}

#[async_trait]
impl GenerationService for GatedGenerationService {
    async fn generate_reaction(
        &self,
        request: &ReactionRequest,
    ) -> Result<ReactionReply, GenerationError> {
        self.inner.record(RecordedCall::Reaction(request.clone()));
        self.hold().await;
        self.inner.reaction_reply(request)
    }

    async fn perform_action(&self, request: &ActionRequest) -> Result<ActionReply, GenerationError> {
        self.inner.record(RecordedCall::Action(request.clone()));
        self.hold().await;
        self.inner.action_reply(request)
    }
}
