//! Per-character action dispatch.
//!
//! An [`ActionDispatcher`] sends a character's requests to the generation
//! service and routes the replies onto that character's track. It refuses a
//! second request from a source that is already in flight for the character,
//! while requests from other sources proceed independently. Every failure is
//! recorded as a `system_error` entry on the track and returned as a value;
//! nothing here is retried.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use banter_conversation::domain::entry::NewEntry;
use banter_conversation::domain::exchange::extract_exchange;
use banter_conversation::domain::track::ConversationTrack;
use banter_core::character::Character;
use banter_core::clock::Clock;
use banter_core::error::DomainError;
use banter_core::generation::{
    ActionKind, ActionPayload, ActionReply, ActionRequest, GenerationService, HistoryLine,
    ReactionRequest,
};
use tracing::{info, instrument, warn};

use super::context::SceneContext;
use super::outcome::{ActionResult, DispatchError, DispatchPhase, DispatchSource, ReactionOutcome};

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a source as in flight until dropped. Owned, so a reaction reserved
/// when it is issued can be carried into the task that later sends it.
#[derive(Debug)]
pub(crate) struct DispatchPermit {
    in_flight: Arc<Mutex<HashSet<DispatchSource>>>,
    source: DispatchSource,
}

impl Drop for DispatchPermit {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.source);
    }
}

/// The dispatch state machine of one character in one scene.
pub struct ActionDispatcher {
    character: Character,
    generator: Arc<dyn GenerationService>,
    clock: Arc<dyn Clock>,
    history_window: usize,
    in_flight: Arc<Mutex<HashSet<DispatchSource>>>,
    offered_options: Mutex<Vec<String>>,
}

impl fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("character", &self.character)
            .field("history_window", &self.history_window)
            .field("in_flight", &self.in_flight)
            .field("offered_options", &self.offered_options)
            .finish_non_exhaustive()
    }
}

impl ActionDispatcher {
    /// Creates an idle dispatcher for `character`.
    #[must_use]
    pub fn new(
        character: Character,
        generator: Arc<dyn GenerationService>,
        clock: Arc<dyn Clock>,
        history_window: usize,
    ) -> Self {
        Self {
            character,
            generator,
            clock,
            history_window,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            offered_options: Mutex::new(Vec::new()),
        }
    }

    /// The character this dispatcher acts for.
    #[must_use]
    pub fn character(&self) -> &Character {
        &self.character
    }

    /// Whether `source` is currently in flight.
    #[must_use]
    pub fn phase(&self, source: DispatchSource) -> DispatchPhase {
        if lock(&self.in_flight).contains(&source) {
            DispatchPhase::Dispatching
        } else {
            DispatchPhase::Idle
        }
    }

    /// All sources currently in flight, sorted.
    #[must_use]
    pub fn in_flight(&self) -> Vec<DispatchSource> {
        let mut sources: Vec<DispatchSource> = lock(&self.in_flight).iter().copied().collect();
        sources.sort_unstable();
        sources
    }

    /// Options surfaced by the last topic or top-5 action.
    #[must_use]
    pub fn offered_options(&self) -> Vec<String> {
        lock(&self.offered_options).clone()
    }

    /// Sends a moderator action and records the result on `track`.
    #[instrument(
        skip(self, track, context, action),
        fields(character_id = %self.character.id, action = %action)
    )]
    pub async fn dispatch_action(
        &self,
        track: &Mutex<ConversationTrack>,
        context: &SceneContext,
        action: ActionKind,
    ) -> ActionResult {
        let _permit = match self.begin(DispatchSource::Action(action)) {
            Ok(permit) => permit,
            Err(reason) => {
                warn!(%reason, "rejecting action already in flight");
                self.record(
                    track,
                    NewEntry::error(format!("Error with action '{action}': {reason}")),
                );
                return ActionResult::Failed { reason };
            }
        };

        self.record(
            track,
            NewEntry::action_note(format!(
                "Moderator triggered: {action} for {}",
                self.character.name
            )),
        );

        let mut committed_sequences = None;
        let payload = match action {
            ActionKind::SubmitMemory => {
                let exchange = extract_exchange(&lock(track));
                let Some(exchange) = exchange else {
                    warn!("no recent dialogue to commit");
                    self.record(
                        track,
                        NewEntry::error(format!(
                            "No recent dialogue to submit to memory for {}.",
                            self.character.name
                        )),
                    );
                    return ActionResult::Failed {
                        reason: DispatchError::NoRecentDialogue,
                    };
                };
                committed_sequences = Some(exchange.sequences());
                ActionPayload::memory(exchange.to_dialogue(), context.narration_text().to_owned())
            }
            ActionKind::ShowTree => {
                let message = "The conversation tree view is not available yet.".to_owned();
                self.record(track, NewEntry::info(message.clone()));
                return ActionResult::Accepted {
                    message,
                    options: None,
                };
            }
            _ => ActionPayload::default(),
        };

        let request = ActionRequest {
            character_id: self.character.id.clone(),
            action,
            payload,
            scene_narration: context.narration_text().to_owned(),
            history: self.history(track),
        };

        info!("dispatching action");
        match self.generator.perform_action(&request).await {
            Ok(reply) => self.accept_action(track, action, reply, committed_sequences),
            Err(err) => {
                let reason = DispatchError::from(err);
                warn!(%reason, "action failed");
                self.record(
                    track,
                    NewEntry::error(format!("Error with action '{action}': {reason}")),
                );
                ActionResult::Failed { reason }
            }
        }
    }

    /// Asks the character to react to `latest_event` and records the line.
    pub async fn dispatch_reaction(
        &self,
        track: &Mutex<ConversationTrack>,
        context: &SceneContext,
        latest_event: &str,
    ) -> ReactionOutcome {
        match self.reserve_reaction() {
            Ok(permit) => self.react(permit, track, context, latest_event).await,
            Err(reason) => self.reject_reaction(track, reason),
        }
    }

    /// Marks a reaction as in flight ahead of sending it. The reaction that
    /// holds the permit wins; later requests are rejected until it resolves.
    pub(crate) fn reserve_reaction(&self) -> Result<DispatchPermit, DispatchError> {
        self.begin(DispatchSource::Reaction)
    }

    /// Picks one of the offered options. The choice is recorded and the
    /// character reacts to it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if no option with that index was
    /// offered.
    #[instrument(skip(self, track, context), fields(character_id = %self.character.id))]
    pub async fn select_option(
        &self,
        track: &Mutex<ConversationTrack>,
        context: &SceneContext,
        option_index: usize,
    ) -> Result<ReactionOutcome, DomainError> {
        let option = lock(&self.offered_options).get(option_index).cloned();
        let Some(option) = option else {
            return Err(DomainError::Validation(format!(
                "option {option_index} was not offered to {}",
                self.character.name
            )));
        };

        let permit = match self.reserve_reaction() {
            Ok(permit) => permit,
            Err(reason) => return Ok(self.reject_reaction(track, reason)),
        };

        lock(&self.offered_options).clear();
        self.record(track, NewEntry::moderator_choice(&option));
        Ok(self.react(permit, track, context, &option).await)
    }

    /// Records a line addressed to the character and asks it to react.
    #[instrument(skip(self, track, context, text), fields(character_id = %self.character.id))]
    pub async fn address(
        &self,
        track: &Mutex<ConversationTrack>,
        context: &SceneContext,
        speaker: &str,
        text: &str,
    ) -> ReactionOutcome {
        let permit = match self.reserve_reaction() {
            Ok(permit) => permit,
            Err(reason) => return self.reject_reaction(track, reason),
        };

        self.record(track, NewEntry::narration(speaker, text));
        self.react(permit, track, context, text).await
    }

    fn begin(&self, source: DispatchSource) -> Result<DispatchPermit, DispatchError> {
        if !lock(&self.in_flight).insert(source) {
            return Err(DispatchError::ReentrantActionRejected { pending: source });
        }
        Ok(DispatchPermit {
            in_flight: Arc::clone(&self.in_flight),
            source,
        })
    }

    /// Sends a reaction already reserved with [`Self::reserve_reaction`].
    #[instrument(skip_all, fields(character_id = %self.character.id))]
    pub(crate) async fn react(
        &self,
        _permit: DispatchPermit,
        track: &Mutex<ConversationTrack>,
        context: &SceneContext,
        latest_event: &str,
    ) -> ReactionOutcome {
        let request = ReactionRequest {
            character_id: self.character.id.clone(),
            character_name: self.character.name.clone(),
            scene_narration: context.narration_text().to_owned(),
            latest_event: latest_event.to_owned(),
            history: self.history(track),
            present_player_characters: context
                .present_player_character_names()
                .iter()
                .cloned()
                .collect(),
        };

        info!("requesting reaction");
        let reason = match self.generator.generate_reaction(&request).await {
            Ok(reply) => match tidy_line(&self.character.name, &reply.line) {
                Some(line) => {
                    self.record(
                        track,
                        NewEntry::character_line(self.character.name.clone(), line.clone()),
                    );
                    return ReactionOutcome::Spoke { line };
                }
                None => DispatchError::EmptyReply,
            },
            Err(err) => DispatchError::from(err),
        };

        warn!(%reason, "reaction failed");
        self.record(
            track,
            NewEntry::error(format!("Error for {}: {reason}", self.character.name)),
        );
        ReactionOutcome::Failed { reason }
    }

    pub(crate) fn reject_reaction(
        &self,
        track: &Mutex<ConversationTrack>,
        reason: DispatchError,
    ) -> ReactionOutcome {
        warn!(%reason, "rejecting reaction already in flight");
        self.record(
            track,
            NewEntry::error(format!("Error for {}: {reason}", self.character.name)),
        );
        ReactionOutcome::Failed { reason }
    }

    fn accept_action(
        &self,
        track: &Mutex<ConversationTrack>,
        action: ActionKind,
        reply: ActionReply,
        committed_sequences: Option<Vec<u64>>,
    ) -> ActionResult {
        let message = if reply.message.trim().is_empty() {
            format!("Action '{action}' for {} processed.", self.character.name)
        } else {
            reply.message
        };

        let options = action
            .surfaces_options()
            .then(|| reply.options.unwrap_or_default());

        {
            let mut track = lock(track);
            let clock = self.clock.as_ref();
            track.append(NewEntry::success(message.clone()), clock);

            match action {
                ActionKind::SubmitMemory => {
                    if let Some(sequences) = committed_sequences {
                        track.mark_committed(sequences);
                    }
                }
                ActionKind::UndoMemory => {
                    track.revert_last_commit();
                }
                _ => {}
            }

            match &options {
                Some(list) if list.is_empty() => {
                    let note = if action.yields_topics() {
                        "No new topics were generated."
                    } else {
                        "No dialogue options were generated."
                    };
                    track.append(NewEntry::info(note), clock);
                }
                Some(list) if action.yields_topics() => {
                    track.append(
                        NewEntry::info(format!("Suggested Topics:\n- {}", list.join("\n- "))),
                        clock,
                    );
                }
                _ => {}
            }
        }

        if let Some(list) = &options {
            lock(&self.offered_options).clone_from(list);
        }

        info!("action accepted");
        ActionResult::Accepted { message, options }
    }

    fn history(&self, track: &Mutex<ConversationTrack>) -> Vec<HistoryLine> {
        lock(track).history(self.history_window)
    }

    fn record(&self, track: &Mutex<ConversationTrack>, entry: NewEntry) {
        lock(track).append(entry, self.clock.as_ref());
    }
}

/// Cleans up a generated line: trims it, drops a leading `"<speaker>:"` and
/// one pair of surrounding quotes. Returns `None` if nothing is left.
fn tidy_line(speaker: &str, raw: &str) -> Option<String> {
    let mut line = raw.trim();

    if let Some(prefix) = line.get(..speaker.len()) {
        let rest = &line[speaker.len()..];
        if !speaker.is_empty() && prefix.eq_ignore_ascii_case(speaker) && rest.starts_with(':') {
            line = rest[1..].trim_start();
        }
    }

    for quote in ['"', '\''] {
        if line.len() >= 2 && line.starts_with(quote) && line.ends_with(quote) {
            line = &line[1..line.len() - 1];
            break;
        }
    }

    let line = line.trim();
    (!line.is_empty()).then(|| line.to_owned())
}
