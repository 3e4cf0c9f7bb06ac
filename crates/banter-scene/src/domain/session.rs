//! Scene sessions.
//!
//! A [`SceneSession`] owns the shared [`SceneContext`] and, for each
//! participating character, a conversation track and its dispatcher.
//! Reactions to narration fan out as one task per character so that a slow
//! or failing character never holds up the others.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use banter_conversation::domain::entry::{MODERATOR_SPEAKER, NewEntry};
use banter_conversation::domain::track::{ConversationTrack, DEFAULT_HISTORY_WINDOW};
use banter_core::character::{Character, CharacterId};
use banter_core::clock::Clock;
use banter_core::error::DomainError;
use banter_core::generation::{ActionKind, GenerationService};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::context::SceneContext;
use super::dispatcher::{ActionDispatcher, DispatchPermit, lock};
use super::outcome::{ActionResult, DispatchError, ReactionOutcome};

/// Delay before the first staggered reaction.
pub const DEFAULT_STAGGER_BASE: Duration = Duration::from_millis(400);

/// Extra delay for each further staggered reaction.
pub const DEFAULT_STAGGER_STEP: Duration = Duration::from_millis(700);

/// Spacing of the reactions issued when a scene starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaggerPolicy {
    /// Delay of the first reaction.
    pub base: Duration,
    /// Added per position in the cast.
    pub step: Duration,
}

impl StaggerPolicy {
    /// Issue every reaction at once.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            base: Duration::ZERO,
            step: Duration::ZERO,
        }
    }

    /// Delay for the reaction at position `index`.
    #[must_use]
    pub fn delay_for(&self, index: usize) -> Duration {
        let steps = u32::try_from(index).unwrap_or(u32::MAX);
        self.base.saturating_add(self.step.saturating_mul(steps))
    }
}

impl Default for StaggerPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_STAGGER_BASE,
            step: DEFAULT_STAGGER_STEP,
        }
    }
}

/// Tunables of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneConfig {
    /// How many recent entries are sent as history.
    pub history_window: usize,
    /// Spacing of the opening reactions.
    pub stagger: StaggerPolicy,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            stagger: StaggerPolicy::default(),
        }
    }
}

/// Collaborators shared by every scene.
#[derive(Clone)]
pub struct SceneServices {
    /// Produces character lines and performs actions.
    pub generator: Arc<dyn GenerationService>,
    /// Timestamps track entries.
    pub clock: Arc<dyn Clock>,
    /// Scene tunables.
    pub config: SceneConfig,
}

impl fmt::Debug for SceneServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneServices")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Who takes part in a scene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneCast {
    /// Characters that get a track and react.
    pub npcs: Vec<Character>,
    /// Player characters. Present, but voiced by people.
    pub player_characters: Vec<Character>,
}

impl SceneCast {
    /// Picks the characters named in `selected` out of `roster`, keeping roster
    /// order. Duplicate ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if an id is not on the roster.
    pub fn select(roster: Vec<Character>, selected: &[CharacterId]) -> Result<Self, DomainError> {
        let wanted: BTreeSet<&CharacterId> = selected.iter().collect();
        let unknown: Vec<&str> = wanted
            .iter()
            .filter(|id| !roster.iter().any(|character| &&character.id == *id))
            .map(|id| id.as_str())
            .collect();
        if !unknown.is_empty() {
            return Err(DomainError::Validation(format!(
                "unknown characters: {}",
                unknown.join(", ")
            )));
        }

        let (player_characters, npcs) = roster
            .into_iter()
            .filter(|character| wanted.contains(&character.id))
            .partition(Character::is_player_character);
        Ok(Self {
            npcs,
            player_characters,
        })
    }
}

struct Participant {
    track: Mutex<ConversationTrack>,
    dispatcher: ActionDispatcher,
}

/// One running scene.
pub struct SceneSession {
    id: Uuid,
    context: RwLock<Arc<SceneContext>>,
    cast_order: Vec<CharacterId>,
    participants: BTreeMap<CharacterId, Participant>,
    player_characters: Vec<Character>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SceneSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneSession")
            .field("id", &self.id)
            .field("cast_order", &self.cast_order)
            .finish_non_exhaustive()
    }
}

impl SceneSession {
    /// Starts a scene: seeds every NPC's track with the narration and asks
    /// each of them to react, staggered by cast position.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the narration is blank or the cast
    /// has no NPC.
    pub fn start(
        id: Uuid,
        narration: &str,
        cast: SceneCast,
        services: &SceneServices,
    ) -> Result<(Arc<Self>, ReactionBatch), DomainError> {
        let narration = narration.trim();
        if narration.is_empty() {
            return Err(DomainError::Validation("narration must not be empty".into()));
        }
        if cast.npcs.is_empty() {
            return Err(DomainError::Validation(
                "a scene needs at least one NPC".into(),
            ));
        }

        let context = SceneContext::new(
            narration,
            cast.npcs.iter().map(|npc| npc.id.clone()),
            cast.player_characters.iter().map(|pc| pc.name.clone()),
        );

        let cast_order: Vec<CharacterId> = cast.npcs.iter().map(|npc| npc.id.clone()).collect();
        let participants = cast
            .npcs
            .into_iter()
            .map(|npc| {
                let mut track = ConversationTrack::new(npc.id.clone());
                track.append(NewEntry::info(narration), services.clock.as_ref());
                let dispatcher = ActionDispatcher::new(
                    npc.clone(),
                    Arc::clone(&services.generator),
                    Arc::clone(&services.clock),
                    services.config.history_window,
                );
                (
                    npc.id,
                    Participant {
                        track: Mutex::new(track),
                        dispatcher,
                    },
                )
            })
            .collect();

        let session = Arc::new(Self {
            id,
            context: RwLock::new(Arc::new(context)),
            cast_order,
            participants,
            player_characters: cast.player_characters,
            clock: Arc::clone(&services.clock),
        });

        info!(
            scene_id = %id,
            participants = session.cast_order.len(),
            "scene started"
        );
        let batch = session.fan_out(narration, services.config.stagger);
        Ok((session, batch))
    }

    /// The scene identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The current context.
    #[must_use]
    pub fn context(&self) -> Arc<SceneContext> {
        Arc::clone(&self.context.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Participating characters in cast order.
    pub fn participants(&self) -> impl Iterator<Item = &Character> {
        self.cast_order
            .iter()
            .filter_map(|id| self.participants.get(id))
            .map(|participant| participant.dispatcher.character())
    }

    /// Player characters present in the scene.
    #[must_use]
    pub fn player_characters(&self) -> &[Character] {
        &self.player_characters
    }

    /// A copy of one character's track.
    #[must_use]
    pub fn track_snapshot(&self, character_id: &CharacterId) -> Option<ConversationTrack> {
        self.participants
            .get(character_id)
            .map(|participant| lock(&participant.track).clone())
    }

    /// One character's dispatcher.
    #[must_use]
    pub fn dispatcher(&self, character_id: &CharacterId) -> Option<&ActionDispatcher> {
        self.participants
            .get(character_id)
            .map(|participant| &participant.dispatcher)
    }

    /// Appends `text` to the narration, notes it on every track and asks every
    /// character to react to it.
    ///
    /// Reactions already in flight keep the context they were issued with.
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `text` is blank.
    pub fn submit_narration_update(self: &Arc<Self>, text: &str) -> Result<ReactionBatch, DomainError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::Validation("narration must not be empty".into()));
        }

        {
            let mut current = self.context.write().unwrap_or_else(PoisonError::into_inner);
            let next = current.with_narration_appended(text);
            *current = Arc::new(next);
        }

        for participant in self.participants.values() {
            lock(&participant.track).append(
                NewEntry::info(format!("Narration: {text}")),
                self.clock.as_ref(),
            );
        }

        info!(scene_id = %self.id, "narration updated");
        Ok(self.fan_out(text, StaggerPolicy::none()))
    }

    /// Runs a moderator action for one character.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::CharacterNotInScene` if the character does not
    /// take part. Dispatch failures are reported in the [`ActionResult`].
    pub async fn trigger_action(
        &self,
        character_id: &CharacterId,
        action: ActionKind,
    ) -> Result<ActionResult, DomainError> {
        let participant = self.participant(character_id)?;
        let context = self.context();
        Ok(participant
            .dispatcher
            .dispatch_action(&participant.track, &context, action)
            .await)
    }

    /// Picks an offered option for one character.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::CharacterNotInScene` for unknown characters and
    /// `DomainError::Validation` if the option was not offered.
    pub async fn select_option(
        &self,
        character_id: &CharacterId,
        option_index: usize,
    ) -> Result<ReactionOutcome, DomainError> {
        let participant = self.participant(character_id)?;
        let context = self.context();
        participant
            .dispatcher
            .select_option(&participant.track, &context, option_index)
            .await
    }

    /// Addresses a line to one character, who reacts to it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::CharacterNotInScene` for unknown characters and
    /// `DomainError::Validation` if `text` is blank.
    pub async fn address_character(
        &self,
        character_id: &CharacterId,
        speaker: Option<&str>,
        text: &str,
    ) -> Result<ReactionOutcome, DomainError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::Validation("line must not be empty".into()));
        }
        let participant = self.participant(character_id)?;
        let speaker = speaker
            .map(str::trim)
            .filter(|speaker| !speaker.is_empty())
            .unwrap_or(MODERATOR_SPEAKER);
        let context = self.context();
        Ok(participant
            .dispatcher
            .address(&participant.track, &context, speaker, text)
            .await)
    }

    fn participant(&self, character_id: &CharacterId) -> Result<&Participant, DomainError> {
        self.participants
            .get(character_id)
            .ok_or_else(|| DomainError::CharacterNotInScene {
                scene_id: self.id,
                character_id: character_id.clone(),
            })
    }

    async fn react(
        &self,
        character_id: &CharacterId,
        context: &SceneContext,
        latest_event: &str,
        reservation: Result<DispatchPermit, DispatchError>,
        delay: Duration,
    ) -> Result<ReactionOutcome, DomainError> {
        let participant = self.participant(character_id)?;
        let permit = match reservation {
            Ok(permit) => permit,
            Err(reason) => {
                return Ok(participant
                    .dispatcher
                    .reject_reaction(&participant.track, reason));
            }
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(participant
            .dispatcher
            .react(permit, &participant.track, context, latest_event)
            .await)
    }

    /// Issues one reaction per character. Each reaction is reserved before
    /// its stagger delay, so a later request for the same character is the
    /// one rejected.
    fn fan_out(self: &Arc<Self>, latest_event: &str, stagger: StaggerPolicy) -> ReactionBatch {
        let context = self.context();
        let pending = self
            .cast_order
            .iter()
            .enumerate()
            .map(|(index, character_id)| {
                let reservation = self
                    .participant(character_id)
                    .map(|participant| participant.dispatcher.reserve_reaction());
                let session = Arc::clone(self);
                let context = Arc::clone(&context);
                let task_character_id = character_id.clone();
                let latest_event = latest_event.to_owned();
                let delay = stagger.delay_for(index);
                let handle = tokio::spawn(async move {
                    session
                        .react(&task_character_id, &context, &latest_event, reservation?, delay)
                        .await
                });
                (character_id.clone(), handle)
            })
            .collect();
        ReactionBatch { pending }
    }
}

/// Reactions issued together. Dropping the batch lets them finish detached.
#[derive(Debug, Default)]
pub struct ReactionBatch {
    pending: Vec<(CharacterId, JoinHandle<Result<ReactionOutcome, DomainError>>)>,
}

impl ReactionBatch {
    /// Characters asked to react.
    #[must_use]
    pub fn character_ids(&self) -> Vec<CharacterId> {
        self.pending.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Number of reactions issued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no reaction was issued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Waits for every reaction and returns the outcomes in cast order.
    pub async fn wait(self) -> Vec<(CharacterId, ReactionOutcome)> {
        let mut outcomes = Vec::with_capacity(self.pending.len());
        for (character_id, handle) in self.pending {
            match handle.await {
                Ok(Ok(outcome)) => outcomes.push((character_id, outcome)),
                Ok(Err(err)) => {
                    warn!(%character_id, error = %err, "reaction was not dispatched");
                }
                Err(err) => {
                    error!(%character_id, error = %err, "reaction task did not complete");
                }
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banter_conversation::domain::entry::{ConversationEntry, EntryKind};
    use banter_core::character::CharacterRole;
    use banter_core::generation::GenerationError;
    use banter_test_support::{
        FixedClock, GatedGenerationService, RecordedCall, ScriptedGenerationService,
    };

    use crate::domain::outcome::{DispatchPhase, DispatchSource};
    use chrono::{TimeZone, Utc};

    fn services(generator: Arc<dyn GenerationService>) -> SceneServices {
        SceneServices {
            generator,
            clock: Arc::new(FixedClock(
                Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            )),
            config: SceneConfig {
                history_window: DEFAULT_HISTORY_WINDOW,
                stagger: StaggerPolicy::none(),
            },
        }
    }

    fn roster() -> Vec<Character> {
        vec![
            Character::new("grog", "Grog", CharacterRole::Npc),
            Character::new("ayla", "Ayla", CharacterRole::Pc),
            Character::new("mira", "Mira", CharacterRole::Npc),
        ]
    }

    fn ids(raw: &[&str]) -> Vec<CharacterId> {
        raw.iter().copied().map(CharacterId::new).collect()
    }

    #[test]
    fn test_default_stagger_spaces_reactions() {
        let stagger = StaggerPolicy::default();
        assert_eq!(stagger.delay_for(0), Duration::from_millis(400));
        assert_eq!(stagger.delay_for(1), Duration::from_millis(1100));
        assert_eq!(stagger.delay_for(2), Duration::from_millis(1800));
        assert_eq!(StaggerPolicy::none().delay_for(5), Duration::ZERO);
    }

    #[test]
    fn test_cast_splits_npcs_from_player_characters() {
        let cast = SceneCast::select(roster(), &ids(&["mira", "ayla", "grog", "grog"])).unwrap();

        let npc_ids: Vec<&str> = cast.npcs.iter().map(|npc| npc.id.as_str()).collect();
        assert_eq!(npc_ids, vec!["grog", "mira"]);
        assert_eq!(cast.player_characters.len(), 1);
        assert_eq!(cast.player_characters[0].name, "Ayla");
    }

    #[test]
    fn test_cast_rejects_unknown_ids() {
        let result = SceneCast::select(roster(), &ids(&["grog", "nobody"]));

        assert!(matches!(
            result,
            Err(DomainError::Validation(message)) if message.contains("nobody")
        ));
    }

    #[tokio::test]
    async fn test_start_rejects_blank_narration_and_empty_cast() {
        let services = services(Arc::new(ScriptedGenerationService::new()));
        let cast = SceneCast::select(roster(), &ids(&["grog"])).unwrap();
        let pcs_only = SceneCast::select(roster(), &ids(&["ayla"])).unwrap();

        assert!(matches!(
            SceneSession::start(Uuid::new_v4(), "   ", cast, &services),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            SceneSession::start(Uuid::new_v4(), "Rain.", pcs_only, &services),
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_start_seeds_tracks_and_records_present_player_characters() {
        // Arrange
        let generator = Arc::new(ScriptedGenerationService::new());
        let cast = SceneCast::select(roster(), &ids(&["grog", "mira", "ayla"])).unwrap();

        // Act
        let (session, batch) =
            SceneSession::start(Uuid::new_v4(), "A stranger enters.", cast, &services(generator.clone()))
                .unwrap();
        let outcomes = batch.wait().await;

        // Assert
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|(_, outcome)| outcome.is_spoke()));
        let track = session.track_snapshot(&CharacterId::new("grog")).unwrap();
        assert_eq!(track.entries()[0].kind(), EntryKind::SystemInfo);
        assert_eq!(track.entries()[0].text(), "A stranger enters.");
        assert_eq!(track.entries()[1].kind(), EntryKind::CharacterLine);
        assert!(session.track_snapshot(&CharacterId::new("ayla")).is_none());
        assert!(session.context().present_player_character_names().contains("Ayla"));
        assert_eq!(generator.calls_for("ayla").len(), 0);
    }

    #[tokio::test]
    async fn test_narration_update_accumulates_and_reaches_every_track() {
        // Arrange
        let generator = Arc::new(ScriptedGenerationService::new());
        let cast = SceneCast::select(roster(), &ids(&["grog", "mira"])).unwrap();
        let (session, batch) =
            SceneSession::start(Uuid::new_v4(), "A stranger enters.", cast, &services(generator.clone()))
                .unwrap();
        batch.wait().await;

        // Act
        let outcomes = session
            .submit_narration_update("The lights go out.")
            .unwrap()
            .wait()
            .await;

        // Assert
        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            session.context().narration_text(),
            "A stranger enters.\n\nThe lights go out."
        );
        for id in ["grog", "mira"] {
            let track = session.track_snapshot(&CharacterId::new(id)).unwrap();
            let texts: Vec<&str> = track.entries().iter().map(|entry| entry.text()).collect();
            assert!(texts.contains(&"Narration: The lights go out."));
            assert_eq!(track.len(), 4);
        }
        assert_eq!(generator.calls_for("grog").len(), 2);
    }

    #[tokio::test]
    async fn test_action_for_character_outside_scene_is_rejected() {
        let cast = SceneCast::select(roster(), &ids(&["grog"])).unwrap();
        let (session, _batch) = SceneSession::start(
            Uuid::new_v4(),
            "Rain.",
            cast,
            &services(Arc::new(ScriptedGenerationService::new())),
        )
        .unwrap();

        let result = session
            .trigger_action(&CharacterId::new("mira"), ActionKind::NextTopic)
            .await;

        assert!(matches!(
            result,
            Err(DomainError::CharacterNotInScene { character_id, .. }) if character_id.as_str() == "mira"
        ));
    }

    #[tokio::test]
    async fn test_one_failing_character_does_not_affect_the_others() {
        let generator = Arc::new(
            ScriptedGenerationService::new()
                .failing_for("grog", GenerationError::Network("reset".into())),
        );
        let cast = SceneCast::select(roster(), &ids(&["grog", "mira"])).unwrap();

        let (session, batch) =
            SceneSession::start(Uuid::new_v4(), "Rain.", cast, &services(generator)).unwrap();
        let outcomes = batch.wait().await;

        assert!(!outcomes[0].1.is_spoke());
        assert!(outcomes[1].1.is_spoke());
        let mira = session.track_snapshot(&CharacterId::new("mira")).unwrap();
        assert!(mira
            .entries()
            .iter()
            .all(|entry| entry.kind() != EntryKind::SystemError));
    }

    #[tokio::test]
    async fn test_address_character_defaults_speaker_to_moderator() {
        let cast = SceneCast::select(roster(), &ids(&["grog"])).unwrap();
        let (session, batch) = SceneSession::start(
            Uuid::new_v4(),
            "Rain.",
            cast,
            &services(Arc::new(ScriptedGenerationService::new())),
        )
        .unwrap();
        batch.wait().await;

        let outcome = session
            .address_character(&CharacterId::new("grog"), Some("  "), "Sit down.")
            .await
            .unwrap();

        assert!(outcome.is_spoke());
        let track = session.track_snapshot(&CharacterId::new("grog")).unwrap();
        assert_eq!(track.entries()[2].to_exchange_line(), "Moderator: Sit down.");
    }

    #[tokio::test]
    async fn test_update_during_stagger_delay_is_rejected_in_favour_of_the_opening_reaction() {
        // Arrange
        let generator = Arc::new(GatedGenerationService::new(
            ScriptedGenerationService::new().with_line("grog", "Hm."),
        ));
        let mut scene_services = services(generator.clone());
        scene_services.config.stagger = StaggerPolicy {
            base: Duration::from_millis(300),
            step: Duration::ZERO,
        };
        let cast = SceneCast::select(roster(), &ids(&["grog"])).unwrap();
        let (session, opening) =
            SceneSession::start(Uuid::new_v4(), "A stranger enters.", cast, &scene_services)
                .unwrap();
        let grog = CharacterId::new("grog");
        let phase_while_delayed = session
            .dispatcher(&grog)
            .unwrap()
            .phase(DispatchSource::Reaction);

        // Act
        let update = session
            .submit_narration_update("The door slams.")
            .unwrap()
            .wait()
            .await;
        generator.wait_until_entered().await;
        generator.release(1);
        let opening = opening.wait().await;

        // Assert
        assert_eq!(phase_while_delayed, DispatchPhase::Dispatching);
        assert_eq!(
            update[0].1,
            ReactionOutcome::Failed {
                reason: DispatchError::ReentrantActionRejected {
                    pending: DispatchSource::Reaction
                }
            }
        );
        assert_eq!(
            opening[0].1,
            ReactionOutcome::Spoke {
                line: "Hm.".into()
            }
        );
        let latest_events: Vec<String> = generator
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Reaction(request) => Some(request.latest_event),
                RecordedCall::Action(_) => None,
            })
            .collect();
        assert_eq!(latest_events, vec!["A stranger enters.".to_owned()]);
        let track = session.track_snapshot(&grog).unwrap();
        let kinds: Vec<EntryKind> = track.entries().iter().map(ConversationEntry::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EntryKind::SystemInfo,
                EntryKind::SystemInfo,
                EntryKind::SystemError,
                EntryKind::CharacterLine,
            ]
        );
        assert_eq!(
            session.dispatcher(&grog).unwrap().phase(DispatchSource::Reaction),
            DispatchPhase::Idle
        );
    }
}
