//! End-to-end flows through the scene command handlers.

use std::sync::Arc;

use banter_conversation::domain::entry::EntryKind;
use banter_core::character::{Character, CharacterId, CharacterRole};
use banter_core::generation::{ActionKind, ActionReply, GenerationError, GenerationService};
use banter_scene::application::command_handlers::{
    handle_select_option, handle_start_scene, handle_trigger_action, handle_update_narration,
};
use banter_scene::application::query_handlers::get_scene_by_id;
use banter_scene::application::registry::SceneRegistry;
use banter_scene::domain::commands::{SelectOption, StartScene, TriggerAction, UpdateNarration};
use banter_scene::domain::outcome::{ActionResult, DispatchError, DispatchSource};
use banter_scene::domain::session::{SceneConfig, SceneServices, StaggerPolicy};
use banter_test_support::{
    FixedClock, GatedGenerationService, RecordedCall, ScriptedGenerationService,
    StaticCharacterRoster,
};
use chrono::{TimeZone, Utc};
use uuid::Uuid;

fn services(generator: Arc<dyn GenerationService>) -> SceneServices {
    SceneServices {
        generator,
        clock: Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        )),
        config: SceneConfig {
            stagger: StaggerPolicy::none(),
            ..SceneConfig::default()
        },
    }
}

fn roster() -> StaticCharacterRoster {
    StaticCharacterRoster::new(vec![
        Character::new("grog", "Grog", CharacterRole::Npc),
        Character::new("mira", "Mira", CharacterRole::Npc),
        Character::new("ayla", "Ayla", CharacterRole::Pc),
    ])
}

fn start(ids: &[&str]) -> StartScene {
    StartScene {
        correlation_id: Uuid::new_v4(),
        narration: "A stranger enters.".into(),
        character_ids: ids.iter().copied().map(CharacterId::new).collect(),
    }
}

fn trigger(scene_id: Uuid, character_id: &str, action: ActionKind) -> TriggerAction {
    TriggerAction {
        correlation_id: Uuid::new_v4(),
        scene_id,
        character_id: CharacterId::new(character_id),
        action,
    }
}

#[tokio::test]
async fn test_scene_start_gives_each_npc_one_reaction_to_the_narration() {
    // Arrange
    let generator = Arc::new(
        ScriptedGenerationService::new()
            .with_line("grog", "Grog: Who you?")
            .with_line("mira", "\"Welcome, traveller.\""),
    );
    let registry = SceneRegistry::new();

    // Act
    let started = handle_start_scene(
        &start(&["grog", "mira", "ayla"]),
        &roster(),
        &services(generator.clone()),
        &registry,
    )
    .await
    .unwrap();
    let outcomes = started.reactions.wait().await;

    // Assert
    assert_eq!(outcomes.len(), 2);
    let view = get_scene_by_id(started.scene_id, &registry).unwrap();
    let lines: Vec<(&str, &str)> = view
        .participants
        .iter()
        .map(|participant| {
            assert_eq!(participant.entries.len(), 2);
            assert_eq!(participant.entries[0].kind(), EntryKind::SystemInfo);
            assert_eq!(participant.entries[0].text(), "A stranger enters.");
            let line = &participant.entries[1];
            assert_eq!(line.kind(), EntryKind::CharacterLine);
            (line.speaker(), line.text())
        })
        .collect();
    assert_eq!(
        lines,
        vec![("Grog", "Who you?"), ("Mira", "Welcome, traveller.")]
    );

    for call in generator.calls() {
        match call {
            RecordedCall::Reaction(request) => {
                assert_eq!(request.latest_event, "A stranger enters.");
                assert_eq!(request.present_player_characters, vec!["Ayla".to_owned()]);
            }
            RecordedCall::Action(_) => panic!("no action was triggered"),
        }
    }
}

#[tokio::test]
async fn test_failure_for_one_character_is_isolated_to_its_track() {
    // Arrange
    let generator = Arc::new(
        ScriptedGenerationService::new().failing_for(
            "grog",
            GenerationError::Service {
                status: 502,
                message: "bad gateway".into(),
            },
        ),
    );
    let registry = SceneRegistry::new();

    // Act
    let started = handle_start_scene(
        &start(&["grog", "mira"]),
        &roster(),
        &services(generator),
        &registry,
    )
    .await
    .unwrap();
    started.reactions.wait().await;

    // Assert
    let view = get_scene_by_id(started.scene_id, &registry).unwrap();
    let grog = &view.participants[0];
    let mira = &view.participants[1];
    assert_eq!(grog.entries.last().unwrap().kind(), EntryKind::SystemError);
    assert_eq!(
        grog.entries.last().unwrap().text(),
        "Error for Grog: service error (status 502): bad gateway"
    );
    assert_eq!(mira.entries.last().unwrap().kind(), EntryKind::CharacterLine);
    assert!(
        mira.entries
            .iter()
            .all(|entry| entry.kind() != EntryKind::SystemError)
    );
}

#[tokio::test]
async fn test_repeated_action_while_in_flight_is_rejected_and_sends_nothing() {
    // Arrange
    let generator = Arc::new(GatedGenerationService::new(ScriptedGenerationService::new()));
    let registry = Arc::new(SceneRegistry::new());
    let started = handle_start_scene(
        &start(&["grog"]),
        &roster(),
        &services(generator.clone()),
        &registry,
    )
    .await
    .unwrap();
    generator.wait_until_entered().await;
    generator.release(1);
    started.reactions.wait().await;
    let scene_id = started.scene_id;

    // Act
    let first = tokio::spawn({
        let registry = Arc::clone(&registry);
        async move { handle_trigger_action(&trigger(scene_id, "grog", ActionKind::NextTopic), &registry).await }
    });
    generator.wait_until_entered().await;
    let in_flight = get_scene_by_id(scene_id, &registry).unwrap().participants[0]
        .in_flight
        .clone();
    let second = handle_trigger_action(&trigger(scene_id, "grog", ActionKind::NextTopic), &registry)
        .await
        .unwrap();
    let calls_before_release = generator.calls().len();
    generator.release(1);
    let first = first.await.unwrap().unwrap();

    // Assert
    assert_eq!(in_flight, vec![DispatchSource::Action(ActionKind::NextTopic)]);
    assert_eq!(
        second,
        ActionResult::Failed {
            reason: DispatchError::ReentrantActionRejected {
                pending: DispatchSource::Action(ActionKind::NextTopic)
            }
        }
    );
    assert_eq!(calls_before_release, 2);
    assert!(first.is_accepted());
    assert_eq!(generator.calls().len(), 2);
    let view = get_scene_by_id(scene_id, &registry).unwrap();
    assert!(view.participants[0].in_flight.is_empty());
}

#[tokio::test]
async fn test_topics_then_selection_then_narration_update() {
    // Arrange
    let generator = Arc::new(ScriptedGenerationService::new().with_action_reply(
        ActionKind::RegenerateTopics,
        ActionReply {
            message: "Fresh topics.".into(),
            options: Some(vec!["The storm".into(), "The missing cart".into()]),
        },
    ));
    let registry = SceneRegistry::new();
    let started = handle_start_scene(
        &start(&["grog", "mira"]),
        &roster(),
        &services(generator.clone()),
        &registry,
    )
    .await
    .unwrap();
    started.reactions.wait().await;
    let scene_id = started.scene_id;

    // Act
    let topics = handle_trigger_action(&trigger(scene_id, "mira", ActionKind::RegenerateTopics), &registry)
        .await
        .unwrap();
    let picked = handle_select_option(
        &SelectOption {
            correlation_id: Uuid::new_v4(),
            scene_id,
            character_id: CharacterId::new("mira"),
            option_index: 1,
        },
        &registry,
    )
    .await
    .unwrap();
    let updates = handle_update_narration(
        &UpdateNarration {
            correlation_id: Uuid::new_v4(),
            scene_id,
            text: "Thunder rolls.".into(),
        },
        &registry,
    )
    .unwrap()
    .wait()
    .await;

    // Assert
    assert_eq!(topics.options(), ["The storm".to_owned(), "The missing cart".to_owned()]);
    assert!(picked.is_spoke());
    assert_eq!(updates.len(), 2);

    let view = get_scene_by_id(scene_id, &registry).unwrap();
    assert_eq!(
        view.context.narration_text(),
        "A stranger enters.\n\nThunder rolls."
    );
    let mira_kinds: Vec<EntryKind> = view.participants[1]
        .entries
        .iter()
        .map(|entry| entry.kind())
        .collect();
    assert_eq!(
        mira_kinds,
        vec![
            EntryKind::SystemInfo,
            EntryKind::CharacterLine,
            EntryKind::ModeratorActionNote,
            EntryKind::SystemSuccess,
            EntryKind::SystemInfo,
            EntryKind::ModeratorChoice,
            EntryKind::CharacterLine,
            EntryKind::SystemInfo,
            EntryKind::CharacterLine,
        ]
    );
    // Grog saw none of Mira's topic work.
    assert_eq!(view.participants[0].entries.len(), 4);
    assert_eq!(generator.calls_for("grog").len(), 2);

    let last_mira_request = generator
        .calls_for("mira")
        .into_iter()
        .filter_map(|call| match call {
            RecordedCall::Reaction(request) => Some(request),
            RecordedCall::Action(_) => None,
        })
        .last()
        .unwrap();
    assert_eq!(last_mira_request.latest_event, "Thunder rolls.");
    assert_eq!(
        last_mira_request.scene_narration,
        "A stranger enters.\n\nThunder rolls."
    );
}

#[tokio::test]
async fn test_memory_commit_and_undo_round() {
    // Arrange
    let generator = Arc::new(ScriptedGenerationService::new());
    let registry = SceneRegistry::new();
    let started = handle_start_scene(&start(&["grog"]), &roster(), &services(generator.clone()), &registry)
        .await
        .unwrap();
    started.reactions.wait().await;
    let scene_id = started.scene_id;

    // Act
    let submitted = handle_trigger_action(&trigger(scene_id, "grog", ActionKind::SubmitMemory), &registry)
        .await
        .unwrap();
    let committed = get_scene_by_id(scene_id, &registry).unwrap().participants[0].memory_commits;
    let undone = handle_trigger_action(&trigger(scene_id, "grog", ActionKind::UndoMemory), &registry)
        .await
        .unwrap();

    // Assert
    assert!(submitted.is_accepted());
    assert!(undone.is_accepted());
    assert_eq!(committed, 1);
    assert_eq!(
        get_scene_by_id(scene_id, &registry).unwrap().participants[0].memory_commits,
        0
    );
    match &generator.calls()[1] {
        RecordedCall::Action(request) => {
            // Only Grog's line qualifies; the seed entry is administrative.
            assert_eq!(
                request.payload.dialogue_exchange.as_deref(),
                Some("Grog: Grog reacts to: A stranger enters.")
            );
        }
        RecordedCall::Reaction(_) => panic!("expected the memory submission"),
    }
}

#[tokio::test]
async fn test_action_in_flight_keeps_the_narration_it_was_issued_with() {
    // Arrange
    let generator = Arc::new(GatedGenerationService::new(ScriptedGenerationService::new()));
    let registry = Arc::new(SceneRegistry::new());
    let started = handle_start_scene(
        &start(&["grog"]),
        &roster(),
        &services(generator.clone()),
        &registry,
    )
    .await
    .unwrap();
    generator.wait_until_entered().await;
    generator.release(1);
    started.reactions.wait().await;
    let scene_id = started.scene_id;

    // Act
    let action = tokio::spawn({
        let registry = Arc::clone(&registry);
        async move { handle_trigger_action(&trigger(scene_id, "grog", ActionKind::NextTopic), &registry).await }
    });
    generator.wait_until_entered().await;
    let update = handle_update_narration(
        &UpdateNarration {
            correlation_id: Uuid::new_v4(),
            scene_id,
            text: "The door slams.".into(),
        },
        &registry,
    )
    .unwrap();
    generator.wait_until_entered().await;
    generator.release(2);
    let action = action.await.unwrap().unwrap();
    let reactions = update.wait().await;

    // Assert
    assert!(action.is_accepted());
    assert!(reactions[0].1.is_spoke());
    let calls = generator.calls();
    let action_narration = calls.iter().find_map(|call| match call {
        RecordedCall::Action(request) => Some(request.scene_narration.as_str()),
        RecordedCall::Reaction(_) => None,
    });
    assert_eq!(action_narration, Some("A stranger enters."));
    match calls.last().unwrap() {
        RecordedCall::Reaction(request) => {
            assert_eq!(request.latest_event, "The door slams.");
            assert_eq!(request.scene_narration, "A stranger enters.\n\nThe door slams.");
        }
        RecordedCall::Action(_) => panic!("expected the narration reaction"),
    }
}
