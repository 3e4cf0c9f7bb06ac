//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use banter_core::character::{Character, CharacterRole};
use banter_core::clock::Clock;
use banter_core::generation::GenerationService;
use banter_scene::domain::session::{SceneConfig, StaggerPolicy};
use banter_test_support::{FixedClock, StaticCharacterRoster};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use banter_api::routes;
use banter_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Grog and Mira are NPCs, Ayla is a PC.
pub fn roster() -> StaticCharacterRoster {
    StaticCharacterRoster::new(vec![
        Character::new("grog", "Grog", CharacterRole::Npc),
        Character::new("mira", "Mira", CharacterRole::Npc),
        Character::new("ayla", "Ayla", CharacterRole::Pc),
    ])
}

/// Build the full app router around `generator`, with no stagger between
/// reactions. Uses the same route structure as `main.rs`.
pub fn build_test_app(generator: Arc<dyn GenerationService>) -> Router {
    let state = AppState::new(
        Arc::new(roster()),
        generator,
        fixed_clock(),
        SceneConfig {
            stagger: StaggerPolicy::none(),
            ..SceneConfig::default()
        },
    );
    routes::app(state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a DELETE request and return the response.
pub async fn delete(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Start a scene with the given characters and return its id.
pub async fn start_scene(app: &Router, character_ids: &[&str]) -> String {
    let (status, json) = post_json(
        app.clone(),
        "/api/v1/scenes",
        &serde_json::json!({
            "narration": "A stranger enters.",
            "character_ids": character_ids,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["scene_id"].as_str().unwrap().to_owned()
}

/// Poll the scene view until every participant has at least `min_entries`
/// entries and nothing is in flight.
pub async fn wait_for_entries(app: &Router, scene_id: &str, min_entries: usize) -> Value {
    let uri = format!("/api/v1/scenes/{scene_id}");
    for _ in 0..200 {
        let (status, view) = get_json(app.clone(), &uri).await;
        assert_eq!(status, StatusCode::OK);
        let settled = view["participants"]
            .as_array()
            .unwrap()
            .iter()
            .all(|participant| {
                participant["entries"].as_array().unwrap().len() >= min_entries
                    && participant["in_flight"].as_array().unwrap().is_empty()
            });
        if settled {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("scene {scene_id} did not settle");
}
