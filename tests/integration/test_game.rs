//! End-to-end tests for the guessing game HTTP API.
//!
//! Each test binds a real listener on an ephemeral port and talks to it with
//! `reqwest`.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use guess_game::{
    create_router, spawn_idle_sweeper, AppState, Config, ConsistencyMode, FixedSecret,
    ScriptedSecrets, SecretSource, PLAYER_ID_HEADER,
};
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Spawns the API on an ephemeral port and returns its base URL.
async fn spawn_test_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    let router = create_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    (format!("http://{addr}"), handle)
}

fn state_with(secrets: Arc<dyn SecretSource>, consistency: ConsistencyMode) -> AppState {
    let config = Config {
        consistency,
        ..Config::default()
    };
    AppState::with_secret_source(config, secrets)
}

async fn start(client: &reqwest::Client, base: &str, player: Option<&str>) -> Value {
    let mut request = client.post(format!("{base}/api/game/start"));
    if let Some(player) = player {
        request = request.header(PLAYER_ID_HEADER, player);
    }
    let response = request.send().await.expect("Failed to start game");
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.expect("Invalid start body")
}

async fn guess(
    client: &reqwest::Client,
    base: &str,
    player: &str,
    number: Value,
) -> (StatusCode, Value) {
    let response = client
        .post(format!("{base}/api/game/guess"))
        .header(PLAYER_ID_HEADER, player)
        .json(&json!({ "number": number }))
        .send()
        .await
        .expect("Failed to send guess");
    let status = response.status();
    (status, response.json().await.expect("Invalid guess body"))
}

async fn status(client: &reqwest::Client, base: &str, player: &str) -> Value {
    client
        .get(format!("{base}/api/game/status"))
        .header(PLAYER_ID_HEADER, player)
        .send()
        .await
        .expect("Failed to get status")
        .json()
        .await
        .expect("Invalid status body")
}

// ============================================================================
// Game flow
// ============================================================================

/// Plays a whole game with a scripted secret and then restarts it.
#[tokio::test]
async fn test_full_game_and_restart() {
    let secrets = ScriptedSecrets::new([25, 80]).expect("Failed to build script");
    let state = state_with(Arc::new(secrets), ConsistencyMode::Atomic);
    let (base, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    let body = start(&client, &base, None).await;
    let player = body["playerId"].as_str().expect("Missing playerId").to_string();
    assert_eq!(body["attempts"], 0);

    let (code, body) = guess(&client, &base, &player, json!(50)).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["message"], "target is lower");

    let (_, body) = guess(&client, &base, &player, json!("10")).await;
    assert_eq!(body["message"], "target is higher");

    let (_, body) = guess(&client, &base, &player, json!(25)).await;
    assert_eq!(body["finished"], true);
    assert_eq!(body["attempts"], 3);
    assert_eq!(body["message"], "correct! you found it in 3 attempts");

    let body = status(&client, &base, &player).await;
    assert_eq!(body["phase"], "finished");
    assert_eq!(body["finished"], true);

    let (code, body) = guess(&client, &base, &player, json!(25)).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["error"], true);
    assert_eq!(body["attempts"], 3);

    // Second game draws the next scripted secret
    start(&client, &base, Some(&player)).await;
    let (_, body) = guess(&client, &base, &player, json!(25)).await;
    assert_eq!(body["message"], "target is higher");
    let (_, body) = guess(&client, &base, &player, json!(80)).await;
    assert_eq!(body["finished"], true);
    assert_eq!(body["attempts"], 2);
}

/// Tests that players do not see each other's games.
#[tokio::test]
async fn test_players_are_isolated() {
    let state = state_with(Arc::new(FixedSecret::new(40)), ConsistencyMode::Atomic);
    let (base, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    start(&client, &base, Some("alice")).await;
    guess(&client, &base, "alice", json!(40)).await;

    let body = status(&client, &base, "bob").await;
    assert_eq!(body["phase"], "no_session");

    start(&client, &base, Some("bob")).await;
    let (_, body) = guess(&client, &base, "bob", json!(1)).await;
    assert_eq!(body["attempts"], 1);
    assert_eq!(body["finished"], false);

    let body = status(&client, &base, "alice").await;
    assert_eq!(body["phase"], "finished");
    assert_eq!(body["attempts"], 1);
}

/// Tests that out-of-range and malformed guesses are rejected without effect.
#[tokio::test]
async fn test_rejected_guesses_leave_game_untouched() {
    let state = state_with(Arc::new(FixedSecret::new(40)), ConsistencyMode::Atomic);
    let (base, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    start(&client, &base, Some("carol")).await;

    let (code, body) = guess(&client, &base, "carol", json!(-1)).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(body["verdict"], "out_of_range");

    let (code, body) = guess(&client, &base, "carol", json!("abc")).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let response = client
        .post(format!("{base}/api/game/guess"))
        .header(PLAYER_ID_HEADER, "carol")
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to send guess");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = status(&client, &base, "carol").await;
    assert_eq!(body["attempts"], 0);
    assert_eq!(body["phase"], "in_progress");
}

/// Tests the form-encoded path used by plain HTML forms.
#[tokio::test]
async fn test_form_encoded_requests() {
    let state = state_with(Arc::new(FixedSecret::new(12)), ConsistencyMode::Atomic);
    let (base, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    start(&client, &base, Some("dave")).await;
    let response = client
        .post(format!("{base}/api/game/guess"))
        .header(PLAYER_ID_HEADER, "dave")
        .header("content-type", "application/x-www-form-urlencoded")
        .body("number=12")
        .send()
        .await
        .expect("Failed to send guess");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid guess body");
    assert_eq!(body["finished"], true);

    let response = client
        .post(format!("{base}/api/dispatch"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("exercise=table&action=generate&number=4")
        .send()
        .await
        .expect("Failed to send table request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid table body");
    assert_eq!(body["table"][4][4], 100.0);
}

// ============================================================================
// Concurrency
// ============================================================================

/// Tests that concurrent guesses from one player are all counted.
#[tokio::test]
async fn test_concurrent_guesses_are_all_counted() {
    const GUESSES: u64 = 20;

    let state = state_with(Arc::new(FixedSecret::new(100)), ConsistencyMode::Atomic);
    let (base, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    start(&client, &base, Some("eve")).await;

    let requests = (0..GUESSES).map(|_| guess(&client, &base, "eve", json!(0)));
    let results = join_all(requests).await;
    assert!(results.iter().all(|(code, _)| *code == StatusCode::OK));

    let body = status(&client, &base, "eve").await;
    assert_eq!(body["attempts"], GUESSES);
    assert_eq!(body["finished"], false);
}

// ============================================================================
// Idle sessions
// ============================================================================

/// Tests that the sweeper drops sessions nobody touches.
#[tokio::test]
async fn test_idle_sessions_are_swept() {
    let state = state_with(Arc::new(FixedSecret::new(5)), ConsistencyMode::Atomic);
    let sweeper = spawn_idle_sweeper(
        Arc::clone(&state.sessions),
        Duration::from_millis(20),
        Duration::from_millis(50),
    );
    let (base, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    start(&client, &base, Some("frank")).await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    let body = status(&client, &base, "frank").await;
    assert_eq!(body["phase"], "no_session");
    assert_eq!(body["attempts"], 0);

    sweeper.abort();
}
