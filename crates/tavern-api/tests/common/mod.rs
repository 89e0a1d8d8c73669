//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::TimeZone;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tavern_event_store::pg_event_repository::PgEventRepository;
use tavern_event_store::pg_game_directory::PgGameDirectory;
use tavern_test_support::FixedClock;
use tower::ServiceExt;
use uuid::Uuid;

use tavern_api::state::AppState;

/// Build the full app router over `PostgreSQL` with a fixed clock. Uses the
/// same route structure as `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    let clock = Arc::new(FixedClock(
        chrono::Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    ));
    let app_state = AppState::new(
        clock,
        Arc::new(PgEventRepository::new(pool.clone())),
        Arc::new(PgGameDirectory::new(pool)),
        10,
    );
    tavern_api::app(app_state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a GET request on behalf of `user_id` and return the response.
pub async fn get_json_as(
    app: Router,
    uri: &str,
    user_id: Uuid,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-user-id", user_id.to_string())
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a DELETE request and return the response.
pub async fn delete_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Insert a game controlled by `dm` and return its id.
pub async fn seed_game(pool: &PgPool, dm: Uuid) -> Uuid {
    let game_id = Uuid::new_v4();
    sqlx::query("INSERT INTO games (id, name, controlling_user_id) VALUES ($1, 'Keep', $2)")
        .bind(game_id)
        .bind(dm)
        .execute(pool)
        .await
        .unwrap();
    game_id
}

/// Insert a player character owned by `owner` on the roster of `game_id`.
pub async fn seed_character(pool: &PgPool, game_id: Uuid, owner: Uuid, name: &str) -> Uuid {
    let character_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO characters (id, game_id, owner_user_id, name, is_npc) VALUES ($1, $2, $3, $4, FALSE)",
    )
    .bind(character_id)
    .bind(game_id)
    .bind(owner)
    .bind(name)
    .execute(pool)
    .await
    .unwrap();
    character_id
}
