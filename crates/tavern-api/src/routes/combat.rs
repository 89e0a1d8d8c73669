//! Routes for the Combat bounded context.
//!
//! Combatant enrolment and status-effect plumbing are called by the
//! character-sheet service. The turn-order read mirrors the socket's
//! `get-turn-order` command for clients that resynchronise over HTTP.

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tavern_combat::application::broadcasts::ServerEvent;
use tavern_combat::application::command_handlers::{self, CombatantCommandResult};
use tavern_combat::application::query_handlers::{self, CombatantView, TurnOrderView};
use tavern_combat::domain::commands::{
    ApplyStatusEffect, CombatCommand, CommandEnvelope, EnrollCombatant, RemoveStatusEffect,
};
use tavern_combat::domain::status_effects::StatusEffect;
use tavern_core::error::DomainError;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::realtime::Caller;
use crate::state::AppState;

/// Request body for POST /combatants.
#[derive(Debug, Deserialize)]
pub struct EnrollCombatantRequest {
    /// The character being enrolled.
    pub character_id: Uuid,
    /// The owning game.
    pub game_id: Uuid,
    /// Display name.
    pub name: String,
    /// Whether this is a non-player participant.
    #[serde(default)]
    pub is_npc: bool,
    /// Base dexterity.
    pub dexterity: i32,
    /// Starting HP.
    pub hp: i32,
    /// Maximum HP.
    pub max_hp: i32,
    /// Starting mana.
    #[serde(default)]
    pub mana: i32,
    /// Maximum mana.
    #[serde(default)]
    pub max_mana: i32,
}

/// Response body returned after a command is successfully handled.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// The aggregate the command affected.
    pub aggregate_id: Uuid,
    /// IDs of the domain events produced and persisted.
    pub event_ids: Vec<Uuid>,
}

impl From<CombatantCommandResult> for CommandResponse {
    fn from(result: CombatantCommandResult) -> Self {
        Self {
            aggregate_id: result.aggregate_id,
            event_ids: result.stored_events.iter().map(|e| e.event_id).collect(),
        }
    }
}

/// POST /combatants
#[instrument(skip(state, request), fields(character_id = %request.character_id))]
async fn enroll_combatant(
    State(state): State<AppState>,
    Json(request): Json<EnrollCombatantRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = EnrollCombatant {
        correlation_id: Uuid::new_v4(),
        character_id: request.character_id,
        game_id: request.game_id,
        name: request.name,
        is_npc: request.is_npc,
        dexterity: request.dexterity,
        hp: request.hp,
        max_hp: request.max_hp,
        mana: request.mana,
        max_mana: request.max_mana,
    };

    info!(correlation_id = %command.correlation_id, "handling enroll_combatant command");

    let result = command_handlers::handle_enroll_combatant(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
        state.orchestrator.roster().as_ref(),
    )
    .await?;

    Ok(Json(result.into()))
}

/// GET /combatants/{character_id}
#[instrument(skip(state))]
async fn get_combatant(
    State(state): State<AppState>,
    Path(character_id): Path<Uuid>,
) -> Result<Json<CombatantView>, ApiError> {
    let view = query_handlers::get_combatant_by_id(character_id, &*state.event_repository).await?;
    Ok(Json(view))
}

/// POST /combatants/{character_id}/status-effects
#[instrument(skip(state, effect), fields(effect_id = %effect.id))]
async fn apply_status_effect(
    State(state): State<AppState>,
    Path(character_id): Path<Uuid>,
    Json(effect): Json<StatusEffect>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = ApplyStatusEffect {
        correlation_id: Uuid::new_v4(),
        character_id,
        effect,
    };

    info!(correlation_id = %command.correlation_id, "handling apply_status_effect command");

    let result = command_handlers::handle_apply_status_effect(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
    )
    .await?;

    Ok(Json(result.into()))
}

/// DELETE /combatants/{character_id}/status-effects/{effect_id}
#[instrument(skip(state))]
async fn remove_status_effect(
    State(state): State<AppState>,
    Path((character_id, effect_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = RemoveStatusEffect {
        correlation_id: Uuid::new_v4(),
        character_id,
        effect_id,
    };

    info!(correlation_id = %command.correlation_id, "handling remove_status_effect command");

    let result = command_handlers::handle_remove_status_effect(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
    )
    .await?;

    Ok(Json(result.into()))
}

/// GET /games/{game_id}/turn-order
#[instrument(skip(state, caller), fields(user_id = %caller.0))]
async fn get_turn_order(
    caller: Caller,
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<TurnOrderView>, ApiError> {
    let envelope = CommandEnvelope {
        correlation_id: Uuid::new_v4(),
        game_id,
        issuer: caller.0,
        command: CombatCommand::GetTurnOrder,
    };

    let broadcasts = state.orchestrator.dispatch(&envelope).await?;

    broadcasts
        .into_iter()
        .find_map(|broadcast| match broadcast.event {
            ServerEvent::TurnOrderState { turn_order } => Some(Json(turn_order)),
            _ => None,
        })
        .ok_or_else(|| {
            ApiError(DomainError::Infrastructure(
                "get-turn-order produced no turn order".to_owned(),
            ))
        })
}

/// Returns the router for the combat context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/combatants", post(enroll_combatant))
        .route("/combatants/{character_id}", get(get_combatant))
        .route(
            "/combatants/{character_id}/status-effects",
            post(apply_status_effect),
        )
        .route(
            "/combatants/{character_id}/status-effects/{effect_id}",
            delete(remove_status_effect),
        )
        .route("/games/{game_id}/turn-order", get(get_turn_order))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use serde_json::Value;
    use tavern_core::repository::EventRepository;
    use tavern_test_support::{
        EmptyEventRepository, FailingEventRepository, FixedClock, InMemoryEventRepository,
        StaticGameDirectory,
    };
    use tower::ServiceExt;

    fn app_state_with(
        event_repository: Arc<dyn EventRepository>,
        directory: Arc<StaticGameDirectory>,
    ) -> AppState {
        AppState::new(
            Arc::new(FixedClock(Utc::now())),
            event_repository,
            directory,
            10,
        )
    }

    fn test_app_state() -> AppState {
        app_state_with(
            Arc::new(EmptyEventRepository),
            Arc::new(StaticGameDirectory::new()),
        )
    }

    /// A directory whose game `game_id` has `character_id` on its roster.
    fn rostered(game_id: Uuid, character_id: Uuid) -> Arc<StaticGameDirectory> {
        let directory = Arc::new(StaticGameDirectory::new());
        directory.add_game(game_id, Uuid::new_v4());
        directory.add_character(game_id, character_id, Some(Uuid::new_v4()), Vec::new());
        directory
    }

    fn enroll_body(game_id: Uuid, character_id: Uuid) -> Value {
        serde_json::json!({
            "character_id": character_id,
            "game_id": game_id,
            "name": "Ilsa",
            "dexterity": 3,
            "hp": 14,
            "max_hp": 14
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn post(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn delete_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_enroll_combatant_returns_200_with_event_ids() {
        // Arrange
        let game_id = Uuid::new_v4();
        let character_id = Uuid::new_v4();
        let app = router().with_state(app_state_with(
            Arc::new(EmptyEventRepository),
            rostered(game_id, character_id),
        ));

        // Act
        let (status, json) =
            send(app, post("/combatants", &enroll_body(game_id, character_id))).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["aggregate_id"], character_id.to_string());
        let event_ids = json["event_ids"].as_array().unwrap();
        assert_eq!(event_ids.len(), 1);
        for id in event_ids {
            Uuid::parse_str(id.as_str().unwrap()).unwrap();
        }
    }

    #[tokio::test]
    async fn test_enroll_combatant_off_roster_returns_404() {
        // Arrange
        let game_id = Uuid::new_v4();
        let character_id = Uuid::new_v4();
        let repo = Arc::new(InMemoryEventRepository::new());
        let app = router().with_state(app_state_with(
            repo.clone(),
            rostered(game_id, character_id),
        ));

        // Act
        let (status, json) = send(
            app,
            post("/combatants", &enroll_body(Uuid::new_v4(), character_id)),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "not_found");
        assert!(repo.stream(character_id).is_empty());
    }

    #[tokio::test]
    async fn test_enroll_combatant_returns_400_for_blank_name() {
        // Arrange
        let game_id = Uuid::new_v4();
        let character_id = Uuid::new_v4();
        let app = router().with_state(app_state_with(
            Arc::new(EmptyEventRepository),
            rostered(game_id, character_id),
        ));
        let mut body = enroll_body(game_id, character_id);
        body["name"] = Value::from("  ");

        // Act
        let (status, json) = send(app, post("/combatants", &body)).await;

        // Assert
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_enroll_combatant_returns_422_for_missing_fields() {
        let app = router().with_state(test_app_state());

        let (status, _) = send(app, post("/combatants", &serde_json::json!({}))).await;

        // Axum returns 422 for deserialization failures.
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_enroll_combatant_returns_500_when_repository_fails() {
        // Arrange
        let game_id = Uuid::new_v4();
        let character_id = Uuid::new_v4();
        let app = router().with_state(app_state_with(
            Arc::new(FailingEventRepository),
            rostered(game_id, character_id),
        ));

        // Act
        let (status, json) =
            send(app, post("/combatants", &enroll_body(game_id, character_id))).await;

        // Assert
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "infrastructure_error");
    }

    #[tokio::test]
    async fn test_get_unknown_combatant_returns_404() {
        let app = router().with_state(test_app_state());
        let request = Request::builder()
            .uri(format!("/combatants/{}", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();

        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "aggregate_not_found");
    }

    #[tokio::test]
    async fn test_status_effect_apply_then_remove() {
        // Arrange
        let game_id = Uuid::new_v4();
        let character_id = Uuid::new_v4();
        let effect_id = Uuid::new_v4();
        let state = app_state_with(
            Arc::new(InMemoryEventRepository::new()),
            rostered(game_id, character_id),
        );
        send(
            router().with_state(state.clone()),
            post("/combatants", &enroll_body(game_id, character_id)),
        )
        .await;
        let effect = serde_json::json!({
            "id": effect_id,
            "name": "Bleeding",
            "kind": "debuff",
            "duration": 2,
            "effects": { "hp_per_turn": -2 }
        });
        let effect_uri = format!("/combatants/{character_id}/status-effects/{effect_id}");

        // Act
        let (applied, _) = send(
            router().with_state(state.clone()),
            post(&format!("/combatants/{character_id}/status-effects"), &effect),
        )
        .await;
        let (removed, _) = send(router().with_state(state.clone()), delete_request(&effect_uri)).await;
        let (again, json) = send(router().with_state(state), delete_request(&effect_uri)).await;

        // Assert
        assert_eq!(applied, StatusCode::OK);
        assert_eq!(removed, StatusCode::OK);
        assert_eq!(again, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "not_found");
    }

    #[tokio::test]
    async fn test_turn_order_of_an_idle_game_is_empty() {
        // Arrange
        let directory = Arc::new(StaticGameDirectory::new());
        let game_id = Uuid::new_v4();
        let dm = Uuid::new_v4();
        directory.add_game(game_id, dm);
        let app = router().with_state(app_state_with(Arc::new(EmptyEventRepository), directory));
        let request = Request::builder()
            .uri(format!("/games/{game_id}/turn-order"))
            .header("x-user-id", dm.to_string())
            .body(Body::empty())
            .unwrap();

        // Act
        let (status, json) = send(app, request).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["game_id"], game_id.to_string());
        assert_eq!(json["combat_started"], false);
        assert_eq!(json["entries"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_turn_order_for_non_participant_returns_403() {
        // Arrange
        let directory = Arc::new(StaticGameDirectory::new());
        let game_id = Uuid::new_v4();
        directory.add_game(game_id, Uuid::new_v4());
        let app = router().with_state(app_state_with(Arc::new(EmptyEventRepository), directory));
        let request = Request::builder()
            .uri(format!("/games/{game_id}/turn-order"))
            .header("x-user-id", Uuid::new_v4().to_string())
            .body(Body::empty())
            .unwrap();

        // Act
        let (status, json) = send(app, request).await;

        // Assert
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "unauthorized");
    }
}
