//! Integration tests for `PgEventRepository`.

use chrono::Utc;
use sqlx::PgPool;
use tavern_core::error::DomainError;
use tavern_core::repository::{EventRepository, StoredEvent, StreamAppend};
use tavern_event_store::pg_event_repository::PgEventRepository;
use uuid::Uuid;

/// Helper to build a `StoredEvent` with sensible defaults.
fn make_stored_event(aggregate_id: Uuid, sequence_number: i64) -> StoredEvent {
    StoredEvent {
        event_id: Uuid::new_v4(),
        aggregate_id,
        event_type: "combat.turn_advanced".to_string(),
        payload: serde_json::json!({"TurnAdvanced": {"from_index": 0, "to_index": 1}}),
        sequence_number,
        correlation_id: Uuid::new_v4(),
        causation_id: Uuid::new_v4(),
        occurred_at: Utc::now(),
    }
}

// --- load_events ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_load_events_returns_empty_vec_for_nonexistent_aggregate(pool: PgPool) {
    let repo = PgEventRepository::new(pool);

    let events = repo.load_events(Uuid::new_v4()).await.unwrap();

    assert!(events.is_empty());
}

// --- append_events + load_events ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_and_load_single_event(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let aggregate_id = Uuid::new_v4();
    let event = make_stored_event(aggregate_id, 1);
    let expected = event.clone();

    repo.append_events(aggregate_id, 0, &[event]).await.unwrap();

    let loaded = repo.load_events(aggregate_id).await.unwrap();
    assert_eq!(loaded.len(), 1);
    let e = &loaded[0];
    assert_eq!(e.event_id, expected.event_id);
    assert_eq!(e.aggregate_id, aggregate_id);
    assert_eq!(e.event_type, expected.event_type);
    assert_eq!(e.payload, expected.payload);
    assert_eq!(e.sequence_number, 1);
    assert_eq!(e.correlation_id, expected.correlation_id);
    assert_eq!(e.causation_id, expected.causation_id);
    assert_eq!(
        e.occurred_at.timestamp_micros(),
        expected.occurred_at.timestamp_micros()
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_multiple_events_preserves_sequence_order(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let aggregate_id = Uuid::new_v4();
    let events = vec![
        make_stored_event(aggregate_id, 1),
        make_stored_event(aggregate_id, 2),
        make_stored_event(aggregate_id, 3),
    ];

    repo.append_events(aggregate_id, 0, &events).await.unwrap();

    let loaded = repo.load_events(aggregate_id).await.unwrap();
    let sequence: Vec<i64> = loaded.iter().map(|e| e.sequence_number).collect();
    assert_eq!(sequence, vec![1, 2, 3]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_empty_events_is_noop(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let aggregate_id = Uuid::new_v4();

    repo.append_events(aggregate_id, 0, &[]).await.unwrap();

    assert!(repo.load_events(aggregate_id).await.unwrap().is_empty());
}

// --- concurrency ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_stale_expected_version_is_a_concurrency_conflict(pool: PgPool) {
    // Arrange
    let repo = PgEventRepository::new(pool);
    let aggregate_id = Uuid::new_v4();
    repo.append_events(
        aggregate_id,
        0,
        &[
            make_stored_event(aggregate_id, 1),
            make_stored_event(aggregate_id, 2),
        ],
    )
    .await
    .unwrap();

    // Act: a second writer decided against version 0.
    let result = repo
        .append_events(aggregate_id, 0, &[make_stored_event(aggregate_id, 1)])
        .await;

    // Assert
    match result {
        Err(DomainError::ConcurrencyConflict {
            aggregate_id: conflict_agg_id,
            expected,
            actual,
        }) => {
            assert_eq!(conflict_agg_id, aggregate_id);
            assert_eq!(expected, 0);
            assert_eq!(actual, 2);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
    assert_eq!(repo.load_events(aggregate_id).await.unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_concurrent_writers_on_same_version_only_one_wins(pool: PgPool) {
    // Arrange
    let repo = PgEventRepository::new(pool);
    let aggregate_id = Uuid::new_v4();
    repo.append_events(aggregate_id, 0, &[make_stored_event(aggregate_id, 1)])
        .await
        .unwrap();
    let first = [make_stored_event(aggregate_id, 2)];
    let second = [make_stored_event(aggregate_id, 2)];

    // Act
    let (a, b) = tokio::join!(
        repo.append_events(aggregate_id, 1, &first),
        repo.append_events(aggregate_id, 1, &second),
    );

    // Assert
    assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);
    let failure = if a.is_err() { a } else { b };
    assert!(matches!(failure, Err(DomainError::ConcurrencyConflict { .. })));
    assert_eq!(repo.load_events(aggregate_id).await.unwrap().len(), 2);
}

// --- append_streams ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_streams_writes_every_stream(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let encounter = Uuid::new_v4();
    let combatant = Uuid::new_v4();

    repo.append_streams(&[
        StreamAppend {
            aggregate_id: encounter,
            expected_version: 0,
            events: vec![make_stored_event(encounter, 1)],
        },
        StreamAppend {
            aggregate_id: combatant,
            expected_version: 0,
            events: vec![
                make_stored_event(combatant, 1),
                make_stored_event(combatant, 2),
            ],
        },
    ])
    .await
    .unwrap();

    assert_eq!(repo.load_events(encounter).await.unwrap().len(), 1);
    assert_eq!(repo.load_events(combatant).await.unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_streams_is_all_or_nothing(pool: PgPool) {
    // Arrange
    let repo = PgEventRepository::new(pool);
    let encounter = Uuid::new_v4();
    let combatant = Uuid::new_v4();
    repo.append_events(combatant, 0, &[make_stored_event(combatant, 1)])
        .await
        .unwrap();

    // Act: the combatant stream is stale.
    let result = repo
        .append_streams(&[
            StreamAppend {
                aggregate_id: encounter,
                expected_version: 0,
                events: vec![make_stored_event(encounter, 1)],
            },
            StreamAppend {
                aggregate_id: combatant,
                expected_version: 0,
                events: vec![make_stored_event(combatant, 1)],
            },
        ])
        .await;

    // Assert
    match result {
        Err(DomainError::ConcurrencyConflict { aggregate_id, .. }) => {
            assert_eq!(aggregate_id, combatant);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
    assert!(repo.load_events(encounter).await.unwrap().is_empty());
    assert_eq!(repo.load_events(combatant).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_streams_skips_empty_streams(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let encounter = Uuid::new_v4();

    repo.append_streams(&[StreamAppend {
        aggregate_id: encounter,
        expected_version: 7,
        events: Vec::new(),
    }])
    .await
    .unwrap();

    assert!(repo.load_events(encounter).await.unwrap().is_empty());
}
