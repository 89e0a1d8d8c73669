//! `PostgreSQL` implementation of the `EventRepository` trait.
//!
//! Writers to a stream are serialized with a transaction-scoped advisory
//! lock keyed on the aggregate id, so the version check and the insert see
//! the same stream head. Multi-stream appends take their locks in aggregate
//! id order.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use tavern_core::error::DomainError;
use tavern_core::repository::{EventRepository, StoredEvent, StreamAppend};

/// PostgreSQL-backed event repository.
#[derive(Debug, Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    /// Creates a new `PgEventRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn infrastructure(error: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(error.to_string())
}

async fn lock_stream(conn: &mut PgConnection, aggregate_id: Uuid) -> Result<(), DomainError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
        .bind(aggregate_id)
        .execute(&mut *conn)
        .await
        .map_err(infrastructure)?;
    Ok(())
}

async fn check_version(
    conn: &mut PgConnection,
    aggregate_id: Uuid,
    expected_version: i64,
) -> Result<(), DomainError> {
    let actual: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(sequence_number), 0) FROM domain_events WHERE aggregate_id = $1",
    )
    .bind(aggregate_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(infrastructure)?;

    if actual == expected_version {
        Ok(())
    } else {
        Err(DomainError::ConcurrencyConflict {
            aggregate_id,
            expected: expected_version,
            actual,
        })
    }
}

async fn insert_events(
    conn: &mut PgConnection,
    aggregate_id: Uuid,
    expected_version: i64,
    events: &[StoredEvent],
) -> Result<(), DomainError> {
    for event in events {
        sqlx::query(
            r"
            INSERT INTO domain_events
                (event_id, aggregate_id, event_type, payload, sequence_number,
                 correlation_id, causation_id, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(event.event_id)
        .bind(event.aggregate_id)
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.sequence_number)
        .bind(event.correlation_id)
        .bind(event.causation_id)
        .bind(event.occurred_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                DomainError::ConcurrencyConflict {
                    aggregate_id,
                    expected: expected_version,
                    actual: event.sequence_number,
                }
            } else {
                infrastructure(e)
            }
        })?;
    }
    Ok(())
}

fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<StoredEvent, sqlx::Error> {
    Ok(StoredEvent {
        event_id: row.try_get("event_id")?,
        aggregate_id: row.try_get("aggregate_id")?,
        event_type: row.try_get("event_type")?,
        payload: row.try_get("payload")?,
        sequence_number: row.try_get("sequence_number")?,
        correlation_id: row.try_get("correlation_id")?,
        causation_id: row.try_get("causation_id")?,
        occurred_at: row.try_get("occurred_at")?,
    })
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let rows = sqlx::query(
            r"
            SELECT event_id, aggregate_id, event_type, payload, sequence_number,
                   correlation_id, causation_id, occurred_at
            FROM domain_events
            WHERE aggregate_id = $1
            ORDER BY sequence_number
            ",
        )
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;

        rows.iter()
            .map(row_to_event)
            .collect::<Result<Vec<_>, _>>()
            .map_err(infrastructure)
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(infrastructure)?;
        lock_stream(&mut tx, aggregate_id).await?;
        check_version(&mut tx, aggregate_id, expected_version).await?;
        insert_events(&mut tx, aggregate_id, expected_version, events).await?;
        tx.commit().await.map_err(infrastructure)?;

        debug!(%aggregate_id, expected_version, count = events.len(), "events appended");
        Ok(())
    }

    async fn append_streams(&self, appends: &[StreamAppend]) -> Result<(), DomainError> {
        let mut ordered: Vec<&StreamAppend> =
            appends.iter().filter(|a| !a.events.is_empty()).collect();
        if ordered.is_empty() {
            return Ok(());
        }
        ordered.sort_by_key(|a| a.aggregate_id);

        let mut tx = self.pool.begin().await.map_err(infrastructure)?;
        for append in &ordered {
            lock_stream(&mut tx, append.aggregate_id).await?;
        }
        for append in &ordered {
            check_version(&mut tx, append.aggregate_id, append.expected_version).await?;
        }
        for append in &ordered {
            insert_events(
                &mut tx,
                append.aggregate_id,
                append.expected_version,
                &append.events,
            )
            .await?;
        }
        tx.commit().await.map_err(infrastructure)?;

        debug!(streams = ordered.len(), "multi-stream append committed");
        Ok(())
    }
}
