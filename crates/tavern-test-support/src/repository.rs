//! Test repositories: mock `EventRepository` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tavern_core::error::DomainError;
use tavern_core::repository::{EventRepository, StoredEvent, StreamAppend};
use uuid::Uuid;

/// An event repository that records all `load_events` and `append_events`
/// calls. Returns the configured result from `load_events` on every call and
/// always succeeds on appends.
#[derive(Debug)]
pub struct RecordingEventRepository {
    load_result: Mutex<Vec<StoredEvent>>,
    appended: Mutex<Vec<(Uuid, i64, Vec<StoredEvent>)>>,
}

impl RecordingEventRepository {
    /// Create a new recording repository that will return `load_result` from
    /// every `load_events` call.
    ///
    /// # Panics
    ///
    /// Panics if `load_result` is an `Err`; use `FailingEventRepository` for
    /// error scenarios.
    #[must_use]
    pub fn new(load_result: Result<Vec<StoredEvent>, DomainError>) -> Self {
        Self {
            load_result: Mutex::new(load_result.expect(
                "RecordingEventRepository::new does not accept Err; use FailingEventRepository",
            )),
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all events that were appended, one entry per
    /// stream written.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<(Uuid, i64, Vec<StoredEvent>)> {
        self.appended.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventRepository for RecordingEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.load_result.lock().unwrap().clone())
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        self.appended
            .lock()
            .unwrap()
            .push((aggregate_id, expected_version, events.to_vec()));
        Ok(())
    }

    async fn append_streams(&self, appends: &[StreamAppend]) -> Result<(), DomainError> {
        let mut appended = self.appended.lock().unwrap();
        for append in appends {
            appended.push((
                append.aggregate_id,
                append.expected_version,
                append.events.clone(),
            ));
        }
        Ok(())
    }
}

/// An event repository that always returns an empty event list and silently
/// accepts appends. Useful for testing "aggregate not found" scenarios and
/// creation commands.
#[derive(Debug)]
pub struct EmptyEventRepository;

#[async_trait]
impl EventRepository for EmptyEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Ok(())
    }

    async fn append_streams(&self, _appends: &[StreamAppend]) -> Result<(), DomainError> {
        Ok(())
    }
}

/// An event repository that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventRepository;

#[async_trait]
impl EventRepository for FailingEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn append_streams(&self, _appends: &[StreamAppend]) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// An in-memory event store with the same optimistic-concurrency semantics
/// as the PostgreSQL repository: an append succeeds only if the stream's
/// last sequence number equals `expected_version`, and multi-stream appends
/// are all-or-nothing.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    streams: Mutex<HashMap<Uuid, Vec<StoredEvent>>>,
    fail_next_multi_stream_append: Mutex<bool>,
}

impl InMemoryEventRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of one stream.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stream(&self, aggregate_id: Uuid) -> Vec<StoredEvent> {
        self.streams
            .lock()
            .unwrap()
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes the next `append_streams` call fail with an infrastructure
    /// error without writing anything.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_next_multi_stream_append(&self) {
        *self.fail_next_multi_stream_append.lock().unwrap() = true;
    }

    fn check_version(
        streams: &HashMap<Uuid, Vec<StoredEvent>>,
        aggregate_id: Uuid,
        expected_version: i64,
    ) -> Result<(), DomainError> {
        let actual = streams
            .get(&aggregate_id)
            .and_then(|events| events.last())
            .map_or(0, |event| event.sequence_number);
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
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.stream(aggregate_id))
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let mut streams = self.streams.lock().unwrap();
        Self::check_version(&streams, aggregate_id, expected_version)?;
        streams
            .entry(aggregate_id)
            .or_default()
            .extend_from_slice(events);
        Ok(())
    }

    async fn append_streams(&self, appends: &[StreamAppend]) -> Result<(), DomainError> {
        if std::mem::take(&mut *self.fail_next_multi_stream_append.lock().unwrap()) {
            return Err(DomainError::Infrastructure("transaction aborted".into()));
        }
        let mut streams = self.streams.lock().unwrap();
        for append in appends {
            Self::check_version(&streams, append.aggregate_id, append.expected_version)?;
        }
        for append in appends {
            streams
                .entry(append.aggregate_id)
                .or_default()
                .extend_from_slice(&append.events);
        }
        Ok(())
    }
}
