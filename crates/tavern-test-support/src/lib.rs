//! Shared test mocks and utilities for the Tavern session manager.

mod clock;
mod directory;
mod repository;

pub use clock::FixedClock;
pub use directory::StaticGameDirectory;
pub use repository::{
    EmptyEventRepository, FailingEventRepository, InMemoryEventRepository,
    RecordingEventRepository,
};
