//! Shared application state.

use std::sync::Arc;

use tavern_combat::application::command_handlers::CombatOrchestrator;
use tavern_combat::application::ports::{
    AuthorizationService, EquipmentBonusLookup, RosterProvider,
};
use tavern_core::clock::Clock;
use tavern_core::repository::EventRepository;

use crate::realtime::hub::BroadcastHub;

/// Application state shared across all request handlers and connections.
#[derive(Clone)]
pub struct AppState {
    /// Time source for recorded events.
    pub clock: Arc<dyn Clock>,
    /// Event store shared by every aggregate.
    pub event_repository: Arc<dyn EventRepository>,
    /// Entry point for real-time combat commands.
    pub orchestrator: CombatOrchestrator,
    /// Fan-out of game and character broadcasts.
    pub hub: BroadcastHub,
    /// Commands accepted per event name per second on one connection.
    pub events_per_second: u32,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("events_per_second", &self.events_per_second)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create new application state. `directory` answers the authorization,
    /// roster and equipment questions of the orchestrator.
    #[must_use]
    pub fn new<D>(
        clock: Arc<dyn Clock>,
        event_repository: Arc<dyn EventRepository>,
        directory: Arc<D>,
        events_per_second: u32,
    ) -> Self
    where
        D: AuthorizationService + RosterProvider + EquipmentBonusLookup + 'static,
    {
        let orchestrator = CombatOrchestrator::new(
            Arc::clone(&clock),
            Arc::clone(&event_repository),
            directory.clone(),
            directory.clone(),
            directory,
        );
        Self {
            clock,
            event_repository,
            orchestrator,
            hub: BroadcastHub::default(),
            events_per_second,
        }
    }
}
