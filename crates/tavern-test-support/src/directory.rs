//! Test game directory: an in-memory stand-in for the lobby, character and
//! item services behind the combat collaborator ports.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use tavern_combat::application::ports::{
    AuthorizationService, EquipmentBonusLookup, RosterMember, RosterProvider,
};
use tavern_core::error::DomainError;
use uuid::Uuid;

#[derive(Debug, Default)]
struct GameRecord {
    controlling_party: Uuid,
    participants: HashSet<Uuid>,
    roster: Vec<RosterMember>,
    owners: HashMap<Uuid, Uuid>,
}

/// A directory of games, their members and item bonuses, configured by the
/// test. Records every equipment lookup so tests can assert batching.
#[derive(Debug, Default)]
pub struct StaticGameDirectory {
    games: Mutex<HashMap<Uuid, GameRecord>>,
    item_bonuses: Mutex<HashMap<Uuid, i32>>,
    bonus_lookups: Mutex<Vec<Vec<Uuid>>>,
}

impl StaticGameDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a game run by `controlling_party`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn add_game(&self, game_id: Uuid, controlling_party: Uuid) {
        self.games.lock().unwrap().insert(
            game_id,
            GameRecord {
                controlling_party,
                ..GameRecord::default()
            },
        );
    }

    /// Registers `user_id` as a player in the game.
    ///
    /// # Panics
    ///
    /// Panics if the game was not registered.
    pub fn add_participant(&self, game_id: Uuid, user_id: Uuid) {
        let mut games = self.games.lock().unwrap();
        let game = games.get_mut(&game_id).expect("game not registered");
        game.participants.insert(user_id);
    }

    /// Puts a character on the game's combat roster. Player characters have
    /// an `owner`; non-player participants do not.
    ///
    /// # Panics
    ///
    /// Panics if the game was not registered.
    pub fn add_character(
        &self,
        game_id: Uuid,
        character_id: Uuid,
        owner: Option<Uuid>,
        equipped_item_ids: Vec<Uuid>,
    ) {
        let mut games = self.games.lock().unwrap();
        let game = games.get_mut(&game_id).expect("game not registered");
        game.roster.push(RosterMember {
            character_id,
            equipped_item_ids,
        });
        if let Some(owner) = owner {
            game.owners.insert(character_id, owner);
        }
    }

    /// Sets an item's dexterity modifier.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn set_item_bonus(&self, item_id: Uuid, dexterity_modifier: i32) {
        self.item_bonuses
            .lock()
            .unwrap()
            .insert(item_id, dexterity_modifier);
    }

    /// Returns the item ids of every equipment lookup, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn bonus_lookups(&self) -> Vec<Vec<Uuid>> {
        self.bonus_lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorizationService for StaticGameDirectory {
    async fn is_controlling_party(
        &self,
        game_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, DomainError> {
        Ok(self
            .games
            .lock()
            .unwrap()
            .get(&game_id)
            .is_some_and(|game| game.controlling_party == user_id))
    }

    async fn is_participant(&self, game_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.games.lock().unwrap().get(&game_id).is_some_and(|game| {
            game.controlling_party == user_id || game.participants.contains(&user_id)
        }))
    }

    async fn controls_character(
        &self,
        game_id: Uuid,
        user_id: Uuid,
        character_id: Uuid,
    ) -> Result<bool, DomainError> {
        Ok(self.games.lock().unwrap().get(&game_id).is_some_and(|game| {
            game.controlling_party == user_id || game.owners.get(&character_id) == Some(&user_id)
        }))
    }
}

#[async_trait]
impl RosterProvider for StaticGameDirectory {
    async fn combat_roster(&self, game_id: Uuid) -> Result<Vec<RosterMember>, DomainError> {
        Ok(self
            .games
            .lock()
            .unwrap()
            .get(&game_id)
            .map(|game| game.roster.clone())
            .unwrap_or_default())
    }

    async fn roster_member(
        &self,
        game_id: Uuid,
        character_id: Uuid,
    ) -> Result<Option<RosterMember>, DomainError> {
        Ok(self.games.lock().unwrap().get(&game_id).and_then(|game| {
            game.roster
                .iter()
                .find(|member| member.character_id == character_id)
                .cloned()
        }))
    }
}

#[async_trait]
impl EquipmentBonusLookup for StaticGameDirectory {
    async fn dexterity_bonuses(&self, item_ids: &[Uuid]) -> Result<HashMap<Uuid, i32>, DomainError> {
        self.bonus_lookups.lock().unwrap().push(item_ids.to_vec());
        let bonuses = self.item_bonuses.lock().unwrap();
        Ok(item_ids
            .iter()
            .filter_map(|id| bonuses.get(id).map(|bonus| (*id, *bonus)))
            .collect())
    }
}
