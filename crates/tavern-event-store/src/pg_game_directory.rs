//! `PostgreSQL` implementation of the combat collaborator ports, reading the
//! lobby, character and item tables.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use tavern_combat::application::ports::{
    AuthorizationService, EquipmentBonusLookup, RosterMember, RosterProvider,
};
use tavern_core::error::DomainError;

/// Read-only view over games, participants, characters and items.
#[derive(Debug, Clone)]
pub struct PgGameDirectory {
    pool: PgPool,
}

impl PgGameDirectory {
    /// Creates a new `PgGameDirectory`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn infrastructure(error: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(error.to_string())
}

fn row_to_member(row: &sqlx::postgres::PgRow) -> Result<RosterMember, sqlx::Error> {
    Ok(RosterMember {
        character_id: row.try_get("id")?,
        equipped_item_ids: row.try_get("item_ids")?,
    })
}

// Players first, then non-player participants, each in creation order.
const ROSTER_QUERY: &str = r"
    SELECT c.id,
           COALESCE(
               array_agg(e.item_id ORDER BY e.item_id) FILTER (WHERE e.item_id IS NOT NULL),
               '{}'
           ) AS item_ids
    FROM characters c
    LEFT JOIN equipped_items e ON e.character_id = c.id
    WHERE c.game_id = $1 AND c.active
";

#[async_trait]
impl AuthorizationService for PgGameDirectory {
    async fn is_controlling_party(
        &self,
        game_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM games WHERE id = $1 AND controlling_user_id = $2)",
        )
        .bind(game_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(infrastructure)
    }

    async fn is_participant(&self, game_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            r"
            SELECT EXISTS (SELECT 1 FROM games WHERE id = $1 AND controlling_user_id = $2)
                OR EXISTS (SELECT 1 FROM game_participants WHERE game_id = $1 AND user_id = $2)
            ",
        )
        .bind(game_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(infrastructure)
    }

    async fn controls_character(
        &self,
        game_id: Uuid,
        user_id: Uuid,
        character_id: Uuid,
    ) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            r"
            SELECT EXISTS (SELECT 1 FROM games WHERE id = $1 AND controlling_user_id = $2)
                OR EXISTS (
                    SELECT 1 FROM characters
                    WHERE id = $3 AND game_id = $1 AND owner_user_id = $2
                )
            ",
        )
        .bind(game_id)
        .bind(user_id)
        .bind(character_id)
        .fetch_one(&self.pool)
        .await
        .map_err(infrastructure)
    }
}

#[async_trait]
impl RosterProvider for PgGameDirectory {
    async fn combat_roster(&self, game_id: Uuid) -> Result<Vec<RosterMember>, DomainError> {
        let query = format!(
            "{ROSTER_QUERY} GROUP BY c.id, c.is_npc, c.created_at ORDER BY c.is_npc, c.created_at, c.id"
        );
        let rows = sqlx::query(&query)
            .bind(game_id)
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;

        rows.iter()
            .map(row_to_member)
            .collect::<Result<Vec<_>, _>>()
            .map_err(infrastructure)
    }

    async fn roster_member(
        &self,
        game_id: Uuid,
        character_id: Uuid,
    ) -> Result<Option<RosterMember>, DomainError> {
        let query = format!("{ROSTER_QUERY} AND c.id = $2 GROUP BY c.id");
        let row = sqlx::query(&query)
            .bind(game_id)
            .bind(character_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infrastructure)?;

        row.as_ref()
            .map(row_to_member)
            .transpose()
            .map_err(infrastructure)
    }
}

#[async_trait]
impl EquipmentBonusLookup for PgGameDirectory {
    async fn dexterity_bonuses(&self, item_ids: &[Uuid]) -> Result<HashMap<Uuid, i32>, DomainError> {
        let rows = sqlx::query("SELECT id, dexterity_modifier FROM items WHERE id = ANY($1)")
            .bind(item_ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;

        rows.iter()
            .map(|row| -> Result<(Uuid, i32), sqlx::Error> {
                Ok((row.try_get("id")?, row.try_get("dexterity_modifier")?))
            })
            .collect::<Result<HashMap<_, _>, _>>()
            .map_err(infrastructure)
    }
}
