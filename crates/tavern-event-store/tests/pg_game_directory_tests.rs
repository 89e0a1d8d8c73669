//! Integration tests for `PgGameDirectory`.

use sqlx::PgPool;
use tavern_combat::application::ports::{
    AuthorizationService, EquipmentBonusLookup, RosterProvider,
};
use tavern_event_store::pg_game_directory::PgGameDirectory;
use uuid::Uuid;

struct Seeded {
    game_id: Uuid,
    dm: Uuid,
    player: Uuid,
    hero: Uuid,
    goblin: Uuid,
    boots: Uuid,
}

async fn seed(pool: &PgPool) -> Seeded {
    let seeded = Seeded {
        game_id: Uuid::new_v4(),
        dm: Uuid::new_v4(),
        player: Uuid::new_v4(),
        hero: Uuid::new_v4(),
        goblin: Uuid::new_v4(),
        boots: Uuid::new_v4(),
    };

    sqlx::query("INSERT INTO games (id, name, controlling_user_id) VALUES ($1, 'Crypt', $2)")
        .bind(seeded.game_id)
        .bind(seeded.dm)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO game_participants (game_id, user_id) VALUES ($1, $2)")
        .bind(seeded.game_id)
        .bind(seeded.player)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        r"
        INSERT INTO characters (id, game_id, owner_user_id, name, is_npc, created_at)
        VALUES ($1, $3, $4, 'Goblin', TRUE, NOW() - INTERVAL '1 hour'),
               ($2, $3, $5, 'Hero', FALSE, NOW())
        ",
    )
    .bind(seeded.goblin)
    .bind(seeded.hero)
    .bind(seeded.game_id)
    .bind(Option::<Uuid>::None)
    .bind(seeded.player)
    .execute(pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO items (id, name, dexterity_modifier) VALUES ($1, 'Boots', 2)")
        .bind(seeded.boots)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO equipped_items (character_id, item_id) VALUES ($1, $2)")
        .bind(seeded.hero)
        .bind(seeded.boots)
        .execute(pool)
        .await
        .unwrap();

    seeded
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_authorization_queries(pool: PgPool) {
    // Arrange
    let seeded = seed(&pool).await;
    let directory = PgGameDirectory::new(pool);
    let stranger = Uuid::new_v4();

    // Act / Assert
    assert!(
        directory
            .is_controlling_party(seeded.game_id, seeded.dm)
            .await
            .unwrap()
    );
    assert!(
        !directory
            .is_controlling_party(seeded.game_id, seeded.player)
            .await
            .unwrap()
    );
    assert!(
        directory
            .is_participant(seeded.game_id, seeded.player)
            .await
            .unwrap()
    );
    assert!(directory.is_participant(seeded.game_id, seeded.dm).await.unwrap());
    assert!(!directory.is_participant(seeded.game_id, stranger).await.unwrap());
    assert!(
        directory
            .controls_character(seeded.game_id, seeded.player, seeded.hero)
            .await
            .unwrap()
    );
    assert!(
        !directory
            .controls_character(seeded.game_id, seeded.player, seeded.goblin)
            .await
            .unwrap()
    );
    assert!(
        directory
            .controls_character(seeded.game_id, seeded.dm, seeded.goblin)
            .await
            .unwrap()
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_combat_roster_lists_players_before_npcs_with_items(pool: PgPool) {
    // Arrange
    let seeded = seed(&pool).await;
    let directory = PgGameDirectory::new(pool);

    // Act
    let roster = directory.combat_roster(seeded.game_id).await.unwrap();

    // Assert
    assert_eq!(roster.len(), 2);
    assert_eq!(roster[0].character_id, seeded.hero);
    assert_eq!(roster[0].equipped_item_ids, vec![seeded.boots]);
    assert_eq!(roster[1].character_id, seeded.goblin);
    assert!(roster[1].equipped_item_ids.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_roster_member_ignores_other_games(pool: PgPool) {
    let seeded = seed(&pool).await;
    let directory = PgGameDirectory::new(pool);

    let found = directory
        .roster_member(seeded.game_id, seeded.hero)
        .await
        .unwrap();
    let elsewhere = directory
        .roster_member(Uuid::new_v4(), seeded.hero)
        .await
        .unwrap();

    assert_eq!(found.map(|m| m.character_id), Some(seeded.hero));
    assert!(elsewhere.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_dexterity_bonuses_returns_known_items_only(pool: PgPool) {
    let seeded = seed(&pool).await;
    let directory = PgGameDirectory::new(pool);

    let bonuses = directory
        .dexterity_bonuses(&[seeded.boots, Uuid::new_v4()])
        .await
        .unwrap();

    assert_eq!(bonuses.len(), 1);
    assert_eq!(bonuses.get(&seeded.boots), Some(&2));
}
