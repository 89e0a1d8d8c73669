//! Per-game and per-character broadcast channels.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tavern_combat::application::broadcasts::{Audience, Broadcast, ServerEvent};
use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 256;

/// Fans outbound events out to every connection subscribed to an audience.
///
/// Channels are created on first subscription. Channels whose receivers are
/// all gone are swept on every subscription and on publish. Publishing to an
/// audience nobody subscribed to is a no-op.
#[derive(Debug, Clone, Default)]
pub struct BroadcastHub {
    channels: Arc<Mutex<HashMap<Audience, broadcast::Sender<ServerEvent>>>>,
}

impl BroadcastHub {
    /// Subscribes to a game's or a character's channel. Returns `None` for
    /// `Audience::Caller`, which has no shared channel.
    #[must_use]
    pub fn subscribe(&self, audience: Audience) -> Option<broadcast::Receiver<ServerEvent>> {
        if audience == Audience::Caller {
            return None;
        }
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels.retain(|_, sender| sender.receiver_count() > 0);
        let sender = channels
            .entry(audience)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        Some(sender.subscribe())
    }

    /// Publishes a broadcast and returns how many subscribers received it.
    pub fn publish(&self, broadcast: &Broadcast) -> usize {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = channels.get(&broadcast.audience) else {
            return 0;
        };
        if let Ok(delivered) = sender.send(broadcast.event.clone()) {
            debug!(
                event = broadcast.event.name(),
                audience = ?broadcast.audience,
                delivered,
                "broadcast published"
            );
            delivered
        } else {
            // Every receiver is gone.
            channels.remove(&broadcast.audience);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn joined(game_id: Uuid) -> Broadcast {
        Broadcast::to_game(game_id, ServerEvent::JoinedGame { game_id })
    }

    #[tokio::test]
    async fn test_game_subscribers_receive_game_broadcasts() {
        // Arrange
        let hub = BroadcastHub::default();
        let game_id = Uuid::new_v4();
        let mut first = hub.subscribe(Audience::Game(game_id)).unwrap();
        let mut second = hub.subscribe(Audience::Game(game_id)).unwrap();

        // Act
        let delivered = hub.publish(&joined(game_id));

        // Assert
        assert_eq!(delivered, 2);
        assert_eq!(first.recv().await.unwrap(), ServerEvent::JoinedGame { game_id });
        assert_eq!(second.recv().await.unwrap(), ServerEvent::JoinedGame { game_id });
    }

    #[tokio::test]
    async fn test_other_games_do_not_receive_the_broadcast() {
        let hub = BroadcastHub::default();
        let mut other = hub.subscribe(Audience::Game(Uuid::new_v4())).unwrap();

        hub.publish(&joined(Uuid::new_v4()));

        assert!(other.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_subscribers_delivers_nothing() {
        let hub = BroadcastHub::default();

        assert_eq!(hub.publish(&joined(Uuid::new_v4())), 0);
    }

    #[test]
    fn test_caller_audience_has_no_channel() {
        let hub = BroadcastHub::default();

        assert!(hub.subscribe(Audience::Caller).is_none());
    }

    #[test]
    fn test_channel_is_dropped_once_every_receiver_is_gone() {
        // Arrange
        let hub = BroadcastHub::default();
        let game_id = Uuid::new_v4();
        drop(hub.subscribe(Audience::Game(game_id)));

        // Act
        let delivered = hub.publish(&joined(game_id));

        // Assert
        assert_eq!(delivered, 0);
        assert!(hub.channels.lock().unwrap().is_empty());
    }

    #[test]
    fn test_abandoned_channels_are_swept_on_subscribe() {
        // Arrange
        let hub = BroadcastHub::default();
        let left = Uuid::new_v4();
        let joined_next = Uuid::new_v4();
        drop(hub.subscribe(Audience::Game(left)));
        drop(hub.subscribe(Audience::Character(Uuid::new_v4())));

        // Act
        let _receiver = hub.subscribe(Audience::Game(joined_next)).unwrap();

        // Assert
        let channels = hub.channels.lock().unwrap();
        assert_eq!(channels.len(), 1);
        assert!(channels.contains_key(&Audience::Game(joined_next)));
    }

    #[test]
    fn test_live_channels_survive_the_sweep() {
        let hub = BroadcastHub::default();
        let game_id = Uuid::new_v4();
        let _kept = hub.subscribe(Audience::Game(game_id)).unwrap();

        let _other = hub.subscribe(Audience::Character(Uuid::new_v4())).unwrap();

        assert_eq!(hub.channels.lock().unwrap().len(), 2);
        assert_eq!(hub.publish(&joined(game_id)), 1);
    }
}
