//! Per-program discussion room registry
//!
//! Holds one broadcast channel per active room. Rooms are created on
//! first subscribe and pruned once the last receiver is gone; nothing
//! here survives a restart. Live fan-out only; durable state lives in
//! the discussion tables.

use skillforge_common::events::RoomEnvelope;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Events buffered per room before slow subscribers start lagging
pub const DEFAULT_ROOM_CAPACITY: usize = 256;

/// Registry of live discussion rooms keyed by program id
pub struct RoomRegistry {
    capacity: usize,
    rooms: RwLock<HashMap<Uuid, broadcast::Sender<RoomEnvelope>>>,
}

impl RoomRegistry {
    pub fn new(capacity: usize) -> Self {
        info!("Room registry initialized with per-room capacity {}", capacity);
        Self {
            capacity,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Join a room, creating it on first subscribe
    pub async fn subscribe(&self, program_id: Uuid) -> broadcast::Receiver<RoomEnvelope> {
        let mut rooms = self.rooms.write().await;
        let tx = rooms
            .entry(program_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        let rx = tx.subscribe();
        debug!(
            "Room {} subscriber joined ({} receivers)",
            program_id,
            tx.receiver_count()
        );
        rx
    }

    /// Publish an envelope to a room, ignoring absent rooms and dropping
    /// the room if its last receiver is already gone
    ///
    /// Returns the number of receivers the envelope reached.
    pub async fn publish(&self, program_id: Uuid, envelope: RoomEnvelope) -> usize {
        let mut rooms = self.rooms.write().await;
        match rooms.get(&program_id) {
            Some(tx) => match tx.send(envelope) {
                Ok(count) => count,
                Err(_) => {
                    rooms.remove(&program_id);
                    debug!("Room {} pruned (no receivers)", program_id);
                    0
                }
            },
            None => 0,
        }
    }

    /// Receivers currently attached to a room
    pub async fn member_count(&self, program_id: Uuid) -> usize {
        let rooms = self.rooms.read().await;
        rooms
            .get(&program_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Rooms currently materialized
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Drop every room whose receivers are all gone
    pub async fn prune(&self) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, tx| tx.receiver_count() > 0);
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ROOM_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillforge_common::events::RoomEvent;

    fn liked(origin: Option<Uuid>) -> RoomEnvelope {
        RoomEnvelope::new(
            origin,
            RoomEvent::MessageLiked {
                message_id: Uuid::new_v4(),
            },
        )
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let registry = RoomRegistry::new(16);
        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();

        let mut rx_a = registry.subscribe(room_a).await;
        let mut rx_b = registry.subscribe(room_b).await;

        let envelope = liked(None);
        let reached = registry.publish(room_a, envelope.clone()).await;
        assert_eq!(reached, 1);

        assert_eq!(rx_a.recv().await.unwrap(), envelope);
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_to_absent_room_reaches_nobody() {
        let registry = RoomRegistry::new(16);
        let reached = registry.publish(Uuid::new_v4(), liked(None)).await;
        assert_eq!(reached, 0);
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_publish_prunes_dead_room() {
        let registry = RoomRegistry::new(16);
        let room = Uuid::new_v4();

        let rx = registry.subscribe(room).await;
        assert_eq!(registry.room_count().await, 1);
        drop(rx);

        let reached = registry.publish(room, liked(None)).await;
        assert_eq!(reached, 0);
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let registry = RoomRegistry::new(16);
        let room = Uuid::new_v4();

        let mut rx1 = registry.subscribe(room).await;
        let mut rx2 = registry.subscribe(room).await;
        assert_eq!(registry.member_count(room).await, 2);

        let origin = Uuid::new_v4();
        let envelope = liked(Some(origin));
        let reached = registry.publish(room, envelope.clone()).await;
        assert_eq!(reached, 2);

        // The registry fans out to everyone; origin filtering happens at
        // the subscription stream
        assert_eq!(rx1.recv().await.unwrap(), envelope);
        assert_eq!(rx2.recv().await.unwrap(), envelope);
    }

    #[tokio::test]
    async fn test_prune_keeps_live_rooms() {
        let registry = RoomRegistry::new(16);
        let live = Uuid::new_v4();
        let dead = Uuid::new_v4();

        let _rx_live = registry.subscribe(live).await;
        let rx_dead = registry.subscribe(dead).await;
        drop(rx_dead);

        registry.prune().await;
        assert_eq!(registry.room_count().await, 1);
        assert_eq!(registry.member_count(live).await, 1);
    }
}
