//! Broadcast transport seam
//!
//! The live channel sits behind a trait so the client logic can run
//! against a scripted transport in tests. Joining a room yields a signal
//! stream; dropping the stream leaves the room.

use skillforge_common::events::{RoomEnvelope, RoomEvent};
use skillforge_common::Result;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Connection lifecycle and event delivery for one joined room
#[derive(Debug, Clone, PartialEq)]
pub enum TransportSignal {
    /// The live channel is confirmed up
    Connected,
    /// The live channel dropped; no events arrive until the next `Connected`
    Disconnected,
    /// An event relayed into the room by another member
    Event(RoomEvent),
}

/// Bidirectional room channel: join for a signal stream, publish to echo
#[async_trait::async_trait]
pub trait RoomTransport: Send + Sync {
    /// Join a room
    ///
    /// The receiver carries connection state changes and incoming events.
    /// Dropping it leaves the room and releases the channel.
    async fn join(&self, program_id: Uuid) -> Result<mpsc::Receiver<TransportSignal>>;

    /// Echo an already-persisted event to the room's other members
    async fn publish(&self, program_id: Uuid, envelope: RoomEnvelope) -> Result<()>;
}
