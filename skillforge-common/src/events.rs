//! Room event types for the discussion broadcast layer
//!
//! Events are relayed through per-program rooms and serialized for SSE
//! transmission. The broadcast layer is a non-durable echo: every event
//! describes state that has already been persisted through the REST API.

use crate::types::DiscussionMessage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events broadcast inside a discussion room
///
/// All variants use this central enum for exhaustive matching on both the
/// server relay and the room client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum RoomEvent {
    /// A new message was persisted and echoed to the room
    ///
    /// Carries the full authoritative record so receivers can render it
    /// without a store round trip.
    MessagePosted {
        message: DiscussionMessage,
    },

    /// A message's like counter was incremented
    ///
    /// Carries the message id only; receivers bump their local counter and
    /// reconcile the exact count on their next store fetch.
    MessageLiked {
        message_id: Uuid,
    },
}

impl RoomEvent {
    /// Event type name, used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            RoomEvent::MessagePosted { .. } => "MessagePosted",
            RoomEvent::MessageLiked { .. } => "MessageLiked",
        }
    }
}

/// Broadcast envelope pairing an event with the session that produced it
///
/// `origin` is the publishing client's session id; subscribers with the
/// same session id never receive the envelope (the sender already applied
/// the change optimistically). Server-originated envelopes carry `None`
/// and reach every subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomEnvelope {
    pub origin: Option<Uuid>,
    pub event: RoomEvent,
}

impl RoomEnvelope {
    pub fn new(origin: Option<Uuid>, event: RoomEvent) -> Self {
        Self { origin, event }
    }

    /// Whether a subscriber holding `session` should receive this envelope
    pub fn visible_to(&self, session: Uuid) -> bool {
        self.origin != Some(session)
    }
}
