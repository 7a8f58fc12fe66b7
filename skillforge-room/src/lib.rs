//! # SkillForge Room Client
//!
//! Client-side engine for per-program discussion rooms:
//! - Ordered local view of a room's messages
//! - Optimistic post and like flows with rollback on commit failure
//! - Live push over SSE with an automatic polling fallback
//!
//! The durable store and the broadcast transport sit behind traits so the
//! synchronization logic can be driven in tests without a server.

pub mod client;
pub mod http;
pub mod store;
pub mod transport;

pub use client::{
    run, spawn, ChannelState, RoomClient, RoomCommand, RoomHandle, RoomSnapshot, SyncPolicy,
    DEFAULT_POLL_INTERVAL,
};
pub use http::{HttpMessageStore, HttpRoomTransport};
pub use store::MessageStore;
pub use transport::{RoomTransport, TransportSignal};
