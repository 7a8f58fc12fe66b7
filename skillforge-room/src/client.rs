//! Room client: ordered local view with optimistic actions
//!
//! The client keeps one room's messages ordered by store timestamp and
//! folds in events from the live channel. Every mutation commits to the
//! durable store first; the broadcast is an echo, never the source of
//! truth. While the live channel is down the client polls the store on a
//! fixed interval, so a member on the fallback path converges within one
//! poll period.

use std::sync::Arc;
use std::time::Duration;

use skillforge_common::events::{RoomEnvelope, RoomEvent};
use skillforge_common::types::DiscussionMessage;
use skillforge_common::{Error, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::MessageStore;
use crate::transport::{RoomTransport, TransportSignal};

/// Poll cadence while the live channel is down
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// Commands queued for a running client before backpressure applies
const COMMAND_BUFFER: usize = 32;

/// Live-channel state, which decides whether polling is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Push delivery confirmed; polling is off
    Live,
    /// No confirmed channel; the store is polled on a fixed interval
    Polling,
}

/// Single decision point for live-versus-poll behavior
///
/// Starts in `Polling`: the channel is not trusted until its first
/// `Connected` signal, so a member who never connects still sees the room
/// move.
#[derive(Debug, Clone)]
pub struct SyncPolicy {
    state: ChannelState,
    poll_interval: Duration,
}

impl SyncPolicy {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            state: ChannelState::Polling,
            poll_interval,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == ChannelState::Live
    }

    pub fn should_poll(&self) -> bool {
        self.state == ChannelState::Polling
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn on_connected(&mut self) {
        self.state = ChannelState::Live;
    }

    pub fn on_disconnected(&mut self) {
        self.state = ChannelState::Polling;
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

/// One room's synchronized view plus its optimistic action state
///
/// Store and transport are injected; production wires the HTTP
/// implementations, tests wire fakes.
pub struct RoomClient<S, T> {
    store: Arc<S>,
    transport: Arc<T>,
    program_id: Uuid,
    session: Uuid,
    policy: SyncPolicy,
    messages: Vec<DiscussionMessage>,
    /// Likes applied locally whose durable commit is still in flight
    pending_likes: Vec<Uuid>,
}

impl<S, T> RoomClient<S, T>
where
    S: MessageStore,
    T: RoomTransport,
{
    pub fn new(store: Arc<S>, transport: Arc<T>, program_id: Uuid) -> Self {
        Self {
            store,
            transport,
            program_id,
            session: Uuid::new_v4(),
            policy: SyncPolicy::default(),
            messages: Vec::new(),
            pending_likes: Vec::new(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.policy = SyncPolicy::new(poll_interval);
        self
    }

    /// Session id stamped on every envelope this client publishes
    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn program_id(&self) -> Uuid {
        self.program_id
    }

    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    /// Current view, ordered by store timestamp (id as tiebreak)
    pub fn messages(&self) -> &[DiscussionMessage] {
        &self.messages
    }

    /// Replace the view with the store's authoritative window, then
    /// re-apply tentative likes still awaiting their commit
    pub async fn refresh(&mut self) -> Result<()> {
        let mut messages = self.store.list_messages(self.program_id).await?;
        messages.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        self.messages = messages;
        for message_id in self.pending_likes.clone() {
            self.bump_likes(message_id, 1);
        }
        Ok(())
    }

    /// Post a message: durable commit, local append, best-effort echo
    ///
    /// The view gains the stored record (authoritative id and timestamp),
    /// never the local draft. A failed echo is absorbed; other members
    /// converge through their polling fallback.
    pub async fn post_message(&mut self, text: &str) -> Result<DiscussionMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("message must not be empty".to_string()));
        }

        let stored = self.store.post_message(self.program_id, text).await?;
        self.insert_message(stored.clone());

        let envelope = RoomEnvelope::new(
            Some(self.session),
            RoomEvent::MessagePosted {
                message: stored.clone(),
            },
        );
        if let Err(e) = self.transport.publish(self.program_id, envelope).await {
            debug!("Post echo not delivered: {}", e);
        }

        Ok(stored)
    }

    /// Like a message: tentative local bump, durable commit, echo
    ///
    /// The tentative increment is rolled back if the commit fails, so the
    /// view never drifts from what the store will eventually confirm. The
    /// message must be present in the view. Exact counts reconcile on the
    /// next fetch; the receipt's count is returned to the caller.
    pub async fn like_message(&mut self, message_id: Uuid) -> Result<i64> {
        if !self.apply_tentative_like(message_id) {
            return Err(Error::NotFound(format!("message {}", message_id)));
        }

        match self.store.like_message(message_id).await {
            Ok(receipt) => {
                self.confirm_like(message_id);
                let envelope = RoomEnvelope::new(
                    Some(self.session),
                    RoomEvent::MessageLiked { message_id },
                );
                if let Err(e) = self.transport.publish(self.program_id, envelope).await {
                    debug!("Like echo not delivered: {}", e);
                }
                Ok(receipt.likes)
            }
            Err(e) => {
                self.rollback_like(message_id);
                Err(e)
            }
        }
    }

    /// Fold an incoming room event into the view
    ///
    /// Posted messages are deduplicated by id, so an echo of a record the
    /// view already holds is a no-op. A like for a message outside the
    /// current window is dropped; the window is refetched on the next
    /// poll anyway.
    pub fn apply_event(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::MessagePosted { message } => self.insert_message(message),
            RoomEvent::MessageLiked { message_id } => {
                self.bump_likes(message_id, 1);
            }
        }
    }

    fn insert_message(&mut self, message: DiscussionMessage) {
        if self.messages.iter().any(|m| m.id == message.id) {
            return;
        }
        let at = self
            .messages
            .partition_point(|m| (m.created_at, m.id) <= (message.created_at, message.id));
        self.messages.insert(at, message);
    }

    fn bump_likes(&mut self, message_id: Uuid, delta: i64) -> bool {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == message_id) {
            message.likes = (message.likes + delta).max(0);
            true
        } else {
            false
        }
    }

    /// Tentative step: bump the view and record the in-flight like
    fn apply_tentative_like(&mut self, message_id: Uuid) -> bool {
        if !self.bump_likes(message_id, 1) {
            return false;
        }
        self.pending_likes.push(message_id);
        true
    }

    /// Commit confirmed: the local bump becomes permanent
    fn confirm_like(&mut self, message_id: Uuid) {
        self.remove_pending(message_id);
    }

    /// Commit failed: undo the tentative bump
    fn rollback_like(&mut self, message_id: Uuid) {
        self.remove_pending(message_id);
        self.bump_likes(message_id, -1);
    }

    fn remove_pending(&mut self, message_id: Uuid) {
        if let Some(at) = self.pending_likes.iter().position(|id| *id == message_id) {
            self.pending_likes.swap_remove(at);
        }
    }
}

/// Commands accepted by a running client
#[derive(Debug)]
pub enum RoomCommand {
    Post {
        text: String,
        reply: oneshot::Sender<Result<DiscussionMessage>>,
    },
    Like {
        message_id: Uuid,
        reply: oneshot::Sender<Result<i64>>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
}

/// Point-in-time copy of a running client's view
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub channel: ChannelState,
    pub messages: Vec<DiscussionMessage>,
}

/// Caller-side handle to a running client
#[derive(Debug, Clone)]
pub struct RoomHandle {
    commands: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub async fn post(&self, text: impl Into<String>) -> Result<DiscussionMessage> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(RoomCommand::Post {
                text: text.into(),
                reply,
            })
            .await
            .map_err(|_| Error::Transport("room client stopped".to_string()))?;
        rx.await
            .map_err(|_| Error::Transport("room client stopped".to_string()))?
    }

    pub async fn like(&self, message_id: Uuid) -> Result<i64> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(RoomCommand::Like { message_id, reply })
            .await
            .map_err(|_| Error::Transport("room client stopped".to_string()))?;
        rx.await
            .map_err(|_| Error::Transport("room client stopped".to_string()))?
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(RoomCommand::Snapshot { reply })
            .await
            .map_err(|_| Error::Transport("room client stopped".to_string()))?;
        rx.await
            .map_err(|_| Error::Transport("room client stopped".to_string()))
    }
}

/// Drive a client: join the room, keep the view synced, serve commands
///
/// The initial fetch happens before the channel is confirmed, matching
/// the `Polling` start state. Each `Connected` signal triggers one
/// catch-up fetch to cover events relayed while the join was in flight.
/// Returns once every [`RoomHandle`] is dropped.
pub async fn run<S, T>(
    mut client: RoomClient<S, T>,
    mut commands: mpsc::Receiver<RoomCommand>,
) -> Result<()>
where
    S: MessageStore,
    T: RoomTransport,
{
    let transport = client.transport.clone();
    let mut signals = transport.join(client.program_id).await?;
    let mut transport_open = true;

    if let Err(e) = client.refresh().await {
        warn!("Initial room fetch failed: {}", e);
    }

    let poll_interval = client.policy.poll_interval();
    let mut ticks = time::interval_at(time::Instant::now() + poll_interval, poll_interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            signal = signals.recv(), if transport_open => {
                match signal {
                    Some(TransportSignal::Connected) => {
                        client.policy.on_connected();
                        if let Err(e) = client.refresh().await {
                            warn!("Catch-up fetch failed: {}", e);
                        }
                    }
                    Some(TransportSignal::Disconnected) => {
                        client.policy.on_disconnected();
                    }
                    Some(TransportSignal::Event(event)) => {
                        client.apply_event(event);
                    }
                    None => {
                        // Transport task gone for good; stay on polling
                        transport_open = false;
                        client.policy.on_disconnected();
                    }
                }
            }
            _ = ticks.tick(), if client.policy.should_poll() => {
                if let Err(e) = client.refresh().await {
                    // Absorbed; the next tick retries
                    debug!("Poll failed: {}", e);
                }
            }
            command = commands.recv() => {
                match command {
                    Some(RoomCommand::Post { text, reply }) => {
                        let _ = reply.send(client.post_message(&text).await);
                    }
                    Some(RoomCommand::Like { message_id, reply }) => {
                        let _ = reply.send(client.like_message(message_id).await);
                    }
                    Some(RoomCommand::Snapshot { reply }) => {
                        let _ = reply.send(RoomSnapshot {
                            channel: client.policy.state(),
                            messages: client.messages.to_vec(),
                        });
                    }
                    // Every handle dropped; leaving the room
                    None => break,
                }
            }
        }
    }

    Ok(())
}

/// Spawn a client onto the runtime and hand back its command handle
pub fn spawn<S, T>(
    client: RoomClient<S, T>,
) -> (RoomHandle, tokio::task::JoinHandle<Result<()>>)
where
    S: MessageStore + 'static,
    T: RoomTransport + 'static,
{
    let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(run(client, rx));
    (RoomHandle { commands }, task)
}
