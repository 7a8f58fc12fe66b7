//! HTTP implementations of the store and transport seams
//!
//! [`HttpMessageStore`] speaks the discussion REST endpoints;
//! [`HttpRoomTransport`] subscribes to the room SSE feed and posts to the
//! publish relay. Identity travels in the same trusted headers the server
//! extracts.

use std::time::Duration;

use futures::StreamExt;
use reqwest::StatusCode;
use serde::Serialize;
use skillforge_common::events::{RoomEnvelope, RoomEvent};
use skillforge_common::types::{
    DiscussionMessage, LikeReceipt, Role, LEARNER_ID_HEADER, LEARNER_ROLE_HEADER,
};
use skillforge_common::{Error, Result};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::MessageStore;
use crate::transport::{RoomTransport, TransportSignal};

/// Delay between SSE reconnect attempts; polling covers the gap
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Signals buffered per joined room until the client applies them
const SIGNAL_BUFFER: usize = 64;

#[derive(Debug, Serialize)]
struct PostMessageBody<'a> {
    program_id: Uuid,
    message: &'a str,
}

/// Map a non-success response back onto the shared error taxonomy
async fn read_error(response: reqwest::Response) -> Error {
    let status = response.status();
    let detail = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| status.to_string());
    match status {
        StatusCode::UNAUTHORIZED => Error::Unauthorized,
        StatusCode::FORBIDDEN => Error::Forbidden(detail),
        StatusCode::NOT_FOUND => Error::NotFound(detail),
        StatusCode::BAD_REQUEST => Error::InvalidInput(detail),
        StatusCode::CONFLICT => Error::PreconditionFailed(detail),
        _ => Error::Internal(detail),
    }
}

fn normalize_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// REST-backed [`MessageStore`] committing through the core service
#[derive(Clone)]
pub struct HttpMessageStore {
    base_url: String,
    learner_id: Uuid,
    role: Role,
    http: reqwest::Client,
}

impl HttpMessageStore {
    pub fn new(base_url: impl Into<String>, learner_id: Uuid, role: Role) -> Self {
        Self {
            base_url: normalize_base(base_url.into()),
            learner_id,
            role,
            http: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header(LEARNER_ID_HEADER, self.learner_id.to_string())
            .header(LEARNER_ROLE_HEADER, self.role.as_str())
    }
}

#[async_trait::async_trait]
impl MessageStore for HttpMessageStore {
    async fn list_messages(&self, program_id: Uuid) -> Result<Vec<DiscussionMessage>> {
        let url = format!("{}/api/discussion?program_id={}", self.base_url, program_id);
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(read_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("malformed message list: {}", e)))
    }

    async fn post_message(&self, program_id: Uuid, message: &str) -> Result<DiscussionMessage> {
        let url = format!("{}/api/discussion", self.base_url);
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&PostMessageBody {
                program_id,
                message,
            })
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(read_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("malformed stored message: {}", e)))
    }

    async fn like_message(&self, message_id: Uuid) -> Result<LikeReceipt> {
        let url = format!("{}/api/discussion/{}/like", self.base_url, message_id);
        let response = self
            .request(reqwest::Method::POST, url)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(read_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("malformed like receipt: {}", e)))
    }
}

/// SSE-backed [`RoomTransport`]
///
/// `join` spawns a reader task that reconnects until the returned receiver
/// is dropped. Each (re)connection surfaces as a `Connected` signal so the
/// client can leave polling mode and catch up.
#[derive(Clone)]
pub struct HttpRoomTransport {
    base_url: String,
    session: Uuid,
    learner_id: Uuid,
    role: Role,
    http: reqwest::Client,
}

impl HttpRoomTransport {
    pub fn new(
        base_url: impl Into<String>,
        session: Uuid,
        learner_id: Uuid,
        role: Role,
    ) -> Self {
        Self {
            base_url: normalize_base(base_url.into()),
            session,
            learner_id,
            role,
            http: reqwest::Client::new(),
        }
    }

    pub fn session(&self) -> Uuid {
        self.session
    }
}

#[async_trait::async_trait]
impl RoomTransport for HttpRoomTransport {
    async fn join(&self, program_id: Uuid) -> Result<mpsc::Receiver<TransportSignal>> {
        let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);
        let url = format!(
            "{}/api/rooms/{}/events?session={}",
            self.base_url, program_id, self.session
        );
        let http = self.http.clone();

        tokio::spawn(async move {
            loop {
                match http.get(&url).send().await {
                    Ok(response) if response.status().is_success() => {
                        if tx.send(TransportSignal::Connected).await.is_err() {
                            return;
                        }
                        let mut parser = SseParser::default();
                        let mut body = response.bytes_stream();
                        loop {
                            match body.next().await {
                                Some(Ok(chunk)) => {
                                    for frame in parser.push(&chunk) {
                                        match serde_json::from_str::<RoomEvent>(&frame.data) {
                                            Ok(event) => {
                                                if tx
                                                    .send(TransportSignal::Event(event))
                                                    .await
                                                    .is_err()
                                                {
                                                    return;
                                                }
                                            }
                                            Err(e) => {
                                                warn!(
                                                    event = %frame.event,
                                                    "Undecodable room event: {}", e
                                                );
                                            }
                                        }
                                    }
                                }
                                Some(Err(e)) => {
                                    debug!("Room stream read failed: {}", e);
                                    break;
                                }
                                None => break,
                            }
                        }
                    }
                    Ok(response) => {
                        debug!(status = %response.status(), "Room subscription rejected");
                    }
                    Err(e) => {
                        debug!("Room subscription failed: {}", e);
                    }
                }
                if tx.send(TransportSignal::Disconnected).await.is_err() {
                    return;
                }
                // Receiver drop means the client left the room
                tokio::select! {
                    _ = tx.closed() => return,
                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                }
            }
        });

        Ok(rx)
    }

    async fn publish(&self, program_id: Uuid, envelope: RoomEnvelope) -> Result<()> {
        let url = format!("{}/api/rooms/{}/publish", self.base_url, program_id);
        let response = self
            .http
            .post(url)
            .header(LEARNER_ID_HEADER, self.learner_id.to_string())
            .header(LEARNER_ROLE_HEADER, self.role.as_str())
            .json(&envelope)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(read_error(response).await);
        }
        Ok(())
    }
}

/// One dispatched server-sent event
#[derive(Debug, PartialEq)]
struct SseFrame {
    event: String,
    data: String,
}

/// Incremental SSE frame parser
///
/// Handles chunk boundaries anywhere, including inside multi-byte
/// characters, by buffering raw bytes and only decoding complete lines.
/// Comment lines (keep-alives) and fields the feed never sends are
/// skipped.
#[derive(Debug, Default)]
struct SseParser {
    buffer: Vec<u8>,
    event: String,
    data: String,
}

impl SseParser {
    /// Feed raw bytes; returns every frame completed by this chunk
    fn push(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            self.take_line(line.trim_end_matches(|c| c == '\r' || c == '\n'), &mut frames);
        }
        frames
    }

    fn take_line(&mut self, line: &str, frames: &mut Vec<SseFrame>) {
        if line.is_empty() {
            // Blank line dispatches the pending frame
            if !self.data.is_empty() {
                frames.push(SseFrame {
                    event: std::mem::take(&mut self.event),
                    data: std::mem::take(&mut self.data),
                });
            } else {
                self.event.clear();
            }
        } else if line.starts_with(':') {
            // keep-alive comment
        } else if let Some(rest) = line.strip_prefix("event:") {
            self.event = rest.strip_prefix(' ').unwrap_or(rest).to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
}
