//! Room broadcast endpoints: SSE subscription and the publish relay
//!
//! Subscribing is joining the room; dropping the stream is leaving.
//! The relay holds no state and persists nothing; a restart only costs
//! in-flight echoes, which polling clients recover from the store.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use skillforge_common::events::{RoomEnvelope, RoomEvent};
use skillforge_common::Error;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ApiResult, Identity};
use crate::{db, AppState};

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    /// Subscriber's session id; envelopes it originated are filtered out
    pub session: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub origin: Option<Uuid>,
    pub event: RoomEvent,
}

#[derive(Debug, Serialize)]
pub struct PublishReceipt {
    /// Subscribers the envelope was handed to
    pub delivered: usize,
}

/// GET /api/rooms/:program_id/events?session= - join a room
pub async fn room_events(
    State(state): State<AppState>,
    Path(program_id): Path<Uuid>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if !db::programs::program_exists(&state.db, program_id).await? {
        return Err(Error::NotFound(format!("program {}", program_id)).into());
    }

    let rx = state.rooms.subscribe(program_id).await;
    let session = query.session;

    let members = state.rooms.member_count(program_id).await;
    debug!(
        program_id = %program_id,
        members,
        "Room subscriber joined"
    );

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(envelope) => {
                if let Some(session) = session {
                    if !envelope.visible_to(session) {
                        return None;
                    }
                }
                Event::default()
                    .event(envelope.event.event_type())
                    .json_data(&envelope.event)
                    .ok()
                    .map(Ok)
            }
            Err(e) => {
                // Lagged subscriber; skipped events are recovered on the
                // client's next store fetch
                warn!("Room subscriber lagged: {:?}", e);
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    ))
}

/// POST /api/rooms/:program_id/publish - relay an event to the room
///
/// Relay only: the event must describe already-persisted state. An empty
/// message body is rejected the same way the durable path rejects it.
pub async fn publish_event(
    State(state): State<AppState>,
    _identity: Identity,
    Path(program_id): Path<Uuid>,
    Json(request): Json<PublishRequest>,
) -> ApiResult<(StatusCode, Json<PublishReceipt>)> {
    if let RoomEvent::MessagePosted { message } = &request.event {
        if message.message.trim().is_empty() {
            return Err(Error::InvalidInput("message must not be empty".to_string()).into());
        }
    }
    if !db::programs::program_exists(&state.db, program_id).await? {
        return Err(Error::NotFound(format!("program {}", program_id)).into());
    }

    let envelope = RoomEnvelope::new(request.origin, request.event);
    let delivered = state.rooms.publish(program_id, envelope).await;

    Ok((StatusCode::ACCEPTED, Json(PublishReceipt { delivered })))
}
