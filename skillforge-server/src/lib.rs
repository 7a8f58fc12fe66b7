//! skillforge-server library - progress, rewards and discussion core
//!
//! Owns the durable learning state (enrollments, completion facts, XP)
//! and the non-durable room broadcast layer on top of it.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;

pub mod api;
pub mod db;
pub mod grading;
pub mod progress;
pub mod rewards;
pub mod rooms;

use rooms::RoomRegistry;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// In-process room registry (rebuilt empty on restart)
    pub rooms: Arc<RoomRegistry>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, rooms: Arc<RoomRegistry>) -> Self {
        Self { db, rooms }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    let api = Router::new()
        .route(
            "/api/enrollments",
            get(api::enrollments::list_enrollments).post(api::enrollments::enroll),
        )
        .route(
            "/api/enrollments/:program_id",
            axum::routing::delete(api::enrollments::unenroll)
                .patch(api::enrollments::override_progress),
        )
        .route(
            "/api/episodes/:episode_id/complete",
            post(api::episodes::complete_episode),
        )
        .route("/api/quiz", get(api::quizzes::get_quiz))
        .route("/api/quiz/submit", post(api::quizzes::submit_quiz))
        .route("/api/rewards/claim", post(api::rewards::claim_reward))
        .route(
            "/api/discussion",
            get(api::discussion::list_messages)
                .post(api::discussion::post_message)
                .delete(api::discussion::wipe_room),
        )
        .route(
            "/api/discussion/:message_id/like",
            post(api::discussion::like_message),
        )
        .route("/api/rooms/:program_id/events", get(api::rooms::room_events))
        .route(
            "/api/rooms/:program_id/publish",
            post(api::rooms::publish_event),
        );

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
