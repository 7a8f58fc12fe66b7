//! Discussion message persistence
//!
//! The durable side of the room layer. Broadcast only ever echoes state
//! that was first written here.

use chrono::Utc;
use skillforge_common::types::{DiscussionMessage, LikeReceipt, MessageAuthor};
use skillforge_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};

fn map_message(row: &sqlx::sqlite::SqliteRow) -> Result<DiscussionMessage> {
    let id_str: String = row.get("id");
    let program_str: String = row.get("program_id");
    let learner_str: String = row.get("learner_id");
    let created_str: String = row.get("created_at");

    Ok(DiscussionMessage {
        id: parse_uuid("message", &id_str)?,
        program_id: parse_uuid("message.program_id", &program_str)?,
        author: MessageAuthor {
            id: parse_uuid("message.learner_id", &learner_str)?,
            name: row.get("author_name"),
            avatar: row.get("author_avatar"),
        },
        message: row.get("message"),
        likes: row.get("likes"),
        created_at: parse_timestamp("message.created_at", &created_str)?,
    })
}

const MESSAGE_COLUMNS: &str = r#"
    m.id, m.program_id, m.learner_id, m.message, m.likes, m.created_at,
    l.name AS author_name, l.avatar AS author_avatar
"#;

/// Persist a new message and return the authoritative record
pub async fn post_message(
    pool: &SqlitePool,
    program_id: Uuid,
    learner_id: Uuid,
    message: &str,
) -> Result<DiscussionMessage> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO discussion_messages (id, program_id, learner_id, message, likes, created_at)
        VALUES (?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(program_id.to_string())
    .bind(learner_id.to_string())
    .bind(message)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    let sql = format!(
        r#"
        SELECT {MESSAGE_COLUMNS}
        FROM discussion_messages m
        JOIN learners l ON l.id = m.learner_id
        WHERE m.id = ?
        "#
    );
    let row = sqlx::query(&sql).bind(id.to_string()).fetch_one(pool).await?;

    map_message(&row)
}

/// Load one message
pub async fn get_message(pool: &SqlitePool, id: Uuid) -> Result<Option<DiscussionMessage>> {
    let sql = format!(
        r#"
        SELECT {MESSAGE_COLUMNS}
        FROM discussion_messages m
        JOIN learners l ON l.id = m.learner_id
        WHERE m.id = ?
        "#
    );
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(map_message(&row)?)),
        None => Ok(None),
    }
}

/// List the newest `limit` messages of a room, served oldest-first
///
/// Serving the newest window (rather than the oldest) keeps polling
/// clients converging in rooms that have outgrown the window.
pub async fn list_messages(
    pool: &SqlitePool,
    program_id: Uuid,
    limit: i64,
) -> Result<Vec<DiscussionMessage>> {
    let sql = format!(
        r#"
        SELECT * FROM (
            SELECT {MESSAGE_COLUMNS}
            FROM discussion_messages m
            JOIN learners l ON l.id = m.learner_id
            WHERE m.program_id = ?
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT ?
        )
        ORDER BY created_at ASC, id ASC
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(program_id.to_string())
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_message).collect()
}

/// Atomically increment a message's like counter
///
/// The increment happens inside the UPDATE, so concurrent likes from
/// different sessions all land. Returns None when the message is gone.
pub async fn like_message(pool: &SqlitePool, id: Uuid) -> Result<Option<LikeReceipt>> {
    let updated = sqlx::query("UPDATE discussion_messages SET likes = likes + 1 WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if updated.rows_affected() == 0 {
        return Ok(None);
    }

    let likes: i64 = sqlx::query_scalar("SELECT likes FROM discussion_messages WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;

    Ok(Some(LikeReceipt { id, likes }))
}

/// Delete every message in a room (administrative wipe)
pub async fn clear_messages(pool: &SqlitePool, program_id: Uuid) -> Result<u64> {
    let deleted = sqlx::query("DELETE FROM discussion_messages WHERE program_id = ?")
        .bind(program_id.to_string())
        .execute(pool)
        .await?;

    Ok(deleted.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillforge_common::db::init::create_all_tables;
    use skillforge_common::db::models::{Learner, Program};
    use skillforge_common::types::Role;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        create_all_tables(&pool).await.unwrap();
        pool
    }

    async fn seed_room(pool: &SqlitePool) -> (Uuid, Uuid) {
        let learner = Learner {
            id: Uuid::new_v4(),
            name: "Poster".to_string(),
            email: format!("{}@example.com", Uuid::new_v4()),
            role: Role::Student,
            avatar: None,
            xp_points: 0,
            level: 1,
            created_at: Utc::now(),
        };
        crate::db::learners::save_learner(pool, &learner).await.unwrap();

        let program = Program {
            id: Uuid::new_v4(),
            title: "Room".to_string(),
            reward_points: 100,
            created_at: Utc::now(),
        };
        crate::db::programs::save_program(pool, &program).await.unwrap();

        (learner.id, program.id)
    }

    #[tokio::test]
    async fn test_post_returns_authoritative_record() {
        let pool = test_pool().await;
        let (learner_id, program_id) = seed_room(&pool).await;

        let message = post_message(&pool, program_id, learner_id, "hello room")
            .await
            .unwrap();

        assert_eq!(message.message, "hello room");
        assert_eq!(message.likes, 0);
        assert_eq!(message.author.id, learner_id);
        assert_eq!(message.author.name, "Poster");
    }

    #[tokio::test]
    async fn test_list_serves_newest_window_oldest_first() {
        let pool = test_pool().await;
        let (learner_id, program_id) = seed_room(&pool).await;

        for i in 0..5 {
            post_message(&pool, program_id, learner_id, &format!("msg {}", i))
                .await
                .unwrap();
            // Distinct timestamps keep the ordering deterministic
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let window = list_messages(&pool, program_id, 3).await.unwrap();
        let texts: Vec<_> = window.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["msg 2", "msg 3", "msg 4"]);
    }

    #[tokio::test]
    async fn test_like_increments_and_missing_is_none() {
        let pool = test_pool().await;
        let (learner_id, program_id) = seed_room(&pool).await;

        let message = post_message(&pool, program_id, learner_id, "like me")
            .await
            .unwrap();

        let first = like_message(&pool, message.id).await.unwrap().unwrap();
        assert_eq!(first.likes, 1);
        let second = like_message(&pool, message.id).await.unwrap().unwrap();
        assert_eq!(second.likes, 2);

        assert!(like_message(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_wipes_only_this_room() {
        let pool = test_pool().await;
        let (learner_id, program_a) = seed_room(&pool).await;
        let (_, program_b) = seed_room(&pool).await;

        post_message(&pool, program_a, learner_id, "a1").await.unwrap();
        post_message(&pool, program_a, learner_id, "a2").await.unwrap();
        post_message(&pool, program_b, learner_id, "b1").await.unwrap();

        let wiped = clear_messages(&pool, program_a).await.unwrap();
        assert_eq!(wiped, 2);

        assert!(list_messages(&pool, program_a, 50).await.unwrap().is_empty());
        assert_eq!(list_messages(&pool, program_b, 50).await.unwrap().len(), 1);
    }
}
