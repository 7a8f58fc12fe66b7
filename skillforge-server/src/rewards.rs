//! Reward ledger: claim-once XP grants and level derivation
//!
//! XP changes exactly once per (learner, program): at claim time, after
//! the program is completed. The claim gate and the XP credit commit in
//! one transaction, so a failure at any point leaves both untouched.

use serde::Serialize;
use skillforge_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

/// XP per level step
const XP_PER_LEVEL: i64 = 1000;

/// Level derived from lifetime XP: one level per 1000 points, starting at 1
pub fn level_for_xp(xp: i64) -> i64 {
    xp / XP_PER_LEVEL + 1
}

/// Outcome of a successful reward claim
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RewardGrant {
    /// XP credited by this claim
    pub awarded: i64,
    /// Learner's XP total after the credit
    pub xp_points: i64,
    /// Learner's level after the credit
    pub level: i64,
    /// Whether this claim crossed a level boundary
    pub leveled_up: bool,
}

/// Claim the XP reward for a completed program
///
/// The gate is a single conditional UPDATE on the enrollment row; only
/// one claim can ever flip `xp_claimed`, so concurrent claims race to a
/// single winner and the losers read back the reason they lost. The
/// stored level only moves up, never down.
pub async fn claim_reward(
    pool: &SqlitePool,
    learner_id: Uuid,
    program_id: Uuid,
) -> Result<RewardGrant> {
    let mut tx = pool.begin().await?;

    let reward_points: i64 =
        sqlx::query_scalar("SELECT reward_points FROM programs WHERE id = ?")
            .bind(program_id.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("program {}", program_id)))?;

    let claimed = sqlx::query(
        r#"
        UPDATE enrollments SET xp_claimed = 1
        WHERE learner_id = ? AND program_id = ?
          AND completed = 1 AND xp_claimed = 0
        "#,
    )
    .bind(learner_id.to_string())
    .bind(program_id.to_string())
    .execute(&mut *tx)
    .await?;

    if claimed.rows_affected() == 0 {
        // Dropped transaction rolls back; nothing was granted
        let row = sqlx::query(
            "SELECT completed, xp_claimed FROM enrollments WHERE learner_id = ? AND program_id = ?",
        )
        .bind(learner_id.to_string())
        .bind(program_id.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        return match row {
            None => Err(Error::NotFound(format!(
                "enrollment in program {}",
                program_id
            ))),
            Some(row) => {
                let completed: i64 = row.get("completed");
                if completed == 0 {
                    Err(Error::PreconditionFailed(
                        "program is not completed yet".to_string(),
                    ))
                } else {
                    Err(Error::PreconditionFailed(
                        "reward already claimed".to_string(),
                    ))
                }
            }
        };
    }

    let before = sqlx::query("SELECT xp_points, level FROM learners WHERE id = ?")
        .bind(learner_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("learner {}", learner_id)))?;
    let old_level: i64 = before.get("level");

    // xp_points in the level expression reads the pre-update value, so
    // both columns move together in one statement
    sqlx::query(
        r#"
        UPDATE learners SET
            xp_points = xp_points + ?1,
            level = MAX(level, (xp_points + ?1) / ?2 + 1)
        WHERE id = ?3
        "#,
    )
    .bind(reward_points)
    .bind(XP_PER_LEVEL)
    .bind(learner_id.to_string())
    .execute(&mut *tx)
    .await?;

    let after = sqlx::query("SELECT xp_points, level FROM learners WHERE id = ?")
        .bind(learner_id.to_string())
        .fetch_one(&mut *tx)
        .await?;
    let xp_points: i64 = after.get("xp_points");
    let level: i64 = after.get("level");

    tx.commit().await?;

    let grant = RewardGrant {
        awarded: reward_points,
        xp_points,
        level,
        leveled_up: level > old_level,
    };

    info!(
        learner_id = %learner_id,
        program_id = %program_id,
        awarded = grant.awarded,
        xp_points = grant.xp_points,
        level = grant.level,
        "Reward claimed"
    );

    Ok(grant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use skillforge_common::db::init::create_all_tables;
    use skillforge_common::db::models::{Learner, Program};
    use skillforge_common::types::Role;

    #[test]
    fn test_level_steps() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(999), 1);
        assert_eq!(level_for_xp(1000), 2);
        assert_eq!(level_for_xp(1999), 2);
        assert_eq!(level_for_xp(2500), 3);
        assert_eq!(level_for_xp(10_000), 11);
    }

    async fn fixture(xp: i64, reward: i64) -> (SqlitePool, Uuid, Uuid) {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        create_all_tables(&pool).await.unwrap();

        let learner = Learner {
            id: Uuid::new_v4(),
            name: "Claimer".to_string(),
            email: "claimer@example.com".to_string(),
            role: Role::Student,
            avatar: None,
            xp_points: xp,
            level: level_for_xp(xp),
            created_at: Utc::now(),
        };
        crate::db::learners::save_learner(&pool, &learner).await.unwrap();

        let program = Program {
            id: Uuid::new_v4(),
            title: "Program".to_string(),
            reward_points: reward,
            created_at: Utc::now(),
        };
        crate::db::programs::save_program(&pool, &program).await.unwrap();

        crate::db::enrollments::enroll(&pool, learner.id, program.id)
            .await
            .unwrap();

        (pool, learner.id, program.id)
    }

    async fn complete(pool: &SqlitePool, learner_id: Uuid, program_id: Uuid) {
        crate::progress::set_manual_progress(pool, learner_id, program_id, Some(100), Some(true))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_claim_before_completion_rejected() {
        let (pool, learner_id, program_id) = fixture(0, 100).await;

        let err = claim_reward(&pool, learner_id, program_id).await.unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed(_)));

        // Nothing granted
        let xp: i64 = sqlx::query_scalar("SELECT xp_points FROM learners WHERE id = ?")
            .bind(learner_id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(xp, 0);
    }

    #[tokio::test]
    async fn test_claim_grants_once() {
        let (pool, learner_id, program_id) = fixture(0, 150).await;
        complete(&pool, learner_id, program_id).await;

        let grant = claim_reward(&pool, learner_id, program_id).await.unwrap();
        assert_eq!(grant.awarded, 150);
        assert_eq!(grant.xp_points, 150);
        assert_eq!(grant.level, 1);
        assert!(!grant.leveled_up);

        // Second claim is rejected and grants nothing
        let err = claim_reward(&pool, learner_id, program_id).await.unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed(_)));

        let xp: i64 = sqlx::query_scalar("SELECT xp_points FROM learners WHERE id = ?")
            .bind(learner_id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(xp, 150);
    }

    #[tokio::test]
    async fn test_claim_crossing_level_boundary() {
        let (pool, learner_id, program_id) = fixture(950, 100).await;
        complete(&pool, learner_id, program_id).await;

        let grant = claim_reward(&pool, learner_id, program_id).await.unwrap();
        assert_eq!(grant.xp_points, 1050);
        assert_eq!(grant.level, 2);
        assert!(grant.leveled_up);
    }

    #[tokio::test]
    async fn test_stored_level_never_drops() {
        let (pool, learner_id, program_id) = fixture(0, 100).await;
        complete(&pool, learner_id, program_id).await;

        // Learner holds a level above what their XP implies
        sqlx::query("UPDATE learners SET level = 5 WHERE id = ?")
            .bind(learner_id.to_string())
            .execute(&pool)
            .await
            .unwrap();

        let grant = claim_reward(&pool, learner_id, program_id).await.unwrap();
        assert_eq!(grant.level, 5);
        assert!(!grant.leveled_up);
    }

    #[tokio::test]
    async fn test_claim_unknown_program_is_not_found() {
        let (pool, learner_id, _) = fixture(0, 100).await;
        let err = claim_reward(&pool, learner_id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
