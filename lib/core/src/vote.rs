use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteExecutor, SqlitePool};
use strum_macros::{Display, EnumString, IntoStaticStr};

use agora_auth::gate::require_user;
use agora_auth::user::User;
use agora_utils::errors::AppError;

#[derive(Clone, Copy, Debug, Display, EnumString, Eq, Hash, IntoStaticStr, PartialEq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VoteDirection {
    Like,
    Dislike,
}

#[derive(Clone, Copy, Debug, Display, EnumString, Eq, Hash, IntoStaticStr, PartialEq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TargetKind {
    Post,
    Comment,
}

/// Content that can receive votes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum VoteTarget {
    Post(i64),
    Comment(i64),
}

#[derive(sqlx::FromRow, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub vote_id: i64,
    pub target_id: i64,
    pub target_kind: TargetKind,
    pub voter_id: i64,
    pub direction: VoteDirection,
    pub timestamp: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    pub like_count: i64,
    pub dislike_count: i64,
}

/// Source of live vote counts, implemented by the database pool and by stubs in tests.
#[async_trait]
pub trait VoteCounter: Sync {
    async fn vote_count(&self, target: VoteTarget) -> Result<VoteCount, AppError>;
}

impl VoteTarget {
    pub fn new(target_id: i64, target_kind: TargetKind) -> Self {
        match target_kind {
            TargetKind::Post => VoteTarget::Post(target_id),
            TargetKind::Comment => VoteTarget::Comment(target_id),
        }
    }

    pub fn id(self) -> i64 {
        match self {
            VoteTarget::Post(post_id) => post_id,
            VoteTarget::Comment(comment_id) => comment_id,
        }
    }

    pub fn kind(self) -> TargetKind {
        match self {
            VoteTarget::Post(_) => TargetKind::Post,
            VoteTarget::Comment(_) => TargetKind::Comment,
        }
    }
}

impl Vote {
    pub fn target(&self) -> VoteTarget {
        VoteTarget::new(self.target_id, self.target_kind)
    }
}

const VOTE_UPSERT_SELECT: &str =
    "INSERT INTO votes (target_id, target_kind, voter_id, direction, timestamp)
    SELECT $1, $2, $3, $4, $5
    WHERE EXISTS (";
const VOTE_UPSERT_CONFLICT: &str = ")
    ON CONFLICT (target_id, target_kind, voter_id) DO UPDATE
        SET direction = excluded.direction,
            timestamp = excluded.timestamp
        WHERE votes.direction != excluded.direction";

#[async_trait]
impl VoteCounter for SqlitePool {
    async fn vote_count(&self, target: VoteTarget) -> Result<VoteCount, AppError> {
        get_vote_count(target, self).await
    }
}

/// Records the vote of `voter_id` on `target` and returns the refreshed counts of the target.
///
/// A voter has at most one vote per target: a vote in the other direction replaces the previous one,
/// a vote in the same direction leaves the stored row untouched. The upsert and the recount run in one transaction.
pub async fn cast_vote(
    target: VoteTarget,
    direction: VoteDirection,
    voter_id: i64,
    db_pool: &SqlitePool,
) -> Result<VoteCount, AppError> {
    let upsert_query = match target {
        VoteTarget::Post(_) => concatcp!(VOTE_UPSERT_SELECT, "SELECT 1 FROM posts WHERE post_id = $1", VOTE_UPSERT_CONFLICT),
        VoteTarget::Comment(_) => concatcp!(VOTE_UPSERT_SELECT, "SELECT 1 FROM comments WHERE comment_id = $1", VOTE_UPSERT_CONFLICT),
    };

    let mut tx = db_pool.begin().await?;

    // The upsert comes first so the transaction starts with the write lock.
    log::debug!("Cast vote {direction} on {target:?} for user {voter_id}");
    let result = sqlx::query(upsert_query)
        .bind(target.id())
        .bind(target.kind())
        .bind(voter_id)
        .bind(direction)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        // Either the target is missing or the vote is repeated.
        check_target_exists(target, &mut *tx).await?;
    }

    let vote_count = get_vote_count(target, &mut *tx).await?;

    tx.commit().await?;

    Ok(vote_count)
}

/// Votes on behalf of the session's user, anonymous visitors cannot vote.
pub async fn vote_on_content(
    target: VoteTarget,
    direction: VoteDirection,
    user: Option<&User>,
    db_pool: &SqlitePool,
) -> Result<VoteCount, AppError> {
    let user = require_user(user)?;
    cast_vote(target, direction, user.user_id, db_pool).await
}

/// Number of votes in `direction` on `target`, 0 when nobody voted.
pub async fn count_votes(
    target: VoteTarget,
    direction: VoteDirection,
    executor: impl SqliteExecutor<'_>,
) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM votes
        WHERE target_id = $1 AND target_kind = $2 AND direction = $3"
    )
        .bind(target.id())
        .bind(target.kind())
        .bind(direction)
        .fetch_one(executor)
        .await?;

    Ok(count)
}

pub async fn get_vote_count(
    target: VoteTarget,
    executor: impl SqliteExecutor<'_>,
) -> Result<VoteCount, AppError> {
    let vote_count = sqlx::query_as::<_, VoteCount>(
        "SELECT
            COALESCE(SUM(direction = 'like'), 0) AS like_count,
            COALESCE(SUM(direction = 'dislike'), 0) AS dislike_count
        FROM votes
        WHERE target_id = $1 AND target_kind = $2"
    )
        .bind(target.id())
        .bind(target.kind())
        .fetch_one(executor)
        .await?;

    Ok(vote_count)
}

pub async fn get_vote(
    target: VoteTarget,
    voter_id: i64,
    executor: impl SqliteExecutor<'_>,
) -> Result<Option<Vote>, AppError> {
    let vote = sqlx::query_as::<_, Vote>(
        "SELECT * FROM votes
        WHERE target_id = $1 AND target_kind = $2 AND voter_id = $3"
    )
        .bind(target.id())
        .bind(target.kind())
        .bind(voter_id)
        .fetch_optional(executor)
        .await?;

    Ok(vote)
}

/// Every vote of `voter_id`, keyed by target.
pub async fn get_viewer_votes(
    voter_id: i64,
    executor: impl SqliteExecutor<'_>,
) -> Result<HashMap<VoteTarget, VoteDirection>, AppError> {
    let vote_vec = sqlx::query_as::<_, Vote>("SELECT * FROM votes WHERE voter_id = $1")
        .bind(voter_id)
        .fetch_all(executor)
        .await?;

    Ok(vote_vec.into_iter().map(|vote| (vote.target(), vote.direction)).collect())
}

/// Deletes the votes on a post and on all of its comments. Must run before the post itself is deleted.
pub async fn delete_post_votes(
    post_id: i64,
    executor: impl SqliteExecutor<'_>,
) -> Result<u64, AppError> {
    let result = sqlx::query(
        "DELETE FROM votes
        WHERE (target_kind = $1 AND target_id = $3)
           OR (target_kind = $2 AND target_id IN (SELECT comment_id FROM comments WHERE post_id = $3))"
    )
        .bind(TargetKind::Post)
        .bind(TargetKind::Comment)
        .bind(post_id)
        .execute(executor)
        .await?;

    log::debug!("Deleted {} votes of post {post_id}", result.rows_affected());
    Ok(result.rows_affected())
}

async fn check_target_exists(
    target: VoteTarget,
    executor: impl SqliteExecutor<'_>,
) -> Result<(), AppError> {
    let query = match target {
        VoteTarget::Post(_) => "SELECT EXISTS (SELECT 1 FROM posts WHERE post_id = $1)",
        VoteTarget::Comment(_) => "SELECT EXISTS (SELECT 1 FROM comments WHERE comment_id = $1)",
    };
    let exists = sqlx::query_scalar::<_, i64>(query)
        .bind(target.id())
        .fetch_one(executor)
        .await?;

    match exists {
        0 => Err(AppError::NotFound),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::vote::{TargetKind, Vote, VoteDirection, VoteTarget};

    #[test]
    fn test_vote_target_new() {
        assert_eq!(VoteTarget::new(7, TargetKind::Post), VoteTarget::Post(7));
        assert_eq!(VoteTarget::new(3, TargetKind::Comment), VoteTarget::Comment(3));
        assert_eq!(VoteTarget::Post(7).id(), 7);
        assert_eq!(VoteTarget::Post(7).kind(), TargetKind::Post);
        assert_eq!(VoteTarget::Comment(3).id(), 3);
        assert_eq!(VoteTarget::Comment(3).kind(), TargetKind::Comment);
    }

    #[test]
    fn test_vote_target() {
        let vote = Vote {
            vote_id: 1,
            target_id: 12,
            target_kind: TargetKind::Comment,
            voter_id: 2,
            direction: VoteDirection::Like,
            timestamp: chrono::Utc::now(),
        };
        assert_eq!(vote.target(), VoteTarget::Comment(12));
    }

    #[test]
    fn test_vote_direction_strings() {
        assert_eq!(VoteDirection::Like.to_string(), "like");
        assert_eq!(VoteDirection::Dislike.to_string(), "dislike");
        assert_eq!(VoteDirection::from_str("dislike"), Ok(VoteDirection::Dislike));
        assert!(VoteDirection::from_str("meh").is_err());
    }

    #[test]
    fn test_vote_target_serde() {
        let target_json = serde_json::to_string(&VoteTarget::Post(7)).expect("Target should serialize.");
        assert_eq!(target_json, r#"{"kind":"post","id":7}"#);
        let target: VoteTarget = serde_json::from_str(r#"{"kind":"comment","id":4}"#).expect("Target should deserialize.");
        assert_eq!(target, VoteTarget::Comment(4));
    }
}
