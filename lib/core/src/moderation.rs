use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use strum_macros::{Display, EnumString, IntoStaticStr};

use agora_auth::gate::{require_role, require_user};
use agora_auth::role::Role;
use agora_auth::user::{create_user, User};
use agora_utils::errors::AppError;

use crate::post::{delete_post, post_exists};

#[derive(Clone, Copy, Debug, Display, EnumString, Eq, Hash, IntoStaticStr, PartialEq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Granted,
    Declined,
}

#[derive(Clone, Copy, Debug, Display, EnumString, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CandidacyDecision {
    Grant,
    Decline,
}

#[derive(Clone, Copy, Debug, Display, EnumString, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FlagDecision {
    Delete,
    Clear,
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContentState {
    Active,
    Flagged,
    Deleted,
}

#[derive(sqlx::FromRow, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationRequest {
    pub request_id: i64,
    pub username: String,
    pub status: ModerationStatus,
    pub create_timestamp: DateTime<Utc>,
    pub resolve_timestamp: Option<DateTime<Utc>>,
}

/// Content of the admin moderation page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationPanel {
    pub pending_requests: Vec<ModerationRequest>,
    pub moderators: Vec<User>,
}

impl CandidacyDecision {
    pub fn resolved_status(self) -> ModerationStatus {
        match self {
            CandidacyDecision::Grant => ModerationStatus::Granted,
            CandidacyDecision::Decline => ModerationStatus::Declined,
        }
    }
}

impl FlagDecision {
    pub fn resolved_state(self) -> ContentState {
        match self {
            FlagDecision::Delete => ContentState::Deleted,
            FlagDecision::Clear => ContentState::Active,
        }
    }
}

/// Creates a user and, if it applies for moderation, its pending moderation request, in one transaction.
pub async fn register_user(
    username: &str,
    apply_for_moderation: bool,
    db_pool: &SqlitePool,
) -> Result<(User, Option<ModerationRequest>), AppError> {
    let mut tx = db_pool.begin().await?;

    let user = create_user(username, apply_for_moderation, &mut *tx).await?;
    let moderation_request = match apply_for_moderation {
        true => Some(insert_moderation_request(username, &mut *tx).await?),
        false => None,
    };

    tx.commit().await?;
    log::debug!("Registered user {username}, moderation request: {moderation_request:?}");

    Ok((user, moderation_request))
}

/// Files a moderation request for an existing user. If the user already has one, it is returned unchanged.
pub async fn apply_for_moderation(
    user: Option<&User>,
    db_pool: &SqlitePool,
) -> Result<ModerationRequest, AppError> {
    let user = require_user(user)?;
    if user.role >= Role::Moderator {
        return Err(AppError::invalid(format!("{} is already a {}.", user.username, user.role)));
    }

    let mut tx = db_pool.begin().await?;

    sqlx::query("UPDATE users SET moderation_application = TRUE WHERE user_id = $1")
        .bind(user.user_id)
        .execute(&mut *tx)
        .await?;
    let moderation_request = insert_moderation_request(&user.username, &mut *tx).await?;

    tx.commit().await?;

    Ok(moderation_request)
}

pub async fn get_moderation_request(
    username: &str,
    executor: impl SqliteExecutor<'_>,
) -> Result<ModerationRequest, AppError> {
    let moderation_request = sqlx::query_as::<_, ModerationRequest>(
        "SELECT * FROM moderation_requests WHERE username = $1"
    )
        .bind(username)
        .fetch_one(executor)
        .await?;

    Ok(moderation_request)
}

/// Pending requests, oldest first.
pub async fn get_pending_moderation_requests(
    executor: impl SqliteExecutor<'_>,
) -> Result<Vec<ModerationRequest>, AppError> {
    let request_vec = sqlx::query_as::<_, ModerationRequest>(
        "SELECT * FROM moderation_requests
        WHERE status = $1
        ORDER BY create_timestamp, request_id"
    )
        .bind(ModerationStatus::Pending)
        .fetch_all(executor)
        .await?;

    Ok(request_vec)
}

/// Grants or declines the pending moderation request of `username`. Only admins can resolve requests.
///
/// A request is resolved exactly once: resolving it again fails with [`AppError::AlreadyResolved`] and leaves the
/// role of the user unchanged. Granting promotes the user to moderator in the same transaction.
pub async fn resolve_moderation_request(
    username: &str,
    decision: CandidacyDecision,
    admin: Option<&User>,
    db_pool: &SqlitePool,
) -> Result<ModerationRequest, AppError> {
    let admin = require_role(admin, Role::Admin)?;

    let mut tx = db_pool.begin().await?;

    let resolved_request = sqlx::query_as::<_, ModerationRequest>(
        "UPDATE moderation_requests
        SET status = $1, resolve_timestamp = $2
        WHERE username = $3 AND status = $4
        RETURNING *"
    )
        .bind(decision.resolved_status())
        .bind(Utc::now())
        .bind(username)
        .bind(ModerationStatus::Pending)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(resolved_request) = resolved_request else {
        // The request either does not exist or was resolved before.
        get_moderation_request(username, &mut *tx).await?;
        return Err(AppError::AlreadyResolved);
    };

    if decision == CandidacyDecision::Grant {
        sqlx::query("UPDATE users SET role = $1 WHERE username = $2 AND role = $3")
            .bind(Role::Moderator)
            .bind(username)
            .bind(Role::User)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    log::info!("Admin {} resolved moderation request of {username} with {decision}", admin.username);

    Ok(resolved_request)
}

/// Demotes the moderator `username` back to user. Revoking a plain user is a no-op, admins cannot be demoted.
pub async fn revoke_moderator(
    username: &str,
    admin: Option<&User>,
    db_pool: &SqlitePool,
) -> Result<User, AppError> {
    let admin = require_role(admin, Role::Admin)?;

    let demoted_user = sqlx::query_as::<_, User>(
        "UPDATE users SET role = $1 WHERE username = $2 AND role = $3 RETURNING *"
    )
        .bind(Role::User)
        .bind(username)
        .bind(Role::Moderator)
        .fetch_optional(db_pool)
        .await?;

    if let Some(demoted_user) = demoted_user {
        log::info!("Admin {} revoked moderator status of {username}", admin.username);
        return Ok(demoted_user);
    }

    let user = User::get_by_username(username, db_pool).await?;
    match user.role {
        Role::Admin => Err(AppError::invalid(format!("Cannot revoke admin {username}."))),
        _ => Ok(user),
    }
}

/// Reports a post to the moderators. Flagging an already flagged post changes nothing.
pub async fn flag_post(
    post_id: i64,
    user: Option<&User>,
    db_pool: &SqlitePool,
) -> Result<ContentState, AppError> {
    let user = require_user(user)?;

    let result = sqlx::query("UPDATE posts SET flagged = TRUE WHERE post_id = $1")
        .bind(post_id)
        .execute(db_pool)
        .await?;

    match result.rows_affected() {
        0 => Err(AppError::NotFound),
        _ => {
            log::debug!("User {} flagged post {post_id}", user.user_id);
            Ok(ContentState::Flagged)
        },
    }
}

/// Applies a moderator decision to a post: deletion is allowed in any state, clearing only when the post is flagged.
pub async fn resolve_flag(
    post_id: i64,
    decision: FlagDecision,
    moderator: Option<&User>,
    db_pool: &SqlitePool,
) -> Result<ContentState, AppError> {
    let moderator = require_role(moderator, Role::Moderator)?;

    match decision {
        FlagDecision::Delete => delete_post(post_id, db_pool).await?,
        FlagDecision::Clear => {
            let result = sqlx::query("UPDATE posts SET flagged = FALSE WHERE post_id = $1 AND flagged")
                .bind(post_id)
                .execute(db_pool)
                .await?;

            if result.rows_affected() == 0 {
                return match post_exists(post_id, db_pool).await? {
                    true => Err(AppError::AlreadyResolved),
                    false => Err(AppError::NotFound),
                };
            }
        },
    };

    log::debug!("Moderator {} resolved flag of post {post_id} with {decision}", moderator.username);
    Ok(decision.resolved_state())
}

/// Pending moderation requests and current moderators, for admins only.
pub async fn load_moderation_panel(
    admin: Option<&User>,
    db_pool: &SqlitePool,
) -> Result<ModerationPanel, AppError> {
    require_role(admin, Role::Admin)?;

    let pending_requests = get_pending_moderation_requests(db_pool).await?;
    let moderators = sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = $1 ORDER BY username")
        .bind(Role::Moderator)
        .fetch_all(db_pool)
        .await?;

    Ok(ModerationPanel {
        pending_requests,
        moderators,
    })
}

async fn insert_moderation_request(
    username: &str,
    db_conn: &mut SqliteConnection,
) -> Result<ModerationRequest, AppError> {
    let inserted_request = sqlx::query_as::<_, ModerationRequest>(
        "INSERT INTO moderation_requests (username, status, create_timestamp)
        VALUES ($1, $2, $3)
        ON CONFLICT (username) DO NOTHING
        RETURNING *"
    )
        .bind(username)
        .bind(ModerationStatus::Pending)
        .bind(Utc::now())
        .fetch_optional(&mut *db_conn)
        .await?;

    match inserted_request {
        Some(moderation_request) => Ok(moderation_request),
        None => get_moderation_request(username, &mut *db_conn).await,
    }
}

#[cfg(test)]
mod tests {
    use crate::moderation::{CandidacyDecision, ContentState, FlagDecision, ModerationStatus};

    #[test]
    fn test_candidacy_decision_resolved_status() {
        assert_eq!(CandidacyDecision::Grant.resolved_status(), ModerationStatus::Granted);
        assert_eq!(CandidacyDecision::Decline.resolved_status(), ModerationStatus::Declined);
    }

    #[test]
    fn test_flag_decision_resolved_state() {
        assert_eq!(FlagDecision::Delete.resolved_state(), ContentState::Deleted);
        assert_eq!(FlagDecision::Clear.resolved_state(), ContentState::Active);
    }

    #[test]
    fn test_moderation_status_display() {
        assert_eq!(ModerationStatus::Pending.to_string(), "pending");
        assert_eq!(ModerationStatus::Granted.to_string(), "granted");
        assert_eq!(ModerationStatus::Declined.to_string(), "declined");
    }
}
