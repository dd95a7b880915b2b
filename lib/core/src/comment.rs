use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteExecutor, SqlitePool};

use agora_auth::gate::require_user;
use agora_auth::user::User;
use agora_utils::checks::check_comment_content;
use agora_utils::errors::AppError;

#[derive(sqlx::FromRow, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub content: String,
    pub create_timestamp: DateTime<Utc>,
}

/// Every comment, oldest first.
pub async fn list_comments(
    executor: impl SqliteExecutor<'_>,
) -> Result<Vec<Comment>, AppError> {
    let comment_vec = sqlx::query_as::<_, Comment>(
        "SELECT c.comment_id, c.post_id, c.author_id, u.username AS author_name, c.content, c.create_timestamp
        FROM comments c
        JOIN users u ON u.user_id = c.author_id
        ORDER BY c.create_timestamp, c.comment_id"
    )
        .fetch_all(executor)
        .await
        .map_err(|e| AppError::repository("list_comments", e))?;

    Ok(comment_vec)
}

/// Adds a comment to `post_id`. Fails with [`AppError::NotFound`] when the post does not exist.
pub async fn create_comment(
    post_id: i64,
    content: &str,
    user: Option<&User>,
    db_pool: &SqlitePool,
) -> Result<Comment, AppError> {
    let user = require_user(user)?;
    check_comment_content(content)?;

    log::debug!("Create comment on post {post_id} for user {}", user.user_id);
    let create_timestamp = Utc::now();
    let comment_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO comments (post_id, author_id, content, create_timestamp)
        SELECT $1, $2, $3, $4
        WHERE EXISTS (SELECT 1 FROM posts WHERE post_id = $1)
        RETURNING comment_id"
    )
        .bind(post_id)
        .bind(user.user_id)
        .bind(content)
        .bind(create_timestamp)
        .fetch_optional(db_pool)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Comment {
        comment_id,
        post_id,
        author_id: user.user_id,
        author_name: user.username.clone(),
        content: String::from(content),
        create_timestamp,
    })
}
