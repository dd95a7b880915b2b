use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};

use agora_auth::gate::require_user;
use agora_auth::user::User;
use agora_utils::checks::{check_category_selection, check_post_content};
use agora_utils::errors::AppError;

use crate::category::{add_post_categories, check_category_ids, get_post_category_map};
use crate::vote::{delete_post_votes, TargetKind, VoteDirection};

const POST_SELECT: &str =
    "SELECT p.post_id, p.author_id, u.username AS author_name, p.content, p.flagged, p.create_timestamp
    FROM posts p
    JOIN users u ON u.user_id = p.author_id";
const POST_ORDER_BY: &str = " ORDER BY p.create_timestamp DESC, p.post_id DESC";

#[derive(sqlx::FromRow, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub content: String,
    pub flagged: bool,
    pub create_timestamp: DateTime<Utc>,
    #[sqlx(skip)]
    pub category_ids: Vec<i64>,
}

/// Which posts to list. Usernames are resolved against the users table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostScope {
    All,
    ByAuthor(String),
    LikedBy(String),
}

/// Lists posts in `scope`, newest first with ties broken by descending id.
pub async fn list_posts(
    scope: &PostScope,
    db_pool: &SqlitePool,
) -> Result<Vec<Post>, AppError> {
    let post_vec = match scope {
        PostScope::All => {
            sqlx::query_as::<_, Post>(concatcp!(POST_SELECT, POST_ORDER_BY))
                .fetch_all(db_pool)
                .await
        },
        PostScope::ByAuthor(username) => {
            sqlx::query_as::<_, Post>(concatcp!(POST_SELECT, " WHERE u.username = $1", POST_ORDER_BY))
                .bind(username)
                .fetch_all(db_pool)
                .await
        },
        PostScope::LikedBy(username) => {
            sqlx::query_as::<_, Post>(concatcp!(
                POST_SELECT,
                " JOIN votes v ON v.target_id = p.post_id AND v.target_kind = $1 AND v.direction = $2
                JOIN users voter ON voter.user_id = v.voter_id
                WHERE voter.username = $3",
                POST_ORDER_BY,
            ))
                .bind(TargetKind::Post)
                .bind(VoteDirection::Like)
                .bind(username)
                .fetch_all(db_pool)
                .await
        },
    }.map_err(|e| AppError::repository("list_posts", e))?;

    with_categories(post_vec, db_pool).await
}

/// Posts tagged with at least one of `category_ids`. Each post appears once however many of its categories match.
///
/// Malformed or unknown category ids fail with [`AppError::InvalidInput`] before posts are queried.
pub async fn filter_by_categories(
    category_ids: &HashSet<i64>,
    db_pool: &SqlitePool,
) -> Result<Vec<Post>, AppError> {
    if category_ids.is_empty() {
        return Ok(Vec::new());
    }

    let category_id_set: BTreeSet<i64> = category_ids.iter().copied().collect();
    check_category_selection(&category_id_set.iter().copied().collect::<Vec<i64>>())?;
    check_category_ids(&category_id_set, db_pool).await?;

    let mut query_builder = QueryBuilder::<Sqlite>::new(concatcp!(
        POST_SELECT,
        " WHERE EXISTS (
            SELECT 1 FROM post_categories pc
            WHERE pc.post_id = p.post_id AND pc.category_id IN ("
    ));
    let mut separated = query_builder.separated(", ");
    for category_id in category_id_set {
        separated.push_bind(category_id);
    }
    separated.push_unseparated("))");
    query_builder.push(POST_ORDER_BY);

    let post_vec = query_builder
        .build_query_as::<Post>()
        .fetch_all(db_pool)
        .await
        .map_err(|e| AppError::repository("filter_by_categories", e))?;

    with_categories(post_vec, db_pool).await
}

/// Posts waiting for a moderator decision.
pub async fn reported_posts(db_pool: &SqlitePool) -> Result<Vec<Post>, AppError> {
    let post_vec = sqlx::query_as::<_, Post>(concatcp!(POST_SELECT, " WHERE p.flagged", POST_ORDER_BY))
        .fetch_all(db_pool)
        .await
        .map_err(|e| AppError::repository("reported_posts", e))?;

    with_categories(post_vec, db_pool).await
}

pub async fn count_reported_posts(executor: impl SqliteExecutor<'_>) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE flagged")
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::repository("count_reported_posts", e))
}

pub async fn get_post_by_id(
    post_id: i64,
    db_pool: &SqlitePool,
) -> Result<Post, AppError> {
    let post = sqlx::query_as::<_, Post>(concatcp!(POST_SELECT, " WHERE p.post_id = $1"))
        .bind(post_id)
        .fetch_optional(db_pool)
        .await
        .map_err(|e| AppError::repository("get_post_by_id", e))?
        .ok_or(AppError::NotFound)?;

    let mut post_vec = with_categories(vec![post], db_pool).await?;
    post_vec.pop().ok_or(AppError::NotFound)
}

pub async fn post_exists(
    post_id: i64,
    executor: impl SqliteExecutor<'_>,
) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT EXISTS (SELECT 1 FROM posts WHERE post_id = $1)")
        .bind(post_id)
        .fetch_one(executor)
        .await?;

    Ok(exists != 0)
}

/// Creates a post tagged with `category_ids`. Content and categories are validated before anything is written.
pub async fn create_post(
    content: &str,
    category_ids: &[i64],
    user: Option<&User>,
    db_pool: &SqlitePool,
) -> Result<Post, AppError> {
    let user = require_user(user)?;
    check_post_content(content)?;
    check_category_selection(category_ids)?;
    let category_id_set: BTreeSet<i64> = category_ids.iter().copied().collect();
    check_category_ids(&category_id_set, db_pool).await?;

    let mut tx = db_pool.begin().await?;

    log::debug!("Create post for user {} with categories {category_id_set:?}", user.user_id);
    let create_timestamp = Utc::now();
    let post_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO posts (author_id, content, flagged, create_timestamp)
        VALUES ($1, $2, FALSE, $3)
        RETURNING post_id"
    )
        .bind(user.user_id)
        .bind(content)
        .bind(create_timestamp)
        .fetch_one(&mut *tx)
        .await?;

    add_post_categories(post_id, &category_id_set, &mut *tx).await?;

    tx.commit().await?;

    Ok(Post {
        post_id,
        author_id: user.user_id,
        author_name: user.username.clone(),
        content: String::from(content),
        flagged: false,
        create_timestamp,
        category_ids: category_id_set.into_iter().collect(),
    })
}

/// Removes a post with its votes, the votes on its comments, its comments and its category tags.
pub async fn delete_post(
    post_id: i64,
    db_pool: &SqlitePool,
) -> Result<(), AppError> {
    let mut tx = db_pool.begin().await?;

    delete_post_votes(post_id, &mut *tx).await?;

    let result = sqlx::query("DELETE FROM posts WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    tx.commit().await?;
    log::debug!("Deleted post {post_id}");

    Ok(())
}

async fn with_categories(
    mut post_vec: Vec<Post>,
    executor: impl SqliteExecutor<'_>,
) -> Result<Vec<Post>, AppError> {
    let post_ids: Vec<i64> = post_vec.iter().map(|post| post.post_id).collect();
    let mut category_map = get_post_category_map(&post_ids, executor).await?;
    for post in &mut post_vec {
        post.category_ids = category_map.remove(&post.post_id).unwrap_or_default();
    }
    Ok(post_vec)
}
