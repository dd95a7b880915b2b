#![allow(dead_code)]

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use agora_auth::user::User;
use agora_core::comment::{create_comment, Comment};
use agora_core::post::{create_post, Post};
use agora_core::vote::{cast_vote, VoteDirection, VoteTarget};

pub async fn create_post_with_categories(
    content: &str,
    category_ids: &[i64],
    user: &User,
    db_pool: &SqlitePool,
) -> Post {
    create_post(content, category_ids, Some(user), db_pool).await.expect("Should be able to create post.")
}

pub async fn create_simple_post(user: &User, db_pool: &SqlitePool) -> Post {
    create_post_with_categories("post", &[], user, db_pool).await
}

pub async fn create_post_with_comment(
    user: &User,
    db_pool: &SqlitePool,
) -> (Post, Comment) {
    let post = create_simple_post(user, db_pool).await;
    let comment = create_comment(post.post_id, "comment", Some(user), db_pool).await.expect("Should be able to create comment.");
    (post, comment)
}

/// Creates `num_posts` posts, each with a comment, every post liked by `user`.
pub async fn create_liked_posts(
    num_posts: usize,
    user: &User,
    db_pool: &SqlitePool,
) -> Vec<(Post, Comment)> {
    let mut post_comment_vec = Vec::with_capacity(num_posts);
    for _ in 0..num_posts {
        let (post, comment) = create_post_with_comment(user, db_pool).await;
        cast_vote(VoteTarget::Post(post.post_id), VoteDirection::Like, user.user_id, db_pool).await.expect("Should be able to vote.");
        post_comment_vec.push((post, comment));
    }
    post_comment_vec
}

pub async fn set_post_timestamp(
    post_id: i64,
    create_timestamp: DateTime<Utc>,
    db_pool: &SqlitePool,
) {
    sqlx::query("UPDATE posts SET create_timestamp = $1 WHERE post_id = $2")
        .bind(create_timestamp)
        .bind(post_id)
        .execute(db_pool)
        .await
        .expect("Should be able to set post timestamp.");
}

pub async fn set_comment_timestamp(
    comment_id: i64,
    create_timestamp: DateTime<Utc>,
    db_pool: &SqlitePool,
) {
    sqlx::query("UPDATE comments SET create_timestamp = $1 WHERE comment_id = $2")
        .bind(create_timestamp)
        .bind(comment_id)
        .execute(db_pool)
        .await
        .expect("Should be able to set comment timestamp.");
}
