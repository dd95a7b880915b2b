//! Assembly of the display model: posts joined with their comments, live vote counts and relative creation times.
//!
//! The display model is rebuilt on every request and never persisted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use agora_auth::user::User;
use agora_utils::errors::AppError;
use agora_utils::time::get_elapsed_time_string;

use crate::comment::{list_comments, Comment};
use crate::post::Post;
use crate::vote::{get_viewer_votes, VoteCount, VoteCounter, VoteDirection, VoteTarget};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayComment {
    pub comment: Comment,
    pub like_count: i64,
    pub dislike_count: i64,
    pub posted_ago: String,
    /// Vote of the viewer on this comment, always `None` for anonymous viewers.
    pub viewer_vote: Option<VoteDirection>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayPost {
    pub post: Post,
    pub like_count: i64,
    pub dislike_count: i64,
    pub posted_ago: String,
    pub comment_count: usize,
    pub comments: Vec<DisplayComment>,
    /// Vote of the viewer on this post, always `None` for anonymous viewers.
    pub viewer_vote: Option<VoteDirection>,
}

/// Joins `posts` with `comments` and their vote counts.
///
/// Comments are attached to the post matching their `post_id`, in the order they are given. Comments whose post is
/// not part of `posts` are dropped. `viewer_votes` is `None` for anonymous viewers, in which case no vote of the
/// viewer is reported. If any vote count cannot be loaded, the whole aggregation fails with [`AppError::AggregationError`].
pub async fn build_display_model(
    posts: Vec<Post>,
    comments: Vec<Comment>,
    now: DateTime<Utc>,
    viewer_votes: Option<&HashMap<VoteTarget, VoteDirection>>,
    vote_counter: &impl VoteCounter,
) -> Result<Vec<DisplayPost>, AppError> {
    let mut comment_map = HashMap::<i64, Vec<Comment>>::new();
    for comment in comments {
        comment_map.entry(comment.post_id).or_default().push(comment);
    }

    let mut display_post_vec = Vec::with_capacity(posts.len());
    for post in posts {
        let mut display_comment_vec = Vec::new();
        for comment in comment_map.remove(&post.post_id).unwrap_or_default() {
            let target = VoteTarget::Comment(comment.comment_id);
            let vote_count = load_vote_count(target, vote_counter).await?;
            display_comment_vec.push(DisplayComment {
                like_count: vote_count.like_count,
                dislike_count: vote_count.dislike_count,
                posted_ago: get_elapsed_time_string(comment.create_timestamp, now),
                viewer_vote: get_viewer_vote(target, viewer_votes),
                comment,
            });
        }

        let target = VoteTarget::Post(post.post_id);
        let vote_count = load_vote_count(target, vote_counter).await?;
        display_post_vec.push(DisplayPost {
            like_count: vote_count.like_count,
            dislike_count: vote_count.dislike_count,
            posted_ago: get_elapsed_time_string(post.create_timestamp, now),
            comment_count: display_comment_vec.len(),
            comments: display_comment_vec,
            viewer_vote: get_viewer_vote(target, viewer_votes),
            post,
        });
    }

    let orphan_count: usize = comment_map.values().map(Vec::len).sum();
    if orphan_count > 0 {
        log::debug!("{orphan_count} comments without a displayed post were left out.");
    }

    Ok(display_post_vec)
}

/// Loads the comments and the viewer's votes needed to display `posts`, then builds the display model.
pub async fn load_display_posts(
    posts: Vec<Post>,
    viewer: Option<&User>,
    now: DateTime<Utc>,
    db_pool: &SqlitePool,
) -> Result<Vec<DisplayPost>, AppError> {
    let comments = list_comments(db_pool).await?;
    let viewer_votes = match viewer {
        Some(user) => Some(get_viewer_votes(user.user_id, db_pool).await?),
        None => None,
    };
    build_display_model(posts, comments, now, viewer_votes.as_ref(), db_pool).await
}

async fn load_vote_count(
    target: VoteTarget,
    vote_counter: &impl VoteCounter,
) -> Result<VoteCount, AppError> {
    vote_counter.vote_count(target).await.map_err(|e| {
        log::error!("Failed to count votes of {target:?}: {e}");
        AppError::AggregationError(format!("Cannot count votes of {target:?}: {e}"))
    })
}

fn get_viewer_vote(
    target: VoteTarget,
    viewer_votes: Option<&HashMap<VoteTarget, VoteDirection>>,
) -> Option<VoteDirection> {
    viewer_votes.and_then(|vote_map| vote_map.get(&target).copied())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use agora_utils::constants::JUST_NOW_STR;
    use agora_utils::errors::AppError;

    use crate::aggregation::build_display_model;
    use crate::comment::Comment;
    use crate::post::Post;
    use crate::vote::{VoteCount, VoteCounter, VoteDirection, VoteTarget};

    #[derive(Default)]
    struct StubVoteCounter {
        count_map: HashMap<VoteTarget, VoteCount>,
        failing_target: Option<VoteTarget>,
    }

    #[async_trait]
    impl VoteCounter for StubVoteCounter {
        async fn vote_count(&self, target: VoteTarget) -> Result<VoteCount, AppError> {
            match self.failing_target {
                Some(failing_target) if failing_target == target => Err(AppError::PersistenceError(String::from("closed"))),
                _ => Ok(self.count_map.get(&target).copied().unwrap_or_default()),
            }
        }
    }

    fn test_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn create_post(post_id: i64, create_timestamp: DateTime<Utc>) -> Post {
        Post {
            post_id,
            author_id: 1,
            author_name: String::from("alice"),
            content: format!("post {post_id}"),
            flagged: false,
            create_timestamp,
            category_ids: Vec::new(),
        }
    }

    fn create_comment(comment_id: i64, post_id: i64, create_timestamp: DateTime<Utc>) -> Comment {
        Comment {
            comment_id,
            post_id,
            author_id: 2,
            author_name: String::from("bob"),
            content: format!("comment {comment_id}"),
            create_timestamp,
        }
    }

    #[tokio::test]
    async fn test_build_display_model() {
        let now = test_now();
        let posts = vec![
            create_post(2, now - Duration::minutes(5)),
            create_post(1, now - Duration::days(2)),
        ];
        let comments = vec![
            create_comment(1, 1, now - Duration::days(1)),
            create_comment(2, 2, now - Duration::seconds(10)),
            create_comment(3, 1, now - Duration::hours(3)),
        ];
        let vote_counter = StubVoteCounter {
            count_map: HashMap::from([
                (VoteTarget::Post(1), VoteCount { like_count: 3, dislike_count: 1 }),
                (VoteTarget::Comment(3), VoteCount { like_count: 0, dislike_count: 2 }),
            ]),
            failing_target: None,
        };

        let display_post_vec = build_display_model(posts.clone(), comments.clone(), now, None, &vote_counter)
            .await
            .expect("Display model should be built.");

        assert_eq!(display_post_vec.len(), 2);
        let newest_post = &display_post_vec[0];
        assert_eq!(newest_post.post, posts[0]);
        assert_eq!(newest_post.posted_ago, "5 minutes ago");
        assert_eq!((newest_post.like_count, newest_post.dislike_count), (0, 0));
        assert_eq!(newest_post.comment_count, 1);
        assert_eq!(newest_post.comments[0].comment, comments[1]);
        assert_eq!(newest_post.comments[0].posted_ago, JUST_NOW_STR);

        let oldest_post = &display_post_vec[1];
        assert_eq!(oldest_post.posted_ago, "2 days ago");
        assert_eq!((oldest_post.like_count, oldest_post.dislike_count), (3, 1));
        assert_eq!(oldest_post.comment_count, 2);
        assert_eq!(oldest_post.comments[0].comment, comments[0]);
        assert_eq!(oldest_post.comments[0].posted_ago, "1 day ago");
        assert_eq!(oldest_post.comments[1].comment, comments[2]);
        assert_eq!((oldest_post.comments[1].like_count, oldest_post.comments[1].dislike_count), (0, 2));
    }

    #[tokio::test]
    async fn test_build_display_model_drops_orphan_comments() {
        let now = test_now();
        let posts = vec![create_post(1, now)];
        let comments = vec![
            create_comment(1, 1, now),
            create_comment(2, 42, now),
        ];

        let display_post_vec = build_display_model(posts, comments, now, None, &StubVoteCounter::default())
            .await
            .expect("Display model should be built.");

        assert_eq!(display_post_vec.len(), 1);
        assert_eq!(display_post_vec[0].comment_count, 1);
        assert!(display_post_vec.iter().flat_map(|post| &post.comments).all(|comment| comment.comment.post_id == 1));
    }

    #[tokio::test]
    async fn test_build_display_model_viewer_votes() {
        let now = test_now();
        let posts = vec![create_post(1, now), create_post(2, now)];
        let comments = vec![create_comment(5, 2, now)];
        let viewer_votes = HashMap::from([
            (VoteTarget::Post(1), VoteDirection::Like),
            (VoteTarget::Comment(5), VoteDirection::Dislike),
            (VoteTarget::Comment(2), VoteDirection::Like),
        ]);
        let vote_counter = StubVoteCounter::default();

        let display_post_vec = build_display_model(posts.clone(), comments.clone(), now, Some(&viewer_votes), &vote_counter)
            .await
            .expect("Display model should be built.");
        assert_eq!(display_post_vec[0].viewer_vote, Some(VoteDirection::Like));
        assert_eq!(display_post_vec[1].viewer_vote, None);
        assert_eq!(display_post_vec[1].comments[0].viewer_vote, Some(VoteDirection::Dislike));

        let anonymous_post_vec = build_display_model(posts, comments, now, None, &vote_counter)
            .await
            .expect("Display model should be built.");
        assert!(anonymous_post_vec.iter().all(|post| post.viewer_vote.is_none()));
        assert!(anonymous_post_vec.iter().flat_map(|post| &post.comments).all(|comment| comment.viewer_vote.is_none()));
    }

    #[tokio::test]
    async fn test_build_display_model_vote_count_failure() {
        let now = test_now();
        let posts = vec![create_post(1, now), create_post(2, now)];
        let comments = vec![create_comment(3, 2, now)];
        let vote_counter = StubVoteCounter {
            count_map: HashMap::new(),
            failing_target: Some(VoteTarget::Comment(3)),
        };

        let result = build_display_model(posts, comments, now, None, &vote_counter).await;
        assert!(matches!(result, Err(AppError::AggregationError(_))));
    }

    #[tokio::test]
    async fn test_build_display_model_empty() {
        let display_post_vec = build_display_model(
            Vec::new(),
            vec![create_comment(1, 1, test_now())],
            test_now(),
            None,
            &StubVoteCounter::default(),
        ).await.expect("Display model should be built.");
        assert!(display_post_vec.is_empty());
    }
}
