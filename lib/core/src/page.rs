use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use strum_macros::{Display, EnumIter, EnumString};

use agora_auth::gate::{current_role, require_role, require_user};
use agora_auth::role::Role;
use agora_auth::user::User;
use agora_utils::errors::AppError;

use crate::aggregation::{load_display_posts, DisplayPost};
use crate::moderation::{get_pending_moderation_requests, ModerationRequest};
use crate::post::{count_reported_posts, filter_by_categories, list_posts, reported_posts, Post, PostScope};

/// Post selection of the home page. `Mine` and `Liked` always refer to the viewer.
#[derive(Clone, Copy, Debug, Default, Display, EnumIter, EnumString, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PageScope {
    #[default]
    All,
    Mine,
    Liked,
}

/// Everything the rendering layer needs for a forum page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumPage {
    pub username: Option<String>,
    pub role: Option<Role>,
    pub posts: Vec<DisplayPost>,
    /// Pending moderation requests, only for admins.
    pub moderation_requests: Option<Vec<ModerationRequest>>,
    /// Number of flagged posts, only for moderators and admins.
    pub reported_post_count: Option<i64>,
}

pub async fn load_forum_page(
    scope: PageScope,
    viewer: Option<&User>,
    now: DateTime<Utc>,
    db_pool: &SqlitePool,
) -> Result<ForumPage, AppError> {
    let post_scope = match scope {
        PageScope::All => PostScope::All,
        PageScope::Mine => PostScope::ByAuthor(require_user(viewer)?.username.clone()),
        PageScope::Liked => PostScope::LikedBy(require_user(viewer)?.username.clone()),
    };
    let posts = list_posts(&post_scope, db_pool).await?;
    build_forum_page(posts, viewer, now, db_pool).await
}

/// Forum page restricted to posts tagged with any of `category_ids`.
pub async fn load_filtered_page(
    category_ids: &HashSet<i64>,
    viewer: Option<&User>,
    now: DateTime<Utc>,
    db_pool: &SqlitePool,
) -> Result<ForumPage, AppError> {
    let posts = filter_by_categories(category_ids, db_pool).await?;
    build_forum_page(posts, viewer, now, db_pool).await
}

/// The moderators' report queue.
pub async fn load_reported_posts(
    viewer: Option<&User>,
    now: DateTime<Utc>,
    db_pool: &SqlitePool,
) -> Result<Vec<DisplayPost>, AppError> {
    require_role(viewer, Role::Moderator)?;
    let posts = reported_posts(db_pool).await?;
    load_display_posts(posts, viewer, now, db_pool).await
}

async fn build_forum_page(
    posts: Vec<Post>,
    viewer: Option<&User>,
    now: DateTime<Utc>,
    db_pool: &SqlitePool,
) -> Result<ForumPage, AppError> {
    let display_post_vec = load_display_posts(posts, viewer, now, db_pool).await?;
    let role = current_role(viewer);

    let moderation_requests = match role {
        Some(Role::Admin) => Some(get_pending_moderation_requests(db_pool).await?),
        _ => None,
    };
    let reported_post_count = match role {
        Some(role) if role >= Role::Moderator => Some(count_reported_posts(db_pool).await?),
        _ => None,
    };

    Ok(ForumPage {
        username: viewer.map(|user| user.username.clone()),
        role,
        posts: display_post_vec,
        moderation_requests,
        reported_post_count,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use crate::page::PageScope;

    #[test]
    fn test_page_scope_from_str() {
        for scope in PageScope::iter() {
            assert_eq!(PageScope::from_str(&scope.to_string()), Ok(scope));
        }
        assert_eq!(PageScope::from_str("liked"), Ok(PageScope::Liked));
        assert!(PageScope::from_str("everything").is_err());
        assert_eq!(PageScope::default(), PageScope::All);
    }
}
