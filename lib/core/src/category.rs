use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor};

use agora_utils::errors::AppError;

#[derive(sqlx::FromRow, Clone, Debug, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Category {
    pub category_id: i64,
    pub name: String,
}

pub async fn list_categories(
    executor: impl SqliteExecutor<'_>,
) -> Result<Vec<Category>, AppError> {
    let category_vec = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY category_id")
        .fetch_all(executor)
        .await
        .map_err(|e| AppError::repository("list_categories", e))?;

    Ok(category_vec)
}

/// Fails with [`AppError::InvalidInput`] if any of `category_ids` is not a known category.
pub async fn check_category_ids(
    category_ids: &BTreeSet<i64>,
    executor: impl SqliteExecutor<'_>,
) -> Result<(), AppError> {
    if category_ids.is_empty() {
        return Ok(());
    }

    let mut query_builder = QueryBuilder::<Sqlite>::new("SELECT category_id FROM categories WHERE category_id IN (");
    let mut separated = query_builder.separated(", ");
    for category_id in category_ids {
        separated.push_bind(*category_id);
    }
    separated.push_unseparated(")");

    let known_id_set: BTreeSet<i64> = query_builder
        .build_query_scalar::<i64>()
        .fetch_all(executor)
        .await?
        .into_iter()
        .collect();

    match category_ids.difference(&known_id_set).next() {
        Some(unknown_id) => Err(AppError::invalid(format!("Unknown category: {unknown_id}."))),
        None => Ok(()),
    }
}

/// Tags `post_id` with every category of `category_ids`.
pub async fn add_post_categories(
    post_id: i64,
    category_ids: &BTreeSet<i64>,
    db_conn: &mut SqliteConnection,
) -> Result<(), AppError> {
    if category_ids.is_empty() {
        return Ok(());
    }

    let mut query_builder = QueryBuilder::<Sqlite>::new("INSERT INTO post_categories (post_id, category_id) ");
    query_builder.push_values(category_ids, |mut row, category_id| {
        row.push_bind(post_id).push_bind(*category_id);
    });
    query_builder.build().execute(db_conn).await?;

    Ok(())
}

/// Category ids of each post in `post_ids`, sorted ascending. Posts without categories are absent from the map.
pub async fn get_post_category_map(
    post_ids: &[i64],
    executor: impl SqliteExecutor<'_>,
) -> Result<HashMap<i64, Vec<i64>>, AppError> {
    let mut category_map = HashMap::<i64, Vec<i64>>::new();
    if post_ids.is_empty() {
        return Ok(category_map);
    }

    let mut query_builder = QueryBuilder::<Sqlite>::new("SELECT post_id, category_id FROM post_categories WHERE post_id IN (");
    let mut separated = query_builder.separated(", ");
    for post_id in post_ids {
        separated.push_bind(*post_id);
    }
    separated.push_unseparated(") ORDER BY post_id, category_id");

    let row_vec = query_builder
        .build_query_as::<(i64, i64)>()
        .fetch_all(executor)
        .await
        .map_err(|e| AppError::repository("get_post_categories", e))?;

    for (post_id, category_id) in row_vec {
        category_map.entry(post_id).or_default().push(category_id);
    }

    Ok(category_map)
}
