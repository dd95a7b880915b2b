use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteExecutor;

use agora_utils::checks::check_username;
use agora_utils::errors::AppError;

use crate::role::Role;

#[derive(sqlx::FromRow, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub moderation_application: bool,
    pub create_timestamp: DateTime<Utc>,
}

impl User {
    pub fn check_role(&self, req_role: Role) -> Result<(), AppError> {
        match self.role >= req_role {
            true => Ok(()),
            false => Err(AppError::Forbidden),
        }
    }

    pub async fn get_by_username(
        username: &str,
        executor: impl SqliteExecutor<'_>,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_one(executor)
            .await?;

        Ok(user)
    }
}

pub async fn get_user_id(
    username: &str,
    executor: impl SqliteExecutor<'_>,
) -> Result<i64, AppError> {
    let user_id = sqlx::query_scalar::<_, i64>("SELECT user_id FROM users WHERE username = $1")
        .bind(username)
        .fetch_one(executor)
        .await?;

    Ok(user_id)
}

pub async fn get_user_role(
    username: &str,
    executor: impl SqliteExecutor<'_>,
) -> Result<Role, AppError> {
    let role = sqlx::query_scalar::<_, Role>("SELECT role FROM users WHERE username = $1")
        .bind(username)
        .fetch_one(executor)
        .await?;

    Ok(role)
}

/// Overwrites the role of `username`. Callers are responsible for authorizing the change.
pub async fn set_user_role(
    username: &str,
    role: Role,
    executor: impl SqliteExecutor<'_>,
) -> Result<User, AppError> {
    log::info!("Set role of user {username} to {role}");
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET role = $1 WHERE username = $2 RETURNING *"
    )
        .bind(role)
        .bind(username)
        .fetch_one(executor)
        .await?;

    Ok(user)
}

/// Inserts a new user with the `user` role.
pub async fn create_user(
    username: &str,
    moderation_application: bool,
    executor: impl SqliteExecutor<'_>,
) -> Result<User, AppError> {
    check_username(username)?;
    log::debug!("Create user {username}, applies for moderation: {moderation_application}");
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, role, moderation_application, create_timestamp)
        VALUES ($1, $2, $3, $4)
        RETURNING *"
    )
        .bind(username)
        .bind(Role::User)
        .bind(moderation_application)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
        .map_err(|error| match error {
            sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
                AppError::invalid(format!("Username {username} is already taken."))
            },
            error => AppError::from(error),
        })?;

    Ok(user)
}
