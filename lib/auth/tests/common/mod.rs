#![allow(dead_code)]

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use agora_auth::session::run_migrations;
use agora_auth::user::{create_user as insert_user, User};

pub const TEST_DB_URL: &str = "sqlite::memory:";

/// Fresh in-memory database with the schema applied. The single connection keeps the database alive for the whole test.
pub async fn get_db_pool() -> SqlitePool {
    let connect_options = SqliteConnectOptions::from_str(TEST_DB_URL)
        .expect("Test DB url should be valid.")
        .foreign_keys(true);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(connect_options)
        .await
        .expect("Failed to connect to test DB");

    run_migrations(&db_pool).await.expect("Should be able to run SQLx migrations.");

    db_pool
}

pub async fn create_user(username: &str, db_pool: &SqlitePool) -> User {
    insert_user(username, false, db_pool).await.expect("Could not create test user.")
}
