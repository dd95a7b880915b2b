#![allow(dead_code)]

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tempfile::TempDir;

use agora_auth::role::Role;
use agora_auth::session::{connect_db_pool, run_migrations};
use agora_auth::user::{create_user, set_user_role, User};

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

/// Fresh file database shared by `max_connections` connections, for tests that need parallel transactions.
/// The database is removed when the returned directory is dropped.
pub async fn get_file_db_pool(max_connections: u32) -> (TempDir, SqlitePool) {
    let db_dir = TempDir::new().expect("Should create test DB directory.");
    let db_url = format!("sqlite://{}", db_dir.path().join("agora.db").display());

    let db_pool = connect_db_pool(&db_url, max_connections).await.expect("Failed to connect to test DB");
    run_migrations(&db_pool).await.expect("Should be able to run SQLx migrations.");

    (db_dir, db_pool)
}

pub async fn create_test_user(db_pool: &SqlitePool) -> User {
    create_named_user("test", db_pool).await
}

pub async fn create_named_user(username: &str, db_pool: &SqlitePool) -> User {
    create_user(username, false, db_pool).await.expect("Could not create test user.")
}

pub async fn create_user_with_role(username: &str, role: Role, db_pool: &SqlitePool) -> User {
    create_named_user(username, db_pool).await;
    set_user_role(username, role, db_pool).await.expect("Could not set role of test user.")
}
