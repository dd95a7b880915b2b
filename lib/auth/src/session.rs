use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

pub const DB_URL_ENV: &str = "DATABASE_URL";
pub const DB_MAX_CONNECTIONS_ENV: &str = "DB_MAX_CONNECTIONS";
pub const DEFAULT_DB_URL: &str = "sqlite://agora.db";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DB_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Session key under which the hosting layer stores the authenticated username.
pub const SESSION_USERNAME_KEY: &str = "username";

pub fn get_db_url() -> String {
    match env::var(DB_URL_ENV) {
        Ok(db_url) => db_url,
        Err(_) => {
            log::info!("Could not find {DB_URL_ENV} in env variables, use default: {DEFAULT_DB_URL}");
            String::from(DEFAULT_DB_URL)
        }
    }
}

pub fn get_db_max_connections() -> u32 {
    match env::var(DB_MAX_CONNECTIONS_ENV) {
        Ok(value) => match u32::from_str(&value) {
            Ok(max_connections) if max_connections > 0 => max_connections,
            _ => {
                log::error!("Could not parse {DB_MAX_CONNECTIONS_ENV} as a positive integer, use default.");
                DEFAULT_DB_MAX_CONNECTIONS
            }
        },
        Err(_) => {
            log::debug!("Could not find {DB_MAX_CONNECTIONS_ENV} in env variables, use default.");
            DEFAULT_DB_MAX_CONNECTIONS
        }
    }
}

pub async fn create_db_pool() -> anyhow::Result<SqlitePool> {
    connect_db_pool(&get_db_url(), get_db_max_connections()).await
}

/// Pool on the database at `db_url`. Writers wait on each other for up to [`DB_BUSY_TIMEOUT`].
pub async fn connect_db_pool(db_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let connect_options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| "Invalid database url")?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(DB_BUSY_TIMEOUT);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(connect_options)
        .await
        .with_context(|| "Failed to connect to DB")
}

pub async fn run_migrations(db_pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("../../migrations")
        .run(db_pool)
        .await
        .with_context(|| "Failed to run SQLx migrations")
}
