use axum::extract::FromRef;
use sqlx::SqlitePool;

/// Shared state of the handlers. The pool is cheap to clone.
#[derive(FromRef, Debug, Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
}
