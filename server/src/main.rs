use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use axum_session::{Key, SessionConfig, SessionLayer, SessionStore};
use axum_session_sqlx::SessionSqlitePool;
use base64::{engine::general_purpose, Engine};

use agora_auth::session::{create_db_pool, run_migrations};

use crate::state::AppState;

mod api;
mod error;
mod state;
mod viewer;

pub const SESSION_KEY_ENV: &str = "SESSION_KEY";
pub const SITE_ADDR_ENV: &str = "SITE_ADDR";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const DEFAULT_SITE_ADDR: &str = "127.0.0.1:3000";

pub fn get_log_level() -> log::Level {
    env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|level| log::Level::from_str(&level).ok())
        .unwrap_or(log::Level::Info)
}

pub fn get_session_key() -> Key {
    match env::var(SESSION_KEY_ENV) {
        Ok(key) => match general_purpose::STANDARD.decode(key).map(|key| Key::try_from(key.as_slice())) {
            Ok(Ok(key)) => {
                log::debug!("Got session key from env variable.");
                key
            },
            _ => {
                log::error!("Could not decode session key from env variable, generate one.");
                Key::generate()
            }
        },
        Err(_) => {
            log::info!("Could not find session key in env variable, generate one.");
            Key::generate()
        }
    }
}

pub fn get_site_addr() -> SocketAddr {
    let default_addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    match env::var(SITE_ADDR_ENV) {
        Ok(value) => match SocketAddr::from_str(&value) {
            Ok(addr) => addr,
            Err(_) => {
                log::error!("Could not parse {SITE_ADDR_ENV} as a socket address, use default: {DEFAULT_SITE_ADDR}");
                default_addr
            }
        },
        Err(_) => {
            log::debug!("Could not find {SITE_ADDR_ENV} in env variables, use default: {DEFAULT_SITE_ADDR}");
            default_addr
        }
    }
}

#[tokio::main]
async fn main() {
    simple_logger::init_with_level(get_log_level()).expect("Should be able to initialize logging.");

    let pool = create_db_pool().await.expect("Failed to create db pool");

    run_migrations(&pool).await.expect("Should be able to run SQLx migrations.");

    let session_config = SessionConfig::default()
        .with_table_name("sessions")
        // Cookies are private when a key is set, a generated key invalidates sessions on restart.
        .with_key(get_session_key());

    let session_store = SessionStore::<SessionSqlitePool>::new(
        Some(pool.clone().into()), session_config
    ).await.expect("Should be able to create session store.");

    let app_state = AppState {
        db_pool: pool,
    };

    let app = api::router()
        .layer(SessionLayer::new(session_store))
        .with_state(app_state);

    let addr = get_site_addr();
    log::info!("listening on http://{}", &addr);
    let listener = tokio::net::TcpListener::bind(&addr).await.expect("Should be able to bind site address.");
    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server should run.");
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::str::FromStr;

    use crate::DEFAULT_SITE_ADDR;

    #[test]
    fn test_default_site_addr() {
        assert_eq!(SocketAddr::from_str(DEFAULT_SITE_ADDR), Ok(SocketAddr::from(([127, 0, 0, 1], 3000))));
    }
}
