use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_session::Session;
use axum_session_sqlx::SessionSqlitePool;

use agora_auth::gate::resolve_user;
use agora_auth::session::SESSION_USERNAME_KEY;
use agora_auth::user::User;
use agora_utils::errors::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// User behind the request's session, `None` for anonymous visitors and for sessions naming an unknown user.
pub struct Viewer(pub Option<User>);

impl<S> FromRequestParts<S> for Viewer
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let session = Session::<SessionSqlitePool>::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                log::error!("Session layer missing, cannot resolve viewer.");
                ApiError(AppError::PersistenceError(String::from("Session unavailable.")))
            })?;

        let username = session.get::<String>(SESSION_USERNAME_KEY);
        let user = resolve_user(username.as_deref(), &app_state.db_pool).await?;
        Ok(Viewer(user))
    }
}
