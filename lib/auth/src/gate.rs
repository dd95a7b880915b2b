//! Resolution of the request's user from its session, and role checks for gated operations.
//!
//! The resolved user is never stored globally: callers pass `Option<&User>` into every operation that needs it,
//! `None` meaning an anonymous visitor.

use sqlx::SqlitePool;

use agora_utils::errors::AppError;

use crate::role::Role;
use crate::user::User;

/// Loads the user named by a validated session.
///
/// A missing session, or one naming a user that does not exist anymore, resolves to an anonymous visitor.
/// Only storage failures are reported as errors.
pub async fn resolve_user(
    session_username: Option<&str>,
    db_pool: &SqlitePool,
) -> Result<Option<User>, AppError> {
    let Some(username) = session_username else {
        return Ok(None);
    };

    match User::get_by_username(username, db_pool).await {
        Ok(user) => Ok(Some(user)),
        Err(AppError::NotFound) => {
            log::debug!("Session references unknown user {username}, treat as anonymous.");
            Ok(None)
        },
        Err(e) => Err(e),
    }
}

pub fn current_role(user: Option<&User>) -> Option<Role> {
    user.map(|user| user.role)
}

/// Returns the user if it is authenticated and has at least the `minimum` role.
pub fn require_role(user: Option<&User>, minimum: Role) -> Result<&User, AppError> {
    match user {
        Some(user) => match user.check_role(minimum) {
            Ok(()) => Ok(user),
            Err(e) => {
                log::warn!("User {} with role {} denied access requiring {minimum}.", user.username, user.role);
                Err(e)
            }
        },
        None => {
            log::warn!("Anonymous visitor denied access requiring {minimum}.");
            Err(AppError::Forbidden)
        }
    }
}

/// Shorthand for operations open to any authenticated user, such as posting, commenting and voting.
pub fn require_user(user: Option<&User>) -> Result<&User, AppError> {
    require_role(user, Role::User)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use agora_utils::errors::AppError;

    use crate::gate::{current_role, require_role, require_user};
    use crate::role::Role;
    use crate::user::User;

    fn user_with_role(role: Role) -> User {
        User {
            user_id: 7,
            username: String::from("alice"),
            role,
            moderation_application: false,
            create_timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_current_role() {
        assert_eq!(current_role(None), None);
        assert_eq!(current_role(Some(&user_with_role(Role::User))), Some(Role::User));
        assert_eq!(current_role(Some(&user_with_role(Role::Admin))), Some(Role::Admin));
    }

    #[test]
    fn test_require_role() {
        let user = user_with_role(Role::User);
        let moderator = user_with_role(Role::Moderator);
        let admin = user_with_role(Role::Admin);

        assert_eq!(require_role(None, Role::User), Err(AppError::Forbidden));
        assert_eq!(require_role(Some(&user), Role::User), Ok(&user));
        assert_eq!(require_role(Some(&user), Role::Moderator), Err(AppError::Forbidden));
        assert_eq!(require_role(Some(&moderator), Role::Moderator), Ok(&moderator));
        assert_eq!(require_role(Some(&moderator), Role::Admin), Err(AppError::Forbidden));
        assert_eq!(require_role(Some(&admin), Role::Moderator), Ok(&admin));
        assert_eq!(require_role(Some(&admin), Role::Admin), Ok(&admin));
    }

    #[test]
    fn test_require_user() {
        let user = user_with_role(Role::User);
        assert_eq!(require_user(None), Err(AppError::Forbidden));
        assert_eq!(require_user(Some(&user)), Ok(&user));
    }
}
