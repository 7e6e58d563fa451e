//! # Accounts
//!
//! Signup and credential checks on top of `UserRepo` and `AuthProvider`.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::User;
use crate::traits::{AuthProvider, UserRepo};

pub const MAX_USERNAME_CHARS: usize = 150;
pub const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Clone)]
pub struct Signup {
    pub username: String,
    pub display_name: String,
    pub password: String,
}

/// Usernames end up in URLs, so they stay within `[A-Za-z0-9_.@+-]`.
pub fn validate_username(username: &str) -> Result<()> {
    let count = username.chars().count();
    if count == 0 || count > MAX_USERNAME_CHARS {
        return Err(AppError::ValidationError(format!(
            "username must be 1 to {MAX_USERNAME_CHARS} characters"
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-');
    if !username.chars().all(allowed) {
        return Err(AppError::ValidationError(
            "username may only contain letters, digits and _ . @ + -".into(),
        ));
    }
    Ok(())
}

pub async fn register<R, A>(repo: &R, auth: &A, signup: Signup) -> Result<User>
where
    R: UserRepo + ?Sized,
    A: AuthProvider + ?Sized,
{
    let username = signup.username.trim().to_string();
    validate_username(&username)?;
    if signup.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::ValidationError(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    if repo.get_user_by_name(&username).await?.is_some() {
        return Err(AppError::Conflict(format!("username {username} is taken")));
    }

    let user = User {
        id: Uuid::now_v7(),
        username,
        display_name: signup.display_name.trim().to_string(),
        password_hash: auth.hash_password(&signup.password)?,
        joined_at: Utc::now(),
    };
    repo.create_user(user.clone()).await?;
    log::info!("registered user {}", user.username);
    Ok(user)
}

/// Returns the user whose credentials match, without saying which part was wrong.
pub async fn authenticate<R, A>(repo: &R, auth: &A, username: &str, password: &str) -> Result<User>
where
    R: UserRepo + ?Sized,
    A: AuthProvider + ?Sized,
{
    let rejected = || AppError::Unauthorized("invalid username or password".into());

    let user = repo
        .get_user_by_name(username.trim())
        .await?
        .ok_or_else(rejected)?;
    if !auth.verify_password(password, &user.password_hash).await {
        log::warn!("failed login for {}", user.username);
        return Err(rejected());
    }
    Ok(user)
}

/// Looks a profile up by username, mapping absence to `NotFound`.
pub async fn find_user<R>(repo: &R, username: &str) -> Result<User>
where
    R: UserRepo + ?Sized,
{
    repo.get_user_by_name(username)
        .await?
        .ok_or_else(|| AppError::not_found("User", username))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockAuthProvider, MockUserRepo};

    fn signup(username: &str, password: &str) -> Signup {
        Signup {
            username: username.into(),
            display_name: "Some One".into(),
            password: password.into(),
        }
    }

    #[test]
    fn username_charset() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("a.b@c+d-e").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("slash/y").is_err());
        assert!(validate_username(&"x".repeat(151)).is_err());
    }

    #[tokio::test]
    async fn register_stores_hash_not_password() {
        let mut repo = MockUserRepo::new();
        repo.expect_get_user_by_name().returning(|_| Ok(None));
        repo.expect_create_user()
            .withf(|user| user.username == "alice" && user.password_hash == "hashed")
            .times(1)
            .returning(|_| Ok(()));
        let mut auth = MockAuthProvider::new();
        auth.expect_hash_password()
            .returning(|_| Ok("hashed".to_string()));

        let user = register(&repo, &auth, signup(" alice ", "correct horse"))
            .await
            .unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.display_name, "Some One");
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let mut repo = MockUserRepo::new();
        repo.expect_get_user_by_name().returning(|name| {
            Ok(Some(User {
                id: Uuid::now_v7(),
                username: name.to_string(),
                display_name: String::new(),
                password_hash: String::new(),
                joined_at: Utc::now(),
            }))
        });
        repo.expect_create_user().never();
        let auth = MockAuthProvider::new();

        let err = register(&repo, &auth, signup("alice", "correct horse"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let repo = MockUserRepo::new();
        let auth = MockAuthProvider::new();

        let err = register(&repo, &auth, signup("alice", "short"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let mut repo = MockUserRepo::new();
        repo.expect_get_user_by_name().returning(|name| {
            Ok(Some(User {
                id: Uuid::now_v7(),
                username: name.to_string(),
                display_name: String::new(),
                password_hash: "stored".into(),
                joined_at: Utc::now(),
            }))
        });
        let mut auth = MockAuthProvider::new();
        auth.expect_verify_password().returning(|_, _| false);

        let err = authenticate(&repo, &auth, "alice", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
