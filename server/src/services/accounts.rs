//! Accounts service
//!
//! Registration and login. Passwords are stored as Argon2id hashes.

use crate::crypto;
use crate::database::{Repository, User};
use crate::error::{AppError, Result};
use crate::validation::{validate_user, UserForm};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Service for managing user accounts
#[derive(Clone)]
pub struct AccountsService {
    repo: Repository,
}

impl AccountsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Register a new user from a submitted form
    pub async fn register(&self, form: &UserForm) -> Result<User> {
        let credentials = validate_user(form)?;

        if self
            .repo
            .find_user_by_username(&credentials.username)
            .await?
            .is_some()
        {
            return Err(AppError::Validation(format!(
                "Username {} already exists",
                credentials.username
            )));
        }

        let password_hash = crypto::hash_password(&credentials.password)?;
        let user = self
            .repo
            .create_user(&credentials.username, &password_hash)
            .await?;

        tracing::info!("Registered user: {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Check a login form, returning the matching user
    pub async fn login(&self, form: &UserForm) -> Result<User> {
        let credentials = validate_user(form)?;

        let Some(user) = self.repo.find_user_by_username(&credentials.username).await? else {
            return Err(AppError::Validation(INVALID_CREDENTIALS.to_string()));
        };

        if !crypto::verify_password(&credentials.password, &user.password_hash)? {
            tracing::debug!("Password mismatch for user: {}", user.id);
            return Err(AppError::Validation(INVALID_CREDENTIALS.to_string()));
        }

        tracing::info!("User logged in: {}", user.id);
        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        self.repo.get_user(id).await
    }
}
