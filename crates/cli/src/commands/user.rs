//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! dar user create -e owner@example.com -n "Amina Idrissi" -p 'correct horse'
//! ```
//!
//! # Environment Variables
//!
//! - `DAR_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use dar_core::UserId;
use dar_web::services::{AuthError, AuthService};
use thiserror::Error;

use super::{CommandError, connect};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a user with a password, applying the sign-up rules.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create(email: &str, name: &str, password: &str) -> Result<UserId, UserError> {
    let pool = connect().await?;

    tracing::info!("Creating user: {}", email);
    let user = AuthService::new(&pool)
        .register(name, email, password)
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id)
}
