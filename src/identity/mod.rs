//! Identity client. The user service owns account records and
//! password verification.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Account, NewAccount};

pub use self::http::HttpIdentityClient;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("account not found: {0}")]
    NotFound(String),

    #[error("account already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("user service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("user service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Account, IdentityError>;

    async fn find_by_credential(&self, email: &str, password: &str)
        -> Result<Account, IdentityError>;

    async fn create_account(&self, account: &NewAccount) -> Result<Account, IdentityError>;

    async fn health(&self) -> Result<(), IdentityError>;
}
