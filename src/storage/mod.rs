pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Account;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("account with id {id} was not found")]
    NotFound { id: i32 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt account data: {0}")]
    Corrupt(String),
}

/// Persistence boundary between the HTTP handlers and a concrete backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Inserts the account and returns it with its assigned id.
    async fn create_account(&self, account: Account) -> Result<Account, StorageError>;

    /// Removes the account. A missing id is not reported as an error.
    async fn delete_account(&self, id: i32) -> Result<(), StorageError>;

    /// Accepted and ignored: accounts are never modified after creation.
    async fn update_account(&self, account: &Account) -> Result<(), StorageError>;

    async fn get_account_by_id(&self, id: i32) -> Result<Account, StorageError>;

    async fn get_accounts(&self) -> Result<Vec<Account>, StorageError>;

    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), StorageError>;
}
