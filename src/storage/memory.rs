use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::models::Account;
use crate::storage::{Storage, StorageError};

#[derive(Default)]
struct Inner {
    next_id: i32,
    accounts: BTreeMap<i32, Account>,
}

/// Process-local store. Ids start at 1 and are never reused, so iteration
/// order of the map is insertion order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn create_account(&self, account: Account) -> Result<Account, StorageError> {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let stored = Account {
            id: inner.next_id,
            ..account
        };
        inner.accounts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete_account(&self, id: i32) -> Result<(), StorageError> {
        self.inner.write().accounts.remove(&id);
        Ok(())
    }

    async fn update_account(&self, _account: &Account) -> Result<(), StorageError> {
        Ok(())
    }

    async fn get_account_by_id(&self, id: i32) -> Result<Account, StorageError> {
        self.inner
            .read()
            .accounts
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound { id })
    }

    async fn get_accounts(&self) -> Result<Vec<Account>, StorageError> {
        Ok(self.inner.read().accounts.values().cloned().collect())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
