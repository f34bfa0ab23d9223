//! In-memory adapters for the persistence ports.
//! Used by the test suite and by single-node runs without Postgres.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Account, Bank, Transaction, TransactionStatus};
use crate::ports::{
    AccountRepository, BankRepository, RepositoryError, RepositoryResult, TransactionRepository,
};

#[derive(Default)]
pub struct InMemoryTransactionRepository {
    inner: RwLock<HashMap<Uuid, Transaction>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn find_by_status(
        &self,
        status: TransactionStatus,
    ) -> RepositoryResult<Vec<Transaction>> {
        let mut matching: Vec<Transaction> = self
            .inner
            .read()
            .await
            .values()
            .filter(|tx| tx.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|tx| tx.created_at);
        Ok(matching)
    }

    async fn save(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        self.inner.write().await.insert(tx.id, tx.clone());
        Ok(tx.clone())
    }
}

#[derive(Default)]
pub struct InMemoryAccountRepository {
    inner: RwLock<HashMap<String, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_number(&self, account_number: &str) -> RepositoryResult<Account> {
        self.inner
            .read()
            .await
            .get(account_number)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(account_number.to_string()))
    }

    async fn save(&self, account: &Account) -> RepositoryResult<Account> {
        self.inner
            .write()
            .await
            .insert(account.account_number.clone(), account.clone());
        Ok(account.clone())
    }

    async fn credit(
        &self,
        account_number: &str,
        amount: &BigDecimal,
    ) -> RepositoryResult<Account> {
        // The write lock serializes concurrent credits against one store.
        let mut accounts = self.inner.write().await;
        let account = accounts
            .get_mut(account_number)
            .ok_or_else(|| RepositoryError::NotFound(account_number.to_string()))?;
        account.balance = &account.balance + amount;
        Ok(account.clone())
    }
}

/// Bank directory cache as an atomically swapped immutable snapshot. Readers
/// racing a refresh finish against the old snapshot; there is never an empty
/// window between delete and insert.
pub struct InMemoryBankRepository {
    snapshot: ArcSwap<Vec<Bank>>,
}

impl InMemoryBankRepository {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Vec::new()),
        }
    }
}

impl Default for InMemoryBankRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BankRepository for InMemoryBankRepository {
    async fn find_by_prefix(&self, prefix: &str) -> RepositoryResult<Option<Bank>> {
        Ok(self
            .snapshot
            .load()
            .iter()
            .find(|bank| bank.bank_prefix == prefix)
            .cloned())
    }

    async fn replace_all(&self, banks: &[Bank]) -> RepositoryResult<()> {
        self.snapshot.store(Arc::new(banks.to_vec()));
        Ok(())
    }
}
