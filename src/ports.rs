//! Persistence ports consumed by the settlement engine.
//! The core only ever sees these traits; Postgres and in-memory adapters
//! live in `crate::adapters`.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use thiserror::Error;

use crate::domain::{Account, Bank, Transaction, TransactionStatus};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn find_by_status(
        &self,
        status: TransactionStatus,
    ) -> RepositoryResult<Vec<Transaction>>;

    /// Upsert: inserts a new transaction or persists the mutable fields
    /// (status, detail, receiver) of an existing one.
    async fn save(&self, tx: &Transaction) -> RepositoryResult<Transaction>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_number(&self, account_number: &str) -> RepositoryResult<Account>;

    async fn save(&self, account: &Account) -> RepositoryResult<Account>;

    /// Atomically increments the balance at the storage layer, so concurrent
    /// refunds against one account cannot lose an update.
    async fn credit(
        &self,
        account_number: &str,
        amount: &BigDecimal,
    ) -> RepositoryResult<Account>;
}

#[async_trait]
pub trait BankRepository: Send + Sync {
    /// A miss is normal control flow (it triggers a directory refresh), so
    /// absence is `None` rather than an error.
    async fn find_by_prefix(&self, prefix: &str) -> RepositoryResult<Option<Bank>>;

    /// Replaces the whole directory. Atomic from the caller's perspective:
    /// readers see either the old snapshot or the new one, never a partial
    /// or empty window.
    async fn replace_all(&self, banks: &[Bank]) -> RepositoryResult<()>;
}
