pub mod in_memory;
pub mod postgres_account_repository;
pub mod postgres_bank_repository;
pub mod postgres_transaction_repository;

pub use in_memory::{InMemoryAccountRepository, InMemoryBankRepository, InMemoryTransactionRepository};
pub use postgres_account_repository::PostgresAccountRepository;
pub use postgres_bank_repository::PostgresBankRepository;
pub use postgres_transaction_repository::PostgresTransactionRepository;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
}
