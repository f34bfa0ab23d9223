//! Postgres implementation of BankRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::Bank;
use crate::ports::{BankRepository, RepositoryError, RepositoryResult};

#[derive(Clone)]
pub struct PostgresBankRepository {
    pool: PgPool,
}

impl PostgresBankRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BankRepository for PostgresBankRepository {
    async fn find_by_prefix(&self, prefix: &str) -> RepositoryResult<Option<Bank>> {
        let row = sqlx::query_as::<_, BankRow>(
            "SELECT bank_prefix, name, transaction_url, owners, jwks_url FROM banks WHERE bank_prefix = $1",
        )
        .bind(prefix)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.map(BankRow::into_domain))
    }

    async fn replace_all(&self, banks: &[Bank]) -> RepositoryResult<()> {
        // Delete and re-insert inside one transaction; readers keep seeing
        // the old directory until commit.
        let mut db_tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        sqlx::query("DELETE FROM banks")
            .execute(&mut *db_tx)
            .await
            .map_err(RepositoryError::from)?;

        for bank in banks {
            sqlx::query(
                r#"
                INSERT INTO banks (bank_prefix, name, transaction_url, owners, jwks_url)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&bank.bank_prefix)
            .bind(&bank.name)
            .bind(&bank.transaction_url)
            .bind(&bank.owners)
            .bind(&bank.jwks_url)
            .execute(&mut *db_tx)
            .await
            .map_err(RepositoryError::from)?;
        }

        db_tx.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BankRow {
    bank_prefix: String,
    name: String,
    transaction_url: String,
    owners: Option<String>,
    jwks_url: Option<String>,
}

impl BankRow {
    fn into_domain(self) -> Bank {
        Bank {
            bank_prefix: self.bank_prefix,
            name: self.name,
            transaction_url: self.transaction_url,
            owners: self.owners,
            jwks_url: self.jwks_url,
        }
    }
}
