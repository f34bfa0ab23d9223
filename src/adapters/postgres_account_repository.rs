//! Postgres implementation of AccountRepository.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Account;
use crate::ports::{AccountRepository, RepositoryError, RepositoryResult};

#[derive(Clone)]
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_number(&self, account_number: &str) -> RepositoryResult<Account> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT account_number, user_id, balance FROM accounts WHERE account_number = $1",
        )
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.map(AccountRow::into_domain)
            .ok_or_else(|| RepositoryError::NotFound(account_number.to_string()))
    }

    async fn save(&self, account: &Account) -> RepositoryResult<Account> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO accounts (account_number, user_id, balance)
            VALUES ($1, $2, $3)
            ON CONFLICT (account_number) DO UPDATE SET balance = EXCLUDED.balance
            RETURNING account_number, user_id, balance
            "#,
        )
        .bind(&account.account_number)
        .bind(account.user_id)
        .bind(&account.balance)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.into_domain())
    }

    async fn credit(
        &self,
        account_number: &str,
        amount: &BigDecimal,
    ) -> RepositoryResult<Account> {
        // Single UPDATE so concurrent credits serialize on the row lock.
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE accounts SET balance = balance + $1
            WHERE account_number = $2
            RETURNING account_number, user_id, balance
            "#,
        )
        .bind(amount)
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.map(AccountRow::into_domain)
            .ok_or_else(|| RepositoryError::NotFound(account_number.to_string()))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    account_number: String,
    user_id: Uuid,
    balance: BigDecimal,
}

impl AccountRow {
    fn into_domain(self) -> Account {
        Account {
            account_number: self.account_number,
            user_id: self.user_id,
            balance: self.balance,
        }
    }
}
