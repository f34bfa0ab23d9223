//! Postgres implementation of TransactionRepository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Transaction, TransactionStatus};
use crate::ports::{RepositoryError, RepositoryResult, TransactionRepository};

/// Postgres-backed transaction repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn find_by_status(
        &self,
        status: TransactionStatus,
    ) -> RepositoryResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, account_from, account_to, amount, currency, explanation,
                sender_name, receiver_name, status, status_detail, created_at
            FROM transactions
            WHERE status = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }

    async fn save(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO transactions (
                id, account_from, account_to, amount, currency, explanation,
                sender_name, receiver_name, status, status_detail, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                receiver_name = EXCLUDED.receiver_name,
                status = EXCLUDED.status,
                status_detail = EXCLUDED.status_detail
            RETURNING id, account_from, account_to, amount, currency, explanation,
                sender_name, receiver_name, status, status_detail, created_at
            "#,
        )
        .bind(tx.id)
        .bind(&tx.account_from)
        .bind(&tx.account_to)
        .bind(&tx.amount)
        .bind(&tx.currency)
        .bind(&tx.explanation)
        .bind(&tx.sender_name)
        .bind(&tx.receiver_name)
        .bind(tx.status.as_str())
        .bind(&tx.status_detail)
        .bind(tx.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.into_domain()
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    account_from: String,
    account_to: String,
    amount: bigdecimal::BigDecimal,
    currency: String,
    explanation: String,
    sender_name: String,
    receiver_name: Option<String>,
    status: String,
    status_detail: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> RepositoryResult<Transaction> {
        let status = self
            .status
            .parse()
            .map_err(|e: crate::domain::UnknownStatus| RepositoryError::Corrupt(e.to_string()))?;

        Ok(Transaction {
            id: self.id,
            account_from: self.account_from,
            account_to: self.account_to,
            amount: self.amount,
            currency: self.currency,
            explanation: self.explanation,
            sender_name: self.sender_name,
            receiver_name: self.receiver_name,
            status,
            status_detail: self.status_detail,
            created_at: self.created_at,
        })
    }
}
