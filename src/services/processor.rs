//! The settlement state machine: drives every Pending transaction to
//! Completed or Failed, or back to Pending for a later retry.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::domain::{Bank, Transaction, TransactionStatus};
use crate::ports::{AccountRepository, BankRepository, RepositoryError, TransactionRepository};
use crate::services::directory::BankDirectoryClient;
use crate::services::remote_bank::RemoteBankClient;
use crate::services::signer::{JwsSigner, TransferClaims};

/// Counters for one full pass over the pending set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub picked: usize,
    pub completed: usize,
    pub failed: usize,
    pub requeued: usize,
}

enum Outcome {
    Completed,
    Failed,
    /// The transaction is back in (or never left) Pending and will be
    /// retried on the next pass.
    Requeued,
}

pub struct TransactionProcessor {
    transactions: Arc<dyn TransactionRepository>,
    accounts: Arc<dyn AccountRepository>,
    banks: Arc<dyn BankRepository>,
    directory: BankDirectoryClient,
    remote: RemoteBankClient,
    signer: Arc<JwsSigner>,
}

impl TransactionProcessor {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        accounts: Arc<dyn AccountRepository>,
        banks: Arc<dyn BankRepository>,
        directory: BankDirectoryClient,
        remote: RemoteBankClient,
        signer: Arc<JwsSigner>,
    ) -> Self {
        Self {
            transactions,
            accounts,
            banks,
            directory,
            remote,
            signer,
        }
    }

    /// One reconciliation pass over every transaction currently Pending.
    /// Per-transaction failures become persisted status updates and never
    /// abort the batch; only the initial repository read can fail here.
    pub async fn run_pass(&self) -> Result<PassSummary, RepositoryError> {
        let pending = self
            .transactions
            .find_by_status(TransactionStatus::Pending)
            .await?;

        let mut summary = PassSummary {
            picked: pending.len(),
            ..Default::default()
        };
        if pending.is_empty() {
            return Ok(summary);
        }

        debug!("processing {} pending transaction(s)", pending.len());

        let outcomes = join_all(pending.into_iter().map(|tx| self.process_one(tx))).await;
        for outcome in outcomes {
            match outcome {
                Outcome::Completed => summary.completed += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::Requeued => summary.requeued += 1,
            }
        }

        Ok(summary)
    }

    async fn process_one(&self, mut tx: Transaction) -> Outcome {
        if tx.is_expired(Utc::now()) {
            self.refund(&tx).await;
            return self
                .conclude(&mut tx, TransactionStatus::Failed, Some("Expired".to_string()), Outcome::Failed)
                .await;
        }

        // Persisted before any network call: this both makes a crash
        // mid-flight observable on restart and removes the transaction from
        // eligibility for concurrent or subsequent passes.
        if let Err(e) = self.set_status(&mut tx, TransactionStatus::InProgress, None).await {
            error!("failed to claim transaction {}: {}", tx.id, e);
            return Outcome::Requeued;
        }

        let prefix = tx.bank_prefix().to_string();
        let bank = match self.resolve_bank(&prefix).await {
            Ok(Some(bank)) => bank,
            Ok(None) => {
                self.refund(&tx).await;
                let detail = format!("Bank {} does not exist.", prefix);
                return self
                    .conclude(&mut tx, TransactionStatus::Failed, Some(detail), Outcome::Failed)
                    .await;
            }
            Err(detail) => {
                return self
                    .conclude(&mut tx, TransactionStatus::Pending, Some(detail), Outcome::Requeued)
                    .await;
            }
        };

        let jwt = match self.signer.sign(&TransferClaims::from(&tx)) {
            Ok(jwt) => jwt,
            Err(e) => {
                let detail = format!("failed to sign transaction: {}", e);
                return self
                    .conclude(&mut tx, TransactionStatus::Pending, Some(detail), Outcome::Requeued)
                    .await;
            }
        };

        match self.remote.send(&bank, &jwt).await {
            Ok(response) => {
                tx.receiver_name = Some(response.receiver_name);
                info!("completed transaction {}", tx.id);
                self.conclude(&mut tx, TransactionStatus::Completed, None, Outcome::Completed)
                    .await
            }
            Err(e) => {
                warn!(
                    transaction = %tx.id,
                    response_text = %e.response_text,
                    "error sending request to destination bank: {}", e
                );
                self.conclude(&mut tx, TransactionStatus::Pending, Some(e.to_string()), Outcome::Requeued)
                    .await
            }
        }
    }

    /// Looks up the destination bank, refreshing the directory once on a
    /// miss. `Ok(None)` means the prefix is unknown even to the registry;
    /// `Err` carries the retryable detail for the Pending revert.
    async fn resolve_bank(&self, prefix: &str) -> Result<Option<Bank>, String> {
        match self.banks.find_by_prefix(prefix).await {
            Ok(Some(bank)) => return Ok(Some(bank)),
            Ok(None) => {}
            Err(e) => return Err(format!("bank lookup failed: {}", e)),
        }

        if let Err(e) = self.directory.refresh().await {
            return Err(format!("Central bank refresh failed: {}", e));
        }

        self.banks
            .find_by_prefix(prefix)
            .await
            .map_err(|e| format!("bank lookup failed: {}", e))
    }

    /// Credits the source account back. A failed lookup leaves the balance
    /// unchanged; that is a fund discrepancy an operator must resolve, so it
    /// is logged loudly rather than silently swallowed.
    async fn refund(&self, tx: &Transaction) {
        match self.accounts.credit(&tx.account_from, &tx.amount).await {
            Ok(_) => {
                info!("refunded transaction {} by {} {}", tx.id, tx.amount, tx.currency);
            }
            Err(e) => {
                error!(
                    transaction = %tx.id,
                    account = %tx.account_from,
                    "refund failed, balance left unchanged, manual reconciliation required: {}", e
                );
            }
        }
    }

    async fn conclude(
        &self,
        tx: &mut Transaction,
        status: TransactionStatus,
        detail: Option<String>,
        outcome: Outcome,
    ) -> Outcome {
        if let Err(e) = self.set_status(tx, status, detail).await {
            error!("failed to persist status of transaction {}: {}", tx.id, e);
            return Outcome::Requeued;
        }
        outcome
    }

    async fn set_status(
        &self,
        tx: &mut Transaction,
        status: TransactionStatus,
        detail: Option<String>,
    ) -> Result<(), RepositoryError> {
        info!(
            "setting transaction {} as {}{}",
            tx.id,
            status,
            detail.as_deref().map(|d| format!(" ({})", d)).unwrap_or_default()
        );
        tx.status = status;
        tx.status_detail = detail;
        self.transactions.save(tx).await?;
        Ok(())
    }
}
