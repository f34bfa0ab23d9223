//! Client for the central registry's bank directory.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::domain::Bank;
use crate::ports::{BankRepository, RepositoryError};

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("central registry request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("central registry returned status {0}")]
    UnexpectedStatus(reqwest::StatusCode),

    #[error("malformed central registry response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("failed to store bank directory: {0}")]
    Store(#[from] RepositoryError),
}

/// One bank record as published by the registry. Unknown fields are ignored;
/// only the prefix and transaction URL are required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BankRecord {
    bank_prefix: String,
    transaction_url: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    owners: Option<String>,
    #[serde(default)]
    jwks_url: Option<String>,
}

impl BankRecord {
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

/// Fetches the authoritative bank list and swaps it into the local cache.
/// Not retried internally; callers decide the retry policy.
#[derive(Clone)]
pub struct BankDirectoryClient {
    client: Client,
    registry_url: String,
    api_key: String,
    banks: Arc<dyn BankRepository>,
}

impl BankDirectoryClient {
    pub fn new(
        registry_url: String,
        api_key: String,
        timeout: Duration,
        banks: Arc<dyn BankRepository>,
    ) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();

        Self {
            client,
            registry_url,
            api_key,
            banks,
        }
    }

    /// Replaces the local directory with the registry's current list and
    /// returns the number of banks installed. Any failure leaves the
    /// previous directory intact.
    pub async fn refresh(&self) -> Result<usize, DirectoryError> {
        info!("refreshing list of banks from central registry");

        let response = self
            .client
            .get(&self.registry_url)
            .header("Api-Key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::UnexpectedStatus(status));
        }

        let body = response.text().await?;
        let records: Vec<BankRecord> = serde_json::from_str(&body)?;
        let banks: Vec<Bank> = records.into_iter().map(BankRecord::into_domain).collect();
        let count = banks.len();

        self.banks.replace_all(&banks).await?;

        info!("bank directory refreshed with {} bank(s)", count);
        Ok(count)
    }
}
