//! Client for submitting signed transfers to destination banks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::domain::Bank;

type Breaker = StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>;

/// Failure talking to a destination bank. Carries the raw response text
/// collected before the failure so callers can log both.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
    pub response_text: String,
}

impl RemoteError {
    fn new(message: impl Into<String>, response_text: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            response_text: response_text.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteResponse {
    pub receiver_name: String,
}

/// Sends signed transactions to destination banks. No retries here; the
/// processor's Pending loop owns the retry policy. Each destination URL gets
/// its own consecutive-failures circuit breaker, so one dead bank cannot
/// fail-fast sends to healthy ones.
#[derive(Clone)]
pub struct RemoteBankClient {
    client: Client,
    breakers: Arc<Mutex<HashMap<String, Breaker>>>,
}

impl RemoteBankClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();

        Self {
            client,
            breakers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn breaker_for(&self, url: &str) -> Breaker {
        let mut breakers = self.breakers.lock().await;
        breakers
            .entry(url.to_string())
            .or_insert_with(|| {
                let backoff = backoff::equal_jittered(Duration::from_secs(30), Duration::from_secs(60));
                let policy = failure_policy::consecutive_failures(5, backoff);
                Config::new().failure_policy(policy).build()
            })
            .clone()
    }

    /// POSTs `{"jwt": <token>}` to the bank's transaction endpoint and parses
    /// the response. The body is read as text before JSON parsing so the raw
    /// text is available for diagnostics when parsing fails.
    pub async fn send(&self, bank: &Bank, jwt: &str) -> Result<RemoteResponse, RemoteError> {
        let breaker = self.breaker_for(&bank.transaction_url).await;
        let client = self.client.clone();
        let url = bank.transaction_url.clone();
        let body = serde_json::json!({ "jwt": jwt });

        let result = breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| RemoteError::new(e.to_string(), ""))?;

                let status = response.status();
                let text = response
                    .text()
                    .await
                    .map_err(|e| RemoteError::new(e.to_string(), ""))?;

                if !status.is_success() {
                    return Err(RemoteError::new(
                        format!("destination bank returned status {}", status),
                        text,
                    ));
                }

                serde_json::from_str::<RemoteResponse>(&text)
                    .map_err(|e| RemoteError::new(e.to_string(), text))
            })
            .await;

        match result {
            Ok(response) => Ok(response),
            Err(FailsafeError::Rejected) => Err(RemoteError::new(
                format!("destination bank {} circuit breaker is open", bank.bank_prefix),
                "",
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}
