//! Transaction domain entity.
//! Framework-agnostic representation of an inter-bank transfer.

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Days a transfer may stay unsettled before it is expired and refunded.
pub const SETTLEMENT_TTL_DAYS: i64 = 3;

/// Lifecycle states of a transfer. `Completed` is the only terminal success;
/// `Failed` is terminal for expired or unknown-bank transfers. A transaction
/// returned to `Pending` with a detail is retried on the next pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::InProgress => "in_progress",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown transaction status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TransactionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "in_progress" => Ok(TransactionStatus::InProgress),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Domain entity representing a transfer owned by the settlement engine.
/// `amount` is fixed at creation; only status, detail and receiver change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub account_from: String,
    pub account_to: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub explanation: String,
    pub sender_name: String,
    pub receiver_name: Option<String>,
    pub status: TransactionStatus,
    pub status_detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        account_from: String,
        account_to: String,
        amount: BigDecimal,
        currency: String,
        explanation: String,
        sender_name: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_from,
            account_to,
            amount,
            currency,
            explanation,
            sender_name,
            receiver_name: None,
            status: TransactionStatus::Pending,
            status_detail: None,
            created_at: Utc::now(),
        }
    }

    /// First three characters of the destination account, identifying the
    /// owning bank. Shorter identifiers are returned whole.
    pub fn bank_prefix(&self) -> &str {
        self.account_to.get(..3).unwrap_or(&self.account_to)
    }

    /// Day-granularity deadline: the transfer expires at midnight three days
    /// after its creation date.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let date = self.created_at.date_naive() + Duration::days(SETTLEMENT_TTL_DAYS);
        Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }
}
