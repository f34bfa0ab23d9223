//! Bank domain entity: one entry of the locally cached directory.

use serde::{Deserialize, Serialize};

/// A participating bank as published by the central registry. The cache is
/// fully replaced on refresh and read-only to the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bank {
    pub bank_prefix: String,
    pub name: String,
    pub transaction_url: String,
    pub owners: Option<String>,
    pub jwks_url: Option<String>,
}
