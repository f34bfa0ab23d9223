//! Compact JWS signing of outgoing transfer payloads.

use std::path::Path;

use bigdecimal::BigDecimal;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Transaction;

#[derive(Error, Debug)]
pub enum KeyLoadError {
    #[error("failed to read signing key {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse signing key: {0}")]
    Parse(#[from] jsonwebtoken::errors::Error),
}

/// Transfer fields covered by the signature, serialized in declaration
/// order so identical transactions produce identical payload segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferClaims {
    pub account_from: String,
    pub account_to: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub explanation: String,
    pub sender_name: String,
}

impl From<&Transaction> for TransferClaims {
    fn from(tx: &Transaction) -> Self {
        Self {
            account_from: tx.account_from.clone(),
            account_to: tx.account_to.clone(),
            amount: tx.amount.clone(),
            currency: tx.currency.clone(),
            explanation: tx.explanation.clone(),
            sender_name: tx.sender_name.clone(),
        }
    }
}

/// Signs transfer payloads with the process-held RSA private key. The key is
/// read and parsed once, at startup; a broken key refuses to start the
/// process instead of failing one transfer at a time.
pub struct JwsSigner {
    key: EncodingKey,
    header: Header,
}

impl std::fmt::Debug for JwsSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwsSigner")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl JwsSigner {
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, KeyLoadError> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|source| KeyLoadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let key = EncodingKey::from_rsa_pem(&pem)?;

        Ok(Self {
            key,
            header: Header::new(Algorithm::RS256),
        })
    }

    /// Produces the compact `header.payload.signature` token the destination
    /// bank verifies against our published key.
    pub fn sign(&self, claims: &TransferClaims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&self.header, claims, &self.key)
    }
}
