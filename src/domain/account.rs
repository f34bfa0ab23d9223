//! Account domain entity.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's account. The settlement engine touches the balance only through
/// the refund credit; the originating debit happens outside this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_number: String,
    pub user_id: Uuid,
    pub balance: BigDecimal,
}

impl Account {
    pub fn new(account_number: String, user_id: Uuid) -> Self {
        Self {
            account_number,
            user_id,
            balance: BigDecimal::from(0),
        }
    }
}
