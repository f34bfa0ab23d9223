pub mod account;
pub mod bank;
pub mod transaction;

pub use account::Account;
pub use bank::Bank;
pub use transaction::{Transaction, TransactionStatus, UnknownStatus};
