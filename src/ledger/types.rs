use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::amount::Amount;

pub type AccountId = u64;
pub type CustomerId = u64;
pub type TransactionId = u64;

/// A ledger account as held by one worker node.
///
/// Created from the seed dataset at node startup and never deleted; the
/// balance is only mutated while the account's write lock is held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner_id: CustomerId,
    pub balance: Amount,
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Confirmed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "Pending"),
            TransactionStatus::Confirmed => write!(f, "Confirmed"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(TransactionStatus::Pending),
            "Confirmed" => Ok(TransactionStatus::Confirmed),
            other => Err(format!("unknown transaction status {other:?}")),
        }
    }
}

/// A movement of funds between two accounts.
///
/// Immutable once `Confirmed`; lives in the in-memory transaction table for
/// the node process lifetime (there is no durable storage in this design).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub from_account: AccountId,
    pub to_account: AccountId,
    pub amount: Amount,
    pub timestamp: NaiveDateTime,
    pub status: TransactionStatus,
}
