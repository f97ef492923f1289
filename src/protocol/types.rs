use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::amount::Amount;
use crate::ledger::types::{AccountId, TransactionId};

/// A single operation request.
///
/// The router fills in `transaction_id` on `Transfer` before forwarding to a
/// worker node; a node only generates its own id when none was supplied
/// (defensive path, see [`LedgerStore`](crate::ledger::store::LedgerStore)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    QueryBalance {
        account_id: AccountId,
    },

    Transfer {
        from_id: AccountId,
        to_id: AccountId,
        amount: Amount,
        transaction_id: Option<TransactionId>,
    },

    Heartbeat,
}

/// The single reply to a [`Request`].
///
/// Application-level failures travel as `Error`; a dropped connection is a
/// transport failure and never appears here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Balance(Amount),

    Transfer { new_balance: Amount },

    Pong,

    Error(ProtocolError),
}

impl Response {
    pub fn is_ok(&self) -> bool {
        !matches!(self, Response::Error(_))
    }
}

/// Application-level error taxonomy carried inside [`Response::Error`].
///
/// `AccountNotFound`, `InsufficientFunds` and `InvalidAmount` originate on
/// worker nodes; `NoNodesAvailable` and `AllNodesFailed` originate on the
/// router; `UnsupportedOperation` can come from either side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ProtocolError {
    #[error("account {0} not found on this node")]
    AccountNotFound(AccountId),

    #[error("insufficient funds in account {0}")]
    InsufficientFunds(AccountId),

    #[error("transfer amount must be positive")]
    InvalidAmount,

    #[error("no nodes available to serve the request")]
    NoNodesAvailable,

    #[error("request failed on every candidate node")]
    AllNodesFailed,

    #[error("unsupported operation")]
    UnsupportedOperation,
}
