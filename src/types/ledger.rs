//! Ledger state and record types.

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

/// Connection progress of the orchestrator. Ordered: later states imply earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No wallet provider detected.
    Disconnected,
    /// Wallet detected, no account authorized.
    WalletReady,
    /// Account authorized and contract bound; balance not fetched yet.
    Connected,
    /// Balance fetched at least once.
    Active,
}

impl ConnectionState {
    /// Whether contract calls are allowed in this state.
    pub fn is_connected(self) -> bool {
        self >= ConnectionState::Connected
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::WalletReady => "wallet_ready",
            ConnectionState::Connected => "connected",
            ConnectionState::Active => "active",
        };
        f.write_str(name)
    }
}

/// Balance-mutating ledger functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerCall {
    Deposit,
    Withdraw,
    Burn,
}

impl LedgerCall {
    /// Contract function invoked for this call.
    pub fn function_name(self) -> &'static str {
        match self {
            LedgerCall::Deposit => "deposit",
            LedgerCall::Withdraw => "withdraw",
            LedgerCall::Burn => "burn",
        }
    }

    /// Whether a confirmed call changes the transaction history.
    ///
    /// Burns are not followed by a history refresh.
    pub fn refreshes_history(self) -> bool {
        !matches!(self, LedgerCall::Burn)
    }
}

/// History entry as decoded from the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransactionRecord {
    pub from: Address,
    pub amount: U256,
    pub timestamp: U256,
}

/// History entry ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Checksummed sender address.
    pub from: String,
    pub amount: u64,
    /// Unix seconds.
    pub timestamp: u64,
}

/// A mined transaction that reached the required confirmations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedTransaction {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Result of a confirmed deposit, withdrawal or burn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionOutcome {
    /// Which ledger function ran.
    pub call: LedgerCall,
    /// Raw amount passed to the contract.
    pub amount: String,
    /// Transaction hash.
    pub tx_hash: String,
    /// Block the transaction was included in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Balance after the post-confirmation refresh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    /// Set when a refresh after confirmation failed; the transaction itself succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_error: Option<String>,
}

/// Observable orchestrator state, published on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub state: ConnectionState,
    /// Active account.
    pub account: Option<Address>,
    /// Raw balance as a decimal string.
    pub balance: Option<String>,
    pub history: Vec<TransactionRecord>,
    /// A mutating operation is in flight.
    pub busy: bool,
}

impl Default for LedgerSnapshot {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            account: None,
            balance: None,
            history: Vec::new(),
            busy: false,
        }
    }
}
