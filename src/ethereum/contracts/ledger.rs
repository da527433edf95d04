//! Ledger ("ATM") contract bindings.
//!
//! The contract interface is loaded at runtime from a JSON ABI so deployments
//! with a different artifact can be targeted without rebuilding. Calls go
//! through a dynamic [`ContractInstance`].

use std::path::Path;

use alloy::{
    contract::{ContractInstance, Interface},
    dyn_abi::DynSolValue,
    json_abi::JsonAbi,
    network::ReceiptResponse,
    primitives::{Address, TxHash, U256},
    providers::{DynProvider, PendingTransactionBuilder, Provider},
};
use async_trait::async_trait;

use crate::{
    config::Config,
    error::{AppError, Result},
    ethereum::wallet::Signer,
    types::{ConfirmedTransaction, LedgerCall, RawTransactionRecord},
};

/// Functions the orchestrator relies on.
pub const REQUIRED_FUNCTIONS: [&str; 5] =
    ["getBalance", "deposit", "withdraw", "burn", "getTransactionHistory"];

/// Built-in ABI of the ledger contract.
pub const DEFAULT_LEDGER_ABI: &str = r#"[
  {
    "type": "function",
    "name": "getBalance",
    "inputs": [],
    "outputs": [{ "name": "", "type": "uint256" }],
    "stateMutability": "view"
  },
  {
    "type": "function",
    "name": "deposit",
    "inputs": [{ "name": "_amount", "type": "uint256" }],
    "outputs": [],
    "stateMutability": "payable"
  },
  {
    "type": "function",
    "name": "withdraw",
    "inputs": [{ "name": "_withdrawAmount", "type": "uint256" }],
    "outputs": [],
    "stateMutability": "nonpayable"
  },
  {
    "type": "function",
    "name": "burn",
    "inputs": [{ "name": "_amount", "type": "uint256" }],
    "outputs": [],
    "stateMutability": "nonpayable"
  },
  {
    "type": "function",
    "name": "getTransactionHistory",
    "inputs": [],
    "outputs": [
      {
        "name": "",
        "type": "tuple[]",
        "components": [
          { "name": "from", "type": "address" },
          { "name": "amount", "type": "uint256" },
          { "name": "timestamp", "type": "uint256" }
        ]
      }
    ],
    "stateMutability": "view"
  }
]"#;

/// Parse an ABI document: either a bare JSON ABI array or a build artifact
/// carrying the ABI under an `abi` key.
pub fn parse_abi_document(document: &str) -> Result<JsonAbi> {
    let value: serde_json::Value = serde_json::from_str(document)?;
    let abi_value = match value {
        serde_json::Value::Object(mut artifact) => artifact
            .remove("abi")
            .ok_or_else(|| AppError::Parse("artifact has no 'abi' field".to_string()))?,
        other => other,
    };
    let abi: JsonAbi = serde_json::from_value(abi_value)?;
    Ok(abi)
}

/// Check that every function the orchestrator calls is declared.
pub fn validate_abi(abi: &JsonAbi) -> Result<()> {
    let missing: Vec<&str> =
        REQUIRED_FUNCTIONS.iter().copied().filter(|name| abi.function(name).is_none()).collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::BindingFailed(format!("ABI is missing functions: {}", missing.join(", "))))
    }
}

/// Everything needed to bind the ledger contract, supplied at startup.
#[derive(Debug, Clone)]
pub struct LedgerTarget {
    /// Deployed contract address.
    pub address: Address,
    /// Contract interface description.
    pub abi: JsonAbi,
    /// Confirmations awaited after each mutating call.
    pub confirmations: u64,
    /// Chain the contract lives on, if pinned.
    pub expected_chain_id: Option<u64>,
}

impl LedgerTarget {
    /// Target using the built-in ABI.
    pub fn new(address: Address) -> Result<Self> {
        Ok(Self {
            address,
            abi: parse_abi_document(DEFAULT_LEDGER_ABI)?,
            confirmations: 1,
            expected_chain_id: None,
        })
    }

    /// Build the target from configuration, loading the ABI file if one is set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let abi = match config.abi_path.as_deref() {
            Some(path) => load_abi_file(path)?,
            None => parse_abi_document(DEFAULT_LEDGER_ABI)?,
        };

        Ok(Self {
            address: config.contract_address,
            abi,
            confirmations: config.confirmations,
            expected_chain_id: config.expected_chain_id,
        })
    }
}

fn load_abi_file(path: &Path) -> Result<JsonAbi> {
    let document = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Cannot read ABI file {}: {}", path.display(), e))
    })?;
    tracing::info!(path = %path.display(), "Loaded ledger ABI");
    parse_abi_document(&document)
}

// ============================================================================
// Contract boundary
// ============================================================================

/// Call surface of a bound ledger contract.
#[async_trait]
pub trait LedgerContract: Send + Sync {
    /// Contract address.
    fn address(&self) -> Address;

    /// Account the handle signs for.
    fn account(&self) -> Address;

    /// Read the account's ledger balance.
    async fn get_balance(&self) -> Result<U256>;

    /// Submit a mutating call and return once the node accepted it.
    async fn submit(&self, call: LedgerCall, amount: U256) -> Result<TxHash>;

    /// Wait until a submitted transaction is confirmed.
    async fn confirm(&self, tx_hash: TxHash) -> Result<ConfirmedTransaction>;

    /// Read the full transaction history in contract order.
    async fn get_transaction_history(&self) -> Result<Vec<RawTransactionRecord>>;
}

/// Ledger contract reached through alloy with a signer-bound provider.
pub struct AlloyLedger {
    instance: ContractInstance<DynProvider>,
    account: Address,
    confirmations: u64,
}

impl AlloyLedger {
    /// Bind the contract described by `target` to `signer`.
    pub fn new(target: &LedgerTarget, signer: Signer) -> Self {
        let interface = Interface::new(target.abi.clone());
        let instance = ContractInstance::new(target.address, signer.provider, interface);
        Self { instance, account: signer.account, confirmations: target.confirmations }
    }
}

#[async_trait]
impl LedgerContract for AlloyLedger {
    fn address(&self) -> Address {
        *self.instance.address()
    }

    fn account(&self) -> Address {
        self.account
    }

    async fn get_balance(&self) -> Result<U256> {
        tracing::debug!(contract = %self.address(), "Reading ledger balance");
        let outputs = self.instance.function("getBalance", &[])?.from(self.account).call().await?;
        decode_balance(&outputs)
    }

    async fn submit(&self, call: LedgerCall, amount: U256) -> Result<TxHash> {
        let args = [DynSolValue::Uint(amount, 256)];
        let pending = self
            .instance
            .function(call.function_name(), &args)?
            .from(self.account)
            .send()
            .await?;
        let tx_hash = *pending.tx_hash();

        tracing::info!(
            call = call.function_name(),
            amount = %amount,
            tx_hash = %tx_hash,
            "Ledger transaction submitted"
        );
        Ok(tx_hash)
    }

    async fn confirm(&self, tx_hash: TxHash) -> Result<ConfirmedTransaction> {
        let root = self.instance.provider().root().clone();
        let receipt = PendingTransactionBuilder::new(root, tx_hash)
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await?;

        if !receipt.status() {
            return Err(AppError::CallFailed(format!("transaction {tx_hash} reverted")));
        }

        tracing::info!(
            tx_hash = %tx_hash,
            block = ?receipt.block_number,
            "Ledger transaction confirmed"
        );
        Ok(ConfirmedTransaction { tx_hash, block_number: receipt.block_number })
    }

    async fn get_transaction_history(&self) -> Result<Vec<RawTransactionRecord>> {
        tracing::debug!(contract = %self.address(), "Reading ledger history");
        let outputs = self
            .instance
            .function("getTransactionHistory", &[])?
            .from(self.account)
            .call()
            .await?;
        decode_history(&outputs)
    }
}

fn unexpected(what: &str, value: &DynSolValue) -> AppError {
    AppError::CallFailed(format!("unexpected {what} encoding: {value:?}"))
}

fn decode_uint(value: &DynSolValue, what: &str) -> Result<U256> {
    value.as_uint().map(|(v, _)| v).ok_or_else(|| unexpected(what, value))
}

/// Decode the single `uint256` returned by `getBalance`.
pub fn decode_balance(outputs: &[DynSolValue]) -> Result<U256> {
    let value = outputs
        .first()
        .ok_or_else(|| AppError::CallFailed("getBalance returned nothing".to_string()))?;
    decode_uint(value, "balance")
}

/// Decode the `(address, uint256, uint256)[]` returned by `getTransactionHistory`.
pub fn decode_history(outputs: &[DynSolValue]) -> Result<Vec<RawTransactionRecord>> {
    let list = outputs
        .first()
        .ok_or_else(|| AppError::CallFailed("getTransactionHistory returned nothing".to_string()))?;
    let items = list.as_array().ok_or_else(|| unexpected("history", list))?;

    items
        .iter()
        .map(|item| {
            let fields = item.as_tuple().ok_or_else(|| unexpected("history entry", item))?;
            let [from, amount, timestamp] = fields else {
                return Err(unexpected("history entry", item));
            };
            Ok(RawTransactionRecord {
                from: from.as_address().ok_or_else(|| unexpected("sender", from))?,
                amount: decode_uint(amount, "amount")?,
                timestamp: decode_uint(timestamp, "timestamp")?,
            })
        })
        .collect()
}
