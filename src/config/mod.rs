//! Configuration management module.
//!
//! Handles loading configuration from environment variables.

use std::{env, path::PathBuf};

use alloy::primitives::Address;

use crate::{error::AppError, ethereum::constants::DEFAULT_LEDGER_ADDRESS};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON-RPC endpoint of the wallet provider. `None` means no wallet is available.
    pub rpc_url: Option<String>,
    /// Private key for a locally held wallet (hex string, 0x prefix optional).
    pub private_key: Option<String>,
    /// Whether a local key wallet reports its account without an explicit connect.
    pub auto_connect: bool,
    /// Deployed ledger contract address.
    pub contract_address: Address,
    /// Optional path to a JSON ABI or Hardhat artifact for the ledger contract.
    pub abi_path: Option<PathBuf>,
    /// Decimals used when displaying ledger amounts.
    pub ledger_decimals: u8,
    /// Block confirmations awaited after every mutating call.
    pub confirmations: u64,
    /// Chain the contract is deployed on; binding fails on any other chain.
    pub expected_chain_id: Option<u64>,
    /// Logging level (default: info).
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: None,
            private_key: None,
            auto_connect: true,
            contract_address: DEFAULT_LEDGER_ADDRESS,
            abi_path: None,
            ledger_decimals: 0,
            confirmations: 1,
            expected_chain_id: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `ETHEREUM_RPC_URL`: wallet provider JSON-RPC endpoint
    /// - `ETHEREUM_PRIVATE_KEY`: private key for a local wallet (hex)
    /// - `WALLET_AUTO_CONNECT`: remember local wallet authorization (default: true)
    /// - `LEDGER_CONTRACT_ADDRESS`: ledger contract address
    /// - `LEDGER_ABI_PATH`: JSON ABI or Hardhat artifact path
    /// - `LEDGER_DECIMALS`: display decimals (default: 0)
    /// - `LEDGER_CONFIRMATIONS`: confirmations to await (default: 1)
    /// - `EXPECTED_CHAIN_ID`: reject wallets on other chains
    /// - `LOG_LEVEL`: Logging level (default: info)
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let contract_address = match get("LEDGER_CONTRACT_ADDRESS") {
            Some(raw) => raw.parse::<Address>().map_err(|e| {
                AppError::Config(format!("Invalid LEDGER_CONTRACT_ADDRESS '{raw}': {e}"))
            })?,
            None => defaults.contract_address,
        };

        let auto_connect = match get("WALLET_AUTO_CONNECT") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                AppError::Config(format!("Invalid WALLET_AUTO_CONNECT '{raw}'"))
            })?,
            None => defaults.auto_connect,
        };

        let ledger_decimals = get("LEDGER_DECIMALS")
            .map(|raw| {
                raw.parse::<u8>()
                    .map_err(|e| AppError::Config(format!("Invalid LEDGER_DECIMALS '{raw}': {e}")))
            })
            .transpose()?
            .unwrap_or(defaults.ledger_decimals);

        let confirmations = get("LEDGER_CONFIRMATIONS")
            .map(|raw| {
                raw.parse::<u64>().map_err(|e| {
                    AppError::Config(format!("Invalid LEDGER_CONFIRMATIONS '{raw}': {e}"))
                })
            })
            .transpose()?
            .unwrap_or(defaults.confirmations);

        if confirmations == 0 {
            return Err(AppError::Config("LEDGER_CONFIRMATIONS must be at least 1".into()));
        }

        let expected_chain_id = get("EXPECTED_CHAIN_ID")
            .map(|raw| {
                raw.parse::<u64>()
                    .map_err(|e| AppError::Config(format!("Invalid EXPECTED_CHAIN_ID '{raw}': {e}")))
            })
            .transpose()?;

        Ok(Self {
            rpc_url: get("ETHEREUM_RPC_URL"),
            private_key: get("ETHEREUM_PRIVATE_KEY"),
            auto_connect,
            contract_address,
            abi_path: get("LEDGER_ABI_PATH").map(PathBuf::from),
            ledger_decimals,
            confirmations,
            expected_chain_id,
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
