//! Ethereum RPC client.

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder, RootProvider},
    transports::{http::reqwest::Url, TransportError},
};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::{
    error::{AppError, Result},
    ethereum::constants::USER_REJECTED_REQUEST_CODE,
};

/// Ethereum RPC client wrapper with lazy initialization.
#[derive(Clone)]
pub struct EthereumClient {
    /// The underlying provider.
    provider: Arc<RootProvider<Ethereum>>,
    /// Parsed endpoint, reused when building signer-bound providers.
    url: Url,
    /// Lazily initialized chain ID.
    chain_id: Arc<OnceCell<u64>>,
}

impl EthereumClient {
    /// Create a new Ethereum client.
    ///
    /// Note: This does NOT make any network calls. The connection is
    /// established lazily when the first operation is performed.
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url: Url = rpc_url
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid RPC URL: {}", rpc_url)))?;

        let provider = ProviderBuilder::new().connect_http(url.clone()).root().clone();

        tracing::info!(rpc_url = %rpc_url, "Ethereum client created (lazy initialization)");

        Ok(Self { provider: Arc::new(provider), url, chain_id: Arc::new(OnceCell::new()) })
    }

    /// Get the chain ID (fetches from network on first call).
    pub async fn chain_id(&self) -> Result<u64> {
        self.chain_id
            .get_or_try_init(|| async {
                let chain_id = self.provider.get_chain_id().await?;
                tracing::info!(chain_id = chain_id, rpc_url = %self.url, "Connected to Ethereum node");
                Ok(chain_id)
            })
            .await
            .copied()
    }

    /// Accounts the node already exposes to this client (`eth_accounts`).
    pub async fn accounts(&self) -> Result<Vec<Address>> {
        self.provider.get_accounts().await.map_err(wallet_request_error)
    }

    /// Ask the node to authorize accounts (`eth_requestAccounts`).
    ///
    /// Browser-style providers may prompt here and answer with error code 4001
    /// when the user declines, which maps to [`AppError::UserRejected`].
    pub async fn request_accounts(&self) -> Result<Vec<Address>> {
        self.provider
            .raw_request::<(), Vec<Address>>("eth_requestAccounts".into(), ())
            .await
            .map_err(wallet_request_error)
    }

    /// Build a provider that can submit transactions.
    ///
    /// With a local wallet the provider signs itself; without one transactions
    /// go out as `eth_sendTransaction` and the node signs them.
    pub fn signing_provider(&self, wallet: Option<EthereumWallet>) -> DynProvider {
        match wallet {
            Some(wallet) => {
                ProviderBuilder::new().wallet(wallet).connect_http(self.url.clone()).erased()
            }
            None => ProviderBuilder::new().connect_http(self.url.clone()).erased(),
        }
    }
}

/// Map a wallet request failure into the wallet error taxonomy.
pub fn wallet_request_error(err: TransportError) -> AppError {
    match err.as_error_resp() {
        Some(payload) if payload.code == USER_REJECTED_REQUEST_CODE => AppError::UserRejected,
        Some(payload) => AppError::Wallet(format!("{} (code {})", payload.message, payload.code)),
        None => AppError::Transport(err.to_string()),
    }
}
