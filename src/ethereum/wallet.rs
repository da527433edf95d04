//! Wallet providers.
//!
//! A wallet provider enumerates accounts, asks for authorization, and hands out
//! a signer-bound provider for the active account. Two providers ship here: a
//! node-managed wallet (accounts unlocked on the JSON-RPC node) and a locally
//! held private key.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use alloy::{
    network::EthereumWallet,
    primitives::Address,
    providers::DynProvider,
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;

use crate::{
    config::Config,
    error::{AppError, Result},
    ethereum::EthereumClient,
};

/// A signer derived from a wallet provider for one account.
#[derive(Clone)]
pub struct Signer {
    /// Account the signer acts for.
    pub account: Address,
    /// Chain the wallet is connected to.
    pub chain_id: u64,
    /// Provider able to submit transactions on behalf of `account`.
    pub provider: DynProvider,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("account", &self.account)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

/// Capability exposed by a detected wallet.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Short human-readable name used in logs.
    fn name(&self) -> &str;

    /// Accounts already authorized for this session. Never prompts.
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Ask for account authorization. May fail with [`AppError::UserRejected`].
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    /// Derive a transaction signer for `account`.
    async fn signer(&self, account: Address) -> Result<Signer>;
}

/// Where wallets come from. Detection must be side-effect free.
pub trait WalletSource: Send + Sync {
    /// The wallet currently exposed by the environment, if any.
    fn injected(&self) -> Option<Arc<dyn WalletProvider>>;
}

// ============================================================================
// Node Wallet
// ============================================================================

/// Wallet whose accounts are unlocked on the JSON-RPC node.
pub struct NodeWallet {
    client: EthereumClient,
}

impl NodeWallet {
    /// Create a node wallet on top of an RPC client.
    pub fn new(client: EthereumClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WalletProvider for NodeWallet {
    fn name(&self) -> &str {
        "node"
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        self.client.accounts().await
    }

    async fn request_accounts(&self) -> Result<Vec<Address>> {
        self.client.request_accounts().await
    }

    async fn signer(&self, account: Address) -> Result<Signer> {
        let chain_id = self
            .client
            .chain_id()
            .await
            .map_err(|e| AppError::BindingFailed(format!("wallet unreachable: {e}")))?;

        let unlocked = self
            .client
            .accounts()
            .await
            .map_err(|e| AppError::BindingFailed(format!("cannot list node accounts: {e}")))?;
        if !unlocked.contains(&account) {
            return Err(AppError::BindingFailed(format!(
                "account {account} is not unlocked on the node"
            )));
        }

        Ok(Signer { account, chain_id, provider: self.client.signing_provider(None) })
    }
}

// ============================================================================
// Local Key Wallet
// ============================================================================

/// Wallet backed by a private key held in process memory.
pub struct LocalKeyWallet {
    /// The local signer.
    signer: PrivateKeySigner,
    /// Wallet address.
    address: Address,
    /// RPC endpoint transactions are sent through.
    client: EthereumClient,
    /// Whether the account may be reported without an explicit request.
    authorized: AtomicBool,
}

impl LocalKeyWallet {
    /// Create a local wallet from a private key string.
    ///
    /// `remember_authorization` makes the account visible to silent
    /// enumeration straight away, as if a previous session had approved it.
    pub fn from_private_key(
        private_key: &str,
        client: EthereumClient,
        remember_authorization: bool,
    ) -> Result<Self> {
        // Remove 0x prefix if present
        let key = private_key.strip_prefix("0x").unwrap_or(private_key);

        let signer: PrivateKeySigner = key.parse()?;
        let address = signer.address();

        tracing::info!(address = %address, "Local key wallet initialized");

        Ok(Self {
            signer,
            address,
            client,
            authorized: AtomicBool::new(remember_authorization),
        })
    }

    /// Get the wallet address.
    pub fn address(&self) -> Address {
        self.address
    }
}

impl std::fmt::Debug for LocalKeyWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeyWallet").field("address", &self.address).finish()
    }
}

#[async_trait]
impl WalletProvider for LocalKeyWallet {
    fn name(&self) -> &str {
        "local-key"
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        if self.authorized.load(Ordering::SeqCst) {
            Ok(vec![self.address])
        } else {
            Ok(Vec::new())
        }
    }

    async fn request_accounts(&self) -> Result<Vec<Address>> {
        self.authorized.store(true, Ordering::SeqCst);
        Ok(vec![self.address])
    }

    async fn signer(&self, account: Address) -> Result<Signer> {
        if account != self.address {
            return Err(AppError::BindingFailed(format!(
                "account {account} is not held by this wallet"
            )));
        }

        let chain_id = self
            .client
            .chain_id()
            .await
            .map_err(|e| AppError::BindingFailed(format!("wallet unreachable: {e}")))?;

        let wallet = EthereumWallet::from(self.signer.clone());
        Ok(Signer { account, chain_id, provider: self.client.signing_provider(Some(wallet)) })
    }
}

// ============================================================================
// Configured Wallet Source
// ============================================================================

/// Wallet source resolved once from configuration.
///
/// A private key selects [`LocalKeyWallet`], otherwise an RPC URL alone selects
/// [`NodeWallet`]. Without an RPC URL no wallet is exposed.
pub struct ConfiguredWalletSource {
    wallet: Option<Arc<dyn WalletProvider>>,
}

impl ConfiguredWalletSource {
    /// Build the source from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let Some(rpc_url) = config.rpc_url.as_deref() else {
            tracing::warn!("ETHEREUM_RPC_URL not set; no wallet provider available");
            return Ok(Self { wallet: None });
        };

        let client = EthereumClient::new(rpc_url)?;
        let wallet: Arc<dyn WalletProvider> = match config.private_key.as_deref() {
            Some(key) => {
                Arc::new(LocalKeyWallet::from_private_key(key, client, config.auto_connect)?)
            }
            None => Arc::new(NodeWallet::new(client)),
        };

        tracing::info!(wallet = wallet.name(), "Wallet provider configured");
        Ok(Self { wallet: Some(wallet) })
    }

    /// A source that never exposes a wallet.
    pub fn empty() -> Self {
        Self { wallet: None }
    }
}

impl WalletSource for ConfiguredWalletSource {
    fn injected(&self) -> Option<Arc<dyn WalletProvider>> {
        self.wallet.clone()
    }
}
