//! Wallet gateway: detection and account enumeration.

use std::sync::Arc;

use alloy::primitives::Address;

use crate::{
    error::{AppError, Result},
    ethereum::{WalletProvider, WalletSource},
};

/// Thin adapter between the orchestrator and whatever wallet the environment exposes.
#[derive(Clone)]
pub struct WalletGateway {
    source: Arc<dyn WalletSource>,
}

impl WalletGateway {
    /// Create a gateway over a wallet source.
    pub fn new(source: Arc<dyn WalletSource>) -> Self {
        Self { source }
    }

    /// Look for a wallet provider. Never prompts; safe to call repeatedly.
    pub fn detect(&self) -> Option<Arc<dyn WalletProvider>> {
        let wallet = self.source.injected();
        match &wallet {
            Some(w) => tracing::debug!(wallet = w.name(), "Wallet provider detected"),
            None => tracing::debug!("No wallet provider detected"),
        }
        wallet
    }

    /// Like [`detect`](Self::detect), failing with [`AppError::WalletAbsent`].
    pub fn require(&self) -> Result<Arc<dyn WalletProvider>> {
        self.detect().ok_or(AppError::WalletAbsent)
    }

    /// Accounts already authorized, without prompting. Empty when none are.
    pub async fn silent_accounts(&self, wallet: &dyn WalletProvider) -> Result<Vec<Address>> {
        let accounts = wallet.accounts().await?;
        tracing::debug!(wallet = wallet.name(), count = accounts.len(), "Authorized accounts");
        Ok(accounts)
    }

    /// Ask the user to authorize accounts.
    pub async fn request_accounts(&self, wallet: &dyn WalletProvider) -> Result<Vec<Address>> {
        tracing::info!(wallet = wallet.name(), "Requesting account authorization");
        match wallet.request_accounts().await {
            Ok(accounts) => Ok(accounts),
            Err(AppError::UserRejected) => {
                tracing::warn!(wallet = wallet.name(), "Account authorization rejected");
                Err(AppError::UserRejected)
            }
            Err(e) => Err(e),
        }
    }

    /// The active account is always the first one a wallet reports.
    pub fn first_account(accounts: &[Address]) -> Option<Address> {
        let account = accounts.first().copied();
        match account {
            Some(a) => tracing::info!(account = %a, "Account found"),
            None => tracing::info!("No account found"),
        }
        account
    }
}
