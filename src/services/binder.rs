//! Contract binder: turns a wallet and an account into a callable ledger handle.

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::{
    error::{AppError, Result},
    ethereum::{
        contracts::{ledger::validate_abi, AlloyLedger, LedgerContract, LedgerTarget},
        WalletProvider,
    },
};

/// Produces signer-bound ledger handles.
#[async_trait]
pub trait ContractBinder: Send + Sync {
    /// Bind `target` to the signer `wallet` derives for `account`.
    ///
    /// Must be called again whenever the active account changes.
    async fn bind(
        &self,
        wallet: &dyn WalletProvider,
        account: Address,
        target: &LedgerTarget,
    ) -> Result<Arc<dyn LedgerContract>>;
}

/// Binder producing [`AlloyLedger`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlloyContractBinder;

#[async_trait]
impl ContractBinder for AlloyContractBinder {
    async fn bind(
        &self,
        wallet: &dyn WalletProvider,
        account: Address,
        target: &LedgerTarget,
    ) -> Result<Arc<dyn LedgerContract>> {
        validate_abi(&target.abi)?;

        let signer = wallet.signer(account).await.map_err(|e| match e {
            AppError::BindingFailed(_) => e,
            other => AppError::BindingFailed(other.to_string()),
        })?;

        if let Some(expected) = target.expected_chain_id {
            if signer.chain_id != expected {
                return Err(AppError::BindingFailed(format!(
                    "wallet is on chain {}, ledger is deployed on chain {}",
                    signer.chain_id, expected
                )));
            }
        }

        tracing::info!(
            account = %account,
            contract = %target.address,
            chain_id = signer.chain_id,
            "Ledger contract bound"
        );

        Ok(Arc::new(AlloyLedger::new(target, signer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethereum::{EthereumClient, Signer};
    use alloy::{json_abi::JsonAbi, primitives::address};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ALICE: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const LEDGER: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

    /// Wallet whose signer reports a fixed chain, or fails.
    struct ChainWallet {
        chain_id: Option<u64>,
        signer_calls: AtomicUsize,
    }

    impl ChainWallet {
        fn on_chain(chain_id: u64) -> Self {
            Self { chain_id: Some(chain_id), signer_calls: AtomicUsize::new(0) }
        }

        fn broken() -> Self {
            Self { chain_id: None, signer_calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl WalletProvider for ChainWallet {
        fn name(&self) -> &str {
            "chain"
        }

        async fn accounts(&self) -> Result<Vec<Address>> {
            Ok(vec![ALICE])
        }

        async fn request_accounts(&self) -> Result<Vec<Address>> {
            Ok(vec![ALICE])
        }

        async fn signer(&self, account: Address) -> Result<Signer> {
            self.signer_calls.fetch_add(1, Ordering::SeqCst);
            let chain_id =
                self.chain_id.ok_or_else(|| AppError::Wallet("node unreachable".to_string()))?;
            let client = EthereumClient::new("http://127.0.0.1:1")?;
            Ok(Signer { account, chain_id, provider: client.signing_provider(None) })
        }
    }

    #[tokio::test]
    async fn test_bind_rejects_incomplete_abi() {
        let wallet = ChainWallet::on_chain(31337);
        let target = LedgerTarget { abi: JsonAbi::default(), ..LedgerTarget::new(LEDGER).unwrap() };

        let err = AlloyContractBinder.bind(&wallet, ALICE, &target).await.err().unwrap();

        assert!(matches!(err, AppError::BindingFailed(ref m) if m.contains("getBalance")));
        assert_eq!(wallet.signer_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bind_wraps_signer_errors() {
        let wallet = ChainWallet::broken();
        let target = LedgerTarget::new(LEDGER).unwrap();

        let err = AlloyContractBinder.bind(&wallet, ALICE, &target).await.err().unwrap();

        assert!(matches!(err, AppError::BindingFailed(ref m) if m.contains("node unreachable")));
    }

    #[tokio::test]
    async fn test_bind_rejects_wrong_chain() {
        let wallet = ChainWallet::on_chain(1);
        let target =
            LedgerTarget { expected_chain_id: Some(31337), ..LedgerTarget::new(LEDGER).unwrap() };

        let err = AlloyContractBinder.bind(&wallet, ALICE, &target).await.err().unwrap();

        assert!(matches!(err, AppError::BindingFailed(ref m) if m.contains("31337")));
    }

    #[tokio::test]
    async fn test_bind_produces_handle_for_account() {
        let wallet = ChainWallet::on_chain(31337);
        let target =
            LedgerTarget { expected_chain_id: Some(31337), ..LedgerTarget::new(LEDGER).unwrap() };

        let contract = AlloyContractBinder.bind(&wallet, ALICE, &target).await.unwrap();

        assert_eq!(contract.address(), LEDGER);
        assert_eq!(contract.account(), ALICE);
    }
}
