//! Common utilities for integration tests.
//!
//! In-memory implementations of the wallet, binder and ledger seams. Every
//! boundary call is appended to a shared log so tests can check ordering.

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use alloy::primitives::{address, Address, TxHash, B256, U256};
use async_trait::async_trait;
use tokio::sync::Semaphore;

use ledger_atm_mcp::{
    error::{AppError, Result},
    ethereum::{
        contracts::{LedgerContract, LedgerTarget},
        Signer, WalletProvider, WalletSource,
    },
    services::ContractBinder,
    types::{ConfirmedTransaction, LedgerCall, RawTransactionRecord},
    Config, LedgerOrchestrator, WalletGateway,
};

pub const ALICE: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const BOB: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
pub const LEDGER: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
pub const BLOCK_TIME: u64 = 1_700_000_000;

/// Shared, ordered record of boundary calls.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Only the calls that reached the ledger contract.
    pub fn ledger_calls(&self) -> Vec<String> {
        self.entries().into_iter().filter(|e| e.starts_with("ledger:")).collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

// ============================================================================
// Wallet
// ============================================================================

pub struct MockWallet {
    authorized: Mutex<Vec<Address>>,
    grant: Mutex<Vec<Address>>,
    reject: AtomicBool,
    /// When set, `request_accounts` waits for a permit.
    request_gate: Mutex<Option<Arc<Semaphore>>>,
    log: CallLog,
}

impl MockWallet {
    /// A wallet with `authorized` already approved that grants `grant` on request.
    pub fn new(authorized: Vec<Address>, grant: Vec<Address>, log: CallLog) -> Self {
        Self {
            authorized: Mutex::new(authorized),
            grant: Mutex::new(grant),
            reject: AtomicBool::new(false),
            request_gate: Mutex::new(None),
            log,
        }
    }

    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn set_grant(&self, grant: Vec<Address>) {
        *self.grant.lock().unwrap() = grant;
    }

    pub fn set_request_gate(&self, gate: Arc<Semaphore>) {
        *self.request_gate.lock().unwrap() = Some(gate);
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    fn name(&self) -> &str {
        "mock"
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        self.log.push("wallet:accounts");
        Ok(self.authorized.lock().unwrap().clone())
    }

    async fn request_accounts(&self) -> Result<Vec<Address>> {
        self.log.push("wallet:request_accounts");
        let gate = self.request_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.reject.load(Ordering::SeqCst) {
            return Err(AppError::UserRejected);
        }
        let granted = self.grant.lock().unwrap().clone();
        *self.authorized.lock().unwrap() = granted.clone();
        Ok(granted)
    }

    async fn signer(&self, _account: Address) -> Result<Signer> {
        Err(AppError::BindingFailed("mock wallet has no signer".to_string()))
    }
}

/// Wallet source whose wallet can appear after start-up.
#[derive(Default)]
pub struct MockSource {
    wallet: Mutex<Option<Arc<dyn WalletProvider>>>,
}

impl MockSource {
    pub fn install(&self, wallet: Arc<dyn WalletProvider>) {
        *self.wallet.lock().unwrap() = Some(wallet);
    }
}

impl WalletSource for MockSource {
    fn injected(&self) -> Option<Arc<dyn WalletProvider>> {
        self.wallet.lock().unwrap().clone()
    }
}

// ============================================================================
// Ledger
// ============================================================================

/// On-chain state shared by every handle the binder hands out.
pub struct LedgerBook {
    balance: Mutex<U256>,
    history: Mutex<Vec<RawTransactionRecord>>,
    pending: Mutex<Vec<(TxHash, LedgerCall, U256, Address)>>,
    nonce: Mutex<u8>,
    pub fail_submit: AtomicBool,
    pub fail_confirm: AtomicBool,
    pub fail_balance: AtomicBool,
    pub fail_history: AtomicBool,
    /// When set, `confirm` waits for a permit.
    pub confirm_gate: Option<Arc<Semaphore>>,
    /// When set, `get_balance` waits for a permit after logging the call.
    pub balance_gate: Option<Arc<Semaphore>>,
    log: CallLog,
}

impl LedgerBook {
    pub fn new(balance: u64, log: CallLog) -> Self {
        Self {
            balance: Mutex::new(U256::from(balance)),
            history: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            nonce: Mutex::new(0),
            fail_submit: AtomicBool::new(false),
            fail_confirm: AtomicBool::new(false),
            fail_balance: AtomicBool::new(false),
            fail_history: AtomicBool::new(false),
            confirm_gate: None,
            balance_gate: None,
            log,
        }
    }

    pub fn set_balance(&self, balance: u64) {
        *self.balance.lock().unwrap() = U256::from(balance);
    }

    pub fn push_history(&self, from: Address, amount: u64, timestamp: u64) {
        self.history.lock().unwrap().push(RawTransactionRecord {
            from,
            amount: U256::from(amount),
            timestamp: U256::from(timestamp),
        });
    }

    pub fn balance_value(&self) -> U256 {
        *self.balance.lock().unwrap()
    }
}

fn failure(flag: &AtomicBool, what: &str) -> Result<()> {
    if flag.load(Ordering::SeqCst) {
        Err(AppError::CallFailed(format!("{what} failed")))
    } else {
        Ok(())
    }
}

/// Handle bound to one account; a new one is created on every bind.
pub struct MockLedger {
    account: Address,
    book: Arc<LedgerBook>,
}

#[async_trait]
impl LedgerContract for MockLedger {
    fn address(&self) -> Address {
        LEDGER
    }

    fn account(&self) -> Address {
        self.account
    }

    async fn get_balance(&self) -> Result<U256> {
        self.book.log.push("ledger:get_balance");
        if let Some(gate) = &self.book.balance_gate {
            gate.acquire().await.unwrap().forget();
        }
        failure(&self.book.fail_balance, "getBalance")?;
        Ok(self.book.balance_value())
    }

    async fn submit(&self, call: LedgerCall, amount: U256) -> Result<TxHash> {
        self.book.log.push(format!("ledger:submit:{}:{}", call.function_name(), amount));
        failure(&self.book.fail_submit, "submit")?;

        let mut nonce = self.book.nonce.lock().unwrap();
        *nonce += 1;
        let tx_hash = B256::repeat_byte(*nonce);
        self.book.pending.lock().unwrap().push((tx_hash, call, amount, self.account));
        Ok(tx_hash)
    }

    async fn confirm(&self, tx_hash: TxHash) -> Result<ConfirmedTransaction> {
        if let Some(gate) = &self.book.confirm_gate {
            gate.acquire().await.unwrap().forget();
        }
        self.book.log.push("ledger:confirm");
        failure(&self.book.fail_confirm, "confirmation")?;

        let (call, amount, from) = {
            let mut pending = self.book.pending.lock().unwrap();
            let index = pending.iter().position(|(hash, ..)| *hash == tx_hash).unwrap();
            let (_, call, amount, from) = pending.remove(index);
            (call, amount, from)
        };

        {
            let mut balance = self.book.balance.lock().unwrap();
            match call {
                LedgerCall::Deposit => *balance += amount,
                LedgerCall::Withdraw | LedgerCall::Burn => *balance -= amount,
            }
        }
        if call != LedgerCall::Burn {
            self.book.push_history(from, amount.to::<u64>(), BLOCK_TIME);
        }

        Ok(ConfirmedTransaction { tx_hash, block_number: Some(7) })
    }

    async fn get_transaction_history(&self) -> Result<Vec<RawTransactionRecord>> {
        self.book.log.push("ledger:get_history");
        failure(&self.book.fail_history, "getTransactionHistory")?;
        Ok(self.book.history.lock().unwrap().clone())
    }
}

// ============================================================================
// Binder
// ============================================================================

pub struct MockBinder {
    book: Arc<LedgerBook>,
    pub fail: AtomicBool,
    log: CallLog,
}

impl MockBinder {
    pub fn new(book: Arc<LedgerBook>, log: CallLog) -> Self {
        Self { book, fail: AtomicBool::new(false), log }
    }
}

#[async_trait]
impl ContractBinder for MockBinder {
    async fn bind(
        &self,
        _wallet: &dyn WalletProvider,
        account: Address,
        target: &LedgerTarget,
    ) -> Result<Arc<dyn LedgerContract>> {
        self.log.push(format!("bind:{account}"));
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::BindingFailed("wallet is locked".to_string()));
        }
        assert_eq!(target.address, LEDGER);
        Ok(Arc::new(MockLedger { account, book: self.book.clone() }))
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub orchestrator: Arc<LedgerOrchestrator>,
    pub source: Arc<MockSource>,
    pub wallet: Arc<MockWallet>,
    pub ledger: Arc<LedgerBook>,
    pub binder: Arc<MockBinder>,
    pub log: CallLog,
}

pub struct HarnessBuilder {
    install_wallet: bool,
    authorized: Vec<Address>,
    grant: Vec<Address>,
    balance: u64,
    confirm_gate: Option<Arc<Semaphore>>,
    balance_gate: Option<Arc<Semaphore>>,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            install_wallet: true,
            authorized: Vec::new(),
            grant: vec![ALICE],
            balance: 0,
            confirm_gate: None,
            balance_gate: None,
        }
    }
}

impl HarnessBuilder {
    pub fn without_wallet(mut self) -> Self {
        self.install_wallet = false;
        self
    }

    pub fn authorized(mut self, accounts: Vec<Address>) -> Self {
        self.authorized = accounts;
        self
    }

    pub fn grant(mut self, accounts: Vec<Address>) -> Self {
        self.grant = accounts;
        self
    }

    pub fn balance(mut self, balance: u64) -> Self {
        self.balance = balance;
        self
    }

    pub fn confirm_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.confirm_gate = Some(gate);
        self
    }

    pub fn balance_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.balance_gate = Some(gate);
        self
    }

    pub fn build(self) -> Harness {
        let log = CallLog::default();
        let wallet = Arc::new(MockWallet::new(self.authorized, self.grant, log.clone()));
        let source = Arc::new(MockSource::default());
        if self.install_wallet {
            source.install(wallet.clone());
        }

        let mut ledger = LedgerBook::new(self.balance, log.clone());
        ledger.confirm_gate = self.confirm_gate;
        ledger.balance_gate = self.balance_gate;
        let ledger = Arc::new(ledger);
        let binder = Arc::new(MockBinder::new(ledger.clone(), log.clone()));

        let target = LedgerTarget::new(LEDGER).unwrap();
        let orchestrator = Arc::new(LedgerOrchestrator::new(
            WalletGateway::new(source.clone()),
            binder.clone(),
            target,
        ));

        Harness { orchestrator, source, wallet, ledger, binder, log }
    }
}

pub fn harness() -> HarnessBuilder {
    HarnessBuilder::default()
}

/// Build a harness already in the `Connected` state for [`ALICE`].
pub async fn connected(balance: u64) -> Harness {
    let h = harness().authorized(vec![ALICE]).balance(balance).build();
    h.orchestrator.initialize().await;
    h.log.clear();
    h
}

/// Helper to read live-node configuration from environment variables.
pub fn live_config() -> Option<Config> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env().ok()?;
    config.rpc_url.as_ref()?;
    Some(Config { log_level: "warn".to_string(), ..config })
}

/// Skip test if no node is configured.
#[macro_export]
macro_rules! skip_if_no_node {
    () => {
        match common::live_config() {
            Some(config) => config,
            None => {
                eprintln!("Skipping test: ETHEREUM_RPC_URL not set");
                return;
            }
        }
    };
}
