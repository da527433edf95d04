//! Ledger orchestrator: the connection state machine and the only path to the contract.
//!
//! State advances `Disconnected → WalletReady → Connected → Active`. The
//! account and its contract handle are stored together, so a handle exists
//! exactly when an account does, and balance/history live next to them so
//! they disappear with the binding they were read through.
//!
//! Mutating operations (`connect`, `deposit`, `withdraw`, `burn`) hold an
//! in-flight guard; reads may run at any time. Every change is published as a
//! [`LedgerSnapshot`] on a watch channel.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use alloy::primitives::{Address, U256};
use tokio::sync::{watch, Mutex};

use crate::{
    config::Config,
    error::{AppError, Result},
    ethereum::{
        contracts::{LedgerContract, LedgerTarget},
        ConfiguredWalletSource, WalletProvider,
    },
    services::{
        binder::{AlloyContractBinder, ContractBinder},
        gateway::WalletGateway,
        history::format_history,
    },
    types::{ConnectionState, LedgerCall, LedgerSnapshot, TransactionOutcome, TransactionRecord},
};

/// An authorized account together with the contract handle bound to it.
struct Binding {
    account: Address,
    contract: Arc<dyn LedgerContract>,
    balance: Option<String>,
    history: Vec<TransactionRecord>,
}

#[derive(Default)]
struct LedgerState {
    wallet: Option<Arc<dyn WalletProvider>>,
    binding: Option<Binding>,
}

impl LedgerState {
    fn connection_state(&self) -> ConnectionState {
        match (&self.wallet, &self.binding) {
            (_, Some(binding)) if binding.balance.is_some() => ConnectionState::Active,
            (_, Some(_)) => ConnectionState::Connected,
            (Some(_), None) => ConnectionState::WalletReady,
            (None, None) => ConnectionState::Disconnected,
        }
    }

    fn snapshot(&self, busy: bool) -> LedgerSnapshot {
        let binding = self.binding.as_ref();
        LedgerSnapshot {
            state: self.connection_state(),
            account: binding.map(|b| b.account),
            balance: binding.and_then(|b| b.balance.clone()),
            history: binding.map(|b| b.history.clone()).unwrap_or_default(),
            busy,
        }
    }

    /// Install a binding. Balance and history carry over only for the same account.
    fn bind(&mut self, account: Address, contract: Arc<dyn LedgerContract>) {
        let (balance, history) = match self.binding.take() {
            Some(previous) if previous.account == account => (previous.balance, previous.history),
            _ => (None, Vec::new()),
        };
        self.binding = Some(Binding { account, contract, balance, history });
    }

    /// The binding, but only if it still uses `contract`.
    fn binding_for(&mut self, contract: &Arc<dyn LedgerContract>) -> Option<&mut Binding> {
        self.binding.as_mut().filter(|b| Arc::ptr_eq(&b.contract, contract))
    }
}

fn stale_read(what: &str) -> AppError {
    tracing::warn!(read = what, "Binding changed during read; result discarded");
    AppError::CallFailed(format!("{what} read discarded: ledger binding changed while it was in flight"))
}

/// Clears the in-flight flag when a mutating operation ends.
struct InFlight<'a> {
    orchestrator: &'a LedgerOrchestrator,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.orchestrator.busy.store(false, Ordering::SeqCst);
        self.orchestrator.updates.send_modify(|snapshot| snapshot.busy = false);
    }
}

/// Owns the wallet/account/contract state and mediates every ledger call.
pub struct LedgerOrchestrator {
    gateway: WalletGateway,
    binder: Arc<dyn ContractBinder>,
    target: LedgerTarget,
    state: Mutex<LedgerState>,
    busy: AtomicBool,
    updates: watch::Sender<LedgerSnapshot>,
}

impl LedgerOrchestrator {
    /// Create an orchestrator. Nothing is detected until [`initialize`](Self::initialize).
    pub fn new(
        gateway: WalletGateway,
        binder: Arc<dyn ContractBinder>,
        target: LedgerTarget,
    ) -> Self {
        let (updates, _) = watch::channel(LedgerSnapshot::default());
        Self {
            gateway,
            binder,
            target,
            state: Mutex::new(LedgerState::default()),
            busy: AtomicBool::new(false),
            updates,
        }
    }

    /// Wire the configured wallet source, ledger target and alloy binder together.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = ConfiguredWalletSource::from_config(config)?;
        let target = LedgerTarget::from_config(config)?;
        Ok(Self::new(WalletGateway::new(Arc::new(source)), Arc::new(AlloyContractBinder), target))
    }

    // ========================================================================
    // Observable state
    // ========================================================================

    /// The ledger this orchestrator talks to.
    pub fn target(&self) -> &LedgerTarget {
        &self.target
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.updates.borrow().clone()
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<LedgerSnapshot> {
        self.updates.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.updates.borrow().state
    }

    pub fn account(&self) -> Option<Address> {
        self.updates.borrow().account
    }

    pub fn balance(&self) -> Option<String> {
        self.updates.borrow().balance.clone()
    }

    pub fn history(&self) -> Vec<TransactionRecord> {
        self.updates.borrow().history.clone()
    }

    /// Whether a mutating operation is in flight. Callers should not start another.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn publish(&self, state: &LedgerState) {
        self.updates.send_replace(state.snapshot(self.is_busy()));
    }

    fn begin(&self, operation: &'static str) -> Result<InFlight<'_>> {
        if self.busy.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            tracing::warn!(operation, "Rejected: another ledger operation is in flight");
            return Err(AppError::OperationInProgress);
        }
        self.updates.send_modify(|snapshot| snapshot.busy = true);
        Ok(InFlight { orchestrator: self })
    }

    async fn contract_for(&self, operation: &'static str) -> Result<Arc<dyn LedgerContract>> {
        let state = self.state.lock().await;
        match &state.binding {
            Some(binding) => Ok(binding.contract.clone()),
            None => {
                tracing::debug!(operation, state = %state.connection_state(), "Precondition failed");
                Err(AppError::NotConnected { operation })
            }
        }
    }

    // ========================================================================
    // Connection
    // ========================================================================

    /// Detect the wallet and silently reconnect a previously authorized account.
    ///
    /// Never fails: a missing wallet or account leaves the orchestrator in
    /// `Disconnected` or `WalletReady`.
    pub async fn initialize(&self) -> ConnectionState {
        let _in_flight = match self.begin("initialize") {
            Ok(guard) => guard,
            Err(_) => return self.state(),
        };

        let Some(wallet) = self.gateway.detect() else {
            tracing::info!("No wallet provider; waiting for one to be installed");
            return self.state();
        };

        {
            let mut state = self.state.lock().await;
            state.wallet = Some(wallet.clone());
            self.publish(&state);
        }

        let accounts = match self.gateway.silent_accounts(wallet.as_ref()).await {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::warn!(error = %e, "Could not enumerate authorized accounts");
                return self.state();
            }
        };

        let Some(account) = WalletGateway::first_account(&accounts) else {
            return self.state();
        };

        match self.binder.bind(wallet.as_ref(), account, &self.target).await {
            Ok(contract) => {
                let mut state = self.state.lock().await;
                state.bind(account, contract);
                self.publish(&state);
                tracing::info!(account = %account, "Reconnected previously authorized account");
            }
            Err(e) => tracing::warn!(account = %account, error = %e, "Silent reconnect failed"),
        }

        self.state()
    }

    /// Ask the wallet for an account and bind the ledger contract to it.
    ///
    /// Detects the wallet again if none was found earlier. On any failure the
    /// previous state is kept untouched.
    pub async fn connect(&self) -> Result<Address> {
        let _in_flight = self.begin("connect")?;

        let wallet = match self.gateway.require() {
            Ok(wallet) => wallet,
            Err(e) => {
                tracing::warn!("Connect requested but no wallet provider is installed");
                return Err(e);
            }
        };

        let accounts = self.gateway.request_accounts(wallet.as_ref()).await?;
        let account = WalletGateway::first_account(&accounts)
            .ok_or_else(|| AppError::Wallet("wallet authorized no accounts".to_string()))?;
        let contract = self.binder.bind(wallet.as_ref(), account, &self.target).await?;

        let mut state = self.state.lock().await;
        state.wallet = Some(wallet);
        state.bind(account, contract);
        self.publish(&state);

        tracing::info!(account = %account, "Account connected");
        Ok(account)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read the balance from the contract and store it.
    ///
    /// Fails if the binding was replaced while the read was in flight; the
    /// value is then discarded.
    pub async fn refresh_balance(&self) -> Result<String> {
        let contract = self.contract_for("refresh balance").await?;
        let balance = contract.get_balance().await?.to_string();

        let mut state = self.state.lock().await;
        let binding = state.binding_for(&contract).ok_or_else(|| stale_read("balance"))?;
        binding.balance = Some(balance.clone());
        self.publish(&state);

        tracing::debug!(balance = %balance, "Balance refreshed");
        Ok(balance)
    }

    /// Fetch the full history and replace the stored snapshot.
    pub async fn refresh_history(&self) -> Result<Vec<TransactionRecord>> {
        let contract = self.contract_for("refresh history").await?;
        let raw = contract.get_transaction_history().await?;
        let history = format_history(&raw)?;

        let mut state = self.state.lock().await;
        let binding = state.binding_for(&contract).ok_or_else(|| stale_read("history"))?;
        binding.history = history.clone();
        self.publish(&state);

        tracing::debug!(entries = history.len(), "History refreshed");
        Ok(history)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Deposit `amount`, then refresh balance and history.
    pub async fn deposit(&self, amount: U256) -> Result<TransactionOutcome> {
        self.execute(LedgerCall::Deposit, amount).await
    }

    /// Withdraw `amount`, then refresh balance and history.
    pub async fn withdraw(&self, amount: U256) -> Result<TransactionOutcome> {
        self.execute(LedgerCall::Withdraw, amount).await
    }

    /// Burn `amount`, then refresh the balance. History is left as it was.
    pub async fn burn(&self, amount: U256) -> Result<TransactionOutcome> {
        self.execute(LedgerCall::Burn, amount).await
    }

    async fn execute(&self, call: LedgerCall, amount: U256) -> Result<TransactionOutcome> {
        let _in_flight = self.begin(call.function_name())?;
        let contract = self.contract_for(call.function_name()).await?;
        if amount.is_zero() {
            return Err(AppError::InvalidAmount("amount must be greater than zero".to_string()));
        }

        tracing::info!(call = call.function_name(), amount = %amount, "Submitting ledger call");
        let tx_hash = contract.submit(call, amount).await?;
        let confirmed = contract.confirm(tx_hash).await?;

        // Refreshes run only after confirmation, balance first.
        let mut refresh_error = None;
        let balance = match self.refresh_balance().await {
            Ok(balance) => Some(balance),
            Err(e) => {
                tracing::warn!(error = %e, "Balance refresh after confirmation failed");
                refresh_error = Some(e.to_string());
                None
            }
        };

        if call.refreshes_history() {
            if let Err(e) = self.refresh_history().await {
                tracing::warn!(error = %e, "History refresh after confirmation failed");
                refresh_error.get_or_insert_with(|| e.to_string());
            }
        }

        Ok(TransactionOutcome {
            call,
            amount: amount.to_string(),
            tx_hash: confirmed.tx_hash.to_string(),
            block_number: confirmed.block_number,
            balance,
            refresh_error,
        })
    }
}
