//! MCP server implementation.
//!
//! The tool surface only calls orchestrator operations and renders its state.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use rmcp::{
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::Serialize;

use crate::{
    error::AppError,
    services::LedgerOrchestrator,
    types::{format_units, parse_positive_amount, ConnectionState, TransactionRecord},
};

/// Amount used when a caller does not specify one.
const DEFAULT_AMOUNT: &str = "1";

/// Ledger ATM MCP Server.
///
/// Exposes wallet connection and the ledger's deposit, withdraw and burn calls.
#[derive(Clone)]
pub struct LedgerAtmServer {
    orchestrator: Arc<LedgerOrchestrator>,
    ledger_decimals: u8,
    tool_router: ToolRouter<Self>,
}

impl LedgerAtmServer {
    /// Create a server over an orchestrator.
    ///
    /// `ledger_decimals` only affects how amounts are displayed and parsed.
    pub fn new(orchestrator: Arc<LedgerOrchestrator>, ledger_decimals: u8) -> Self {
        Self { orchestrator, ledger_decimals, tool_router: Self::tool_router() }
    }

    fn display_balance(&self, raw: &str) -> Option<String> {
        raw.parse().ok().map(|value| format_units(value, self.ledger_decimals))
    }

    fn status(&self) -> StatusView {
        let snapshot = self.orchestrator.snapshot();
        StatusView {
            state: snapshot.state,
            account: snapshot.account,
            contract: self.orchestrator.target().address,
            balance_formatted: snapshot.balance.as_deref().and_then(|b| self.display_balance(b)),
            balance: snapshot.balance,
            history_entries: snapshot.history.len(),
            busy: snapshot.busy,
        }
    }

    fn parse_amount(&self, amount: Option<&str>) -> Result<U256, McpError> {
        parse_positive_amount(amount.unwrap_or(DEFAULT_AMOUNT), self.ledger_decimals)
            .map_err(|e| McpError::from(AppError::InvalidAmount(e)))
    }
}

/// Connection and balance summary.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub state: ConnectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<Address>,
    pub contract: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_formatted: Option<String>,
    pub history_entries: usize,
    pub busy: bool,
}

/// Transaction history response.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub count: usize,
    pub transactions: Vec<TransactionRecord>,
}

/// Input parameters for the deposit, withdraw and burn tools.
#[derive(Debug, Clone, Default, serde::Deserialize, schemars::JsonSchema)]
pub struct AmountInput {
    /// Amount in ledger units (e.g., "1"). Defaults to "1".
    #[serde(default)]
    pub amount: Option<String>,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))
}

#[tool_router]
impl LedgerAtmServer {
    /// Connect the wallet account and bind the ledger contract.
    ///
    /// Fetches the balance right away, as the account view needs it.
    #[tool(description = "Connect the wallet: request account authorization and bind the ledger contract")]
    pub async fn connect_wallet(&self) -> Result<String, McpError> {
        tracing::info!("connect_wallet called");

        self.orchestrator.connect().await?;
        if let Err(e) = self.orchestrator.refresh_balance().await {
            tracing::warn!(error = %e, "Initial balance read failed");
        }

        to_json(&self.status())
    }

    /// Report connection state, account and last known balance without touching the chain.
    #[tool(description = "Show wallet connection state, active account and last known ledger balance")]
    pub async fn get_status(&self) -> Result<String, McpError> {
        tracing::info!("get_status called");
        to_json(&self.status())
    }

    /// Re-read the ledger balance.
    #[tool(description = "Read the connected account's current ledger balance")]
    pub async fn get_balance(&self) -> Result<String, McpError> {
        tracing::info!("get_balance called");

        self.orchestrator.refresh_balance().await?;
        to_json(&self.status())
    }

    /// Deposit into the ledger and wait for confirmation.
    #[tool(description = "Deposit an amount into the ledger and wait for confirmation. Default amount: 1")]
    pub async fn deposit(
        &self,
        Parameters(input): Parameters<AmountInput>,
    ) -> Result<String, McpError> {
        tracing::info!(amount = ?input.amount, "deposit called");

        let amount = self.parse_amount(input.amount.as_deref())?;
        let outcome = self.orchestrator.deposit(amount).await?;
        to_json(&outcome)
    }

    /// Withdraw from the ledger and wait for confirmation.
    #[tool(description = "Withdraw an amount from the ledger and wait for confirmation. Default amount: 1")]
    pub async fn withdraw(
        &self,
        Parameters(input): Parameters<AmountInput>,
    ) -> Result<String, McpError> {
        tracing::info!(amount = ?input.amount, "withdraw called");

        let amount = self.parse_amount(input.amount.as_deref())?;
        let outcome = self.orchestrator.withdraw(amount).await?;
        to_json(&outcome)
    }

    /// Burn ledger balance and wait for confirmation.
    #[tool(description = "Burn an amount of the ledger balance and wait for confirmation. Default amount: 1")]
    pub async fn burn(&self, Parameters(input): Parameters<AmountInput>) -> Result<String, McpError> {
        tracing::info!(amount = ?input.amount, "burn called");

        let amount = self.parse_amount(input.amount.as_deref())?;
        let outcome = self.orchestrator.burn(amount).await?;
        to_json(&outcome)
    }

    /// Re-read the full transaction history.
    #[tool(description = "Fetch the ledger's full transaction history")]
    pub async fn get_transaction_history(&self) -> Result<String, McpError> {
        tracing::info!("get_transaction_history called");

        let transactions = self.orchestrator.refresh_history().await?;
        to_json(&HistoryView { count: transactions.len(), transactions })
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for LedgerAtmServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "ledger-atm-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Ledger ATM MCP Server. Connect a wallet, then deposit, withdraw or burn \
                 ledger balance and inspect the transaction history."
                    .to_string(),
            ),
        }
    }
}
