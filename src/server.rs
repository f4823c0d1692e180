//! MCP server exposing Monarch Money operations as tools.
//!
//! Uses `rmcp` macros to route tool calls. Every handler follows the
//! same contract: obtain the shared client, perform exactly one remote
//! operation, flatten the response, serialize to text. Failures anywhere
//! in that chain become an error-text tool result; one bad call must
//! never take the server down.

extern crate alloc;

use alloc::sync::Arc;

use chrono::NaiveDate;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use tokio::sync::OnceCell;

use crate::auth;
use crate::client::{
    CashflowFilters, CreateTransactionInput, MonarchGateway, TransactionFilters,
    UpdateTransactionInput,
};
use crate::config::ServerConfig;
use crate::error::{MonarchError, MonarchResult};
use crate::params::{
    CreateTransactionParams, GetAccountHoldingsParams, GetCashflowParams, GetTransactionsParams,
    UpdateTransactionParams,
};
use crate::response::{AccountOverview, BudgetOverview, TransactionOverview};

/// Static instructions returned by the `setup_authentication` tool.
const SETUP_INSTRUCTIONS: &str = "Monarch Money - one-time setup

1. Open a terminal and run the bundled monarch-login utility.
2. Enter your Monarch Money credentials when prompted:
   email, password, and a two-factor code if MFA is enabled.
3. The session is saved to every location this server searches
   and typically stays valid for weeks.
4. Restart your MCP client, then use the Monarch tools:
   - get_accounts: view all accounts
   - get_transactions: recent transactions
   - get_budgets: budget information

Sessions persist across restarts, and credentials never pass
through the assistant.";

/// Validates that a date parameter is `YYYY-MM-DD`.
fn checked_date(raw: String) -> MonarchResult<String> {
    match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        Ok(_parsed) => Ok(raw),
        Err(err) => Err(MonarchError::InvalidDate {
            value: raw,
            reason: err.to_string(),
        }),
    }
}

/// Validates an optional date parameter, passing `None` through.
fn checked_date_opt(raw: Option<String>) -> MonarchResult<Option<String>> {
    raw.map(checked_date).transpose()
}

/// Serializes a value to a pretty-printed JSON success result.
fn json_result<T: serde::Serialize>(value: &T) -> MonarchResult<CallToolResult> {
    let text = serde_json::to_string_pretty(value)?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Converts any handler failure into an error-text tool result.
///
/// This is the whole error policy of the server: below this boundary
/// errors propagate with `?`, at the boundary they all become text, so
/// the hosting runtime never observes a failed call.
fn recover(context: &str, outcome: MonarchResult<CallToolResult>) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(result) => Ok(result),
        Err(err) => {
            tracing::error!(%err, context, "tool call failed");
            Ok(CallToolResult::error(vec![Content::text(format!(
                "Error {context}: {err}"
            ))]))
        }
    }
}

/// MCP server wrapping the Monarch Money personal finance API.
#[derive(Clone)]
pub struct MonarchMcpServer {
    /// Resolved configuration.
    config: Arc<ServerConfig>,
    /// Process-wide client handle, populated by the first call needing it.
    ///
    /// A failed initialization leaves the cell empty, so every later call
    /// re-runs the session search and reports the same remediation error
    /// rather than caching a sticky failure.
    gateway: Arc<OnceCell<Arc<dyn MonarchGateway>>>,
    /// Tool router for dispatching MCP tool calls.
    tool_router: ToolRouter<Self>,
}

impl core::fmt::Debug for MonarchMcpServer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MonarchMcpServer").finish_non_exhaustive()
    }
}

#[tool_router]
impl MonarchMcpServer {
    /// Creates a server that authenticates lazily on first use.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            gateway: Arc::new(OnceCell::new()),
            tool_router: Self::tool_router(),
        }
    }

    /// Creates a server with a pre-established gateway.
    #[must_use]
    pub fn with_gateway(config: ServerConfig, gateway: Arc<dyn MonarchGateway>) -> Self {
        Self {
            config: Arc::new(config),
            gateway: Arc::new(OnceCell::new_with(Some(gateway))),
            tool_router: Self::tool_router(),
        }
    }

    /// Returns the shared client, creating it on first use.
    async fn gateway(&self) -> MonarchResult<Arc<dyn MonarchGateway>> {
        let gateway = self
            .gateway
            .get_or_try_init(|| async {
                let client = auth::establish(&self.config).await?;
                let shared: Arc<dyn MonarchGateway> = Arc::new(client);
                Ok::<_, MonarchError>(shared)
            })
            .await?;
        Ok(Arc::clone(gateway))
    }

    /// Inner body of `get_accounts`.
    async fn list_accounts(&self) -> MonarchResult<CallToolResult> {
        let gateway = self.gateway().await?;
        let accounts = gateway.accounts().await?;
        let result: Vec<AccountOverview> =
            accounts.iter().map(AccountOverview::from_account).collect();
        json_result(&result)
    }

    /// Inner body of `get_transactions`.
    async fn list_transactions(
        &self,
        params: GetTransactionsParams,
    ) -> MonarchResult<CallToolResult> {
        let filters = TransactionFilters {
            start_date: checked_date_opt(params.start_date)?,
            end_date: checked_date_opt(params.end_date)?,
            account_id: params.account_id,
        };
        let gateway = self.gateway().await?;
        let transactions = gateway
            .transactions(params.limit, params.offset, filters)
            .await?;
        let result: Vec<TransactionOverview> = transactions
            .iter()
            .map(TransactionOverview::from_transaction)
            .collect();
        json_result(&result)
    }

    /// Inner body of `get_budgets`.
    async fn list_budgets(&self) -> MonarchResult<CallToolResult> {
        let gateway = self.gateway().await?;
        let budgets = gateway.budgets().await?;
        let result: Vec<BudgetOverview> =
            budgets.iter().map(BudgetOverview::from_budget).collect();
        json_result(&result)
    }

    /// Inner body of `get_cashflow`.
    async fn cashflow_report(&self, params: GetCashflowParams) -> MonarchResult<CallToolResult> {
        let filters = CashflowFilters {
            start_date: checked_date_opt(params.start_date)?,
            end_date: checked_date_opt(params.end_date)?,
        };
        let gateway = self.gateway().await?;
        let report = gateway.cashflow(filters).await?;
        json_result(&report)
    }

    /// Inner body of `get_account_holdings`.
    async fn holdings(&self, params: GetAccountHoldingsParams) -> MonarchResult<CallToolResult> {
        let gateway = self.gateway().await?;
        let holdings = gateway.account_holdings(&params.account_id).await?;
        json_result(&holdings)
    }

    /// Inner body of `create_transaction`.
    async fn create(&self, params: CreateTransactionParams) -> MonarchResult<CallToolResult> {
        let input = CreateTransactionInput {
            account_id: params.account_id,
            amount: params.amount,
            description: params.description,
            date: checked_date(params.date)?,
            category_id: params.category_id,
            merchant_name: params.merchant_name,
        };
        let gateway = self.gateway().await?;
        let created = gateway.create_transaction(input).await?;
        json_result(&created)
    }

    /// Inner body of `update_transaction`.
    async fn update(&self, params: UpdateTransactionParams) -> MonarchResult<CallToolResult> {
        let input = UpdateTransactionInput {
            id: params.transaction_id,
            amount: params.amount,
            description: params.description,
            category_id: params.category_id,
            date: checked_date_opt(params.date)?,
        };
        let gateway = self.gateway().await?;
        let updated = gateway.update_transaction(input).await?;
        json_result(&updated)
    }

    /// Inner body of `refresh_accounts`.
    async fn refresh(&self) -> MonarchResult<CallToolResult> {
        let gateway = self.gateway().await?;
        let outcome = gateway.request_accounts_refresh().await?;
        json_result(&outcome)
    }

    /// Builds the `check_auth_status` diagnostic text.
    fn auth_status_text(&self) -> String {
        let mut lines = vec!["Session file check:".to_owned()];
        for path in self.config.candidate_session_paths() {
            let marker = if path.exists() { "found" } else { "missing" };
            lines.push(format!("  {marker}: {}", path.display()));
        }
        match self.config.email() {
            Some(email) => lines.push(format!("Environment email: {email}")),
            None => lines.push("Environment credentials: not set".to_owned()),
        }
        lines.push(String::new());
        lines.push(
            "Run get_accounts to test the connection, or the monarch-login \
             utility to authenticate."
                .to_owned(),
        );
        lines.join("\n")
    }

    // ── Read tools ──────────────────────────────────────────────────

    /// Lists all accounts.
    #[tool(description = "Get all financial accounts from Monarch Money")]
    async fn get_accounts(&self) -> Result<CallToolResult, McpError> {
        recover("getting accounts", self.list_accounts().await)
    }

    /// Lists transactions with optional filtering.
    #[tool(
        description = "Get transactions from Monarch Money with optional filters: \
                       date range, account, and paging via limit/offset"
    )]
    async fn get_transactions(
        &self,
        params: Parameters<GetTransactionsParams>,
    ) -> Result<CallToolResult, McpError> {
        recover("getting transactions", self.list_transactions(params.0).await)
    }

    /// Lists all budgets.
    #[tool(description = "Get budget information from Monarch Money")]
    async fn get_budgets(&self) -> Result<CallToolResult, McpError> {
        recover("getting budgets", self.list_budgets().await)
    }

    /// Returns the cashflow analysis.
    #[tool(
        description = "Get cashflow analysis from Monarch Money, optionally for a date range"
    )]
    async fn get_cashflow(
        &self,
        params: Parameters<GetCashflowParams>,
    ) -> Result<CallToolResult, McpError> {
        recover("getting cashflow", self.cashflow_report(params.0).await)
    }

    /// Returns investment holdings for one account.
    #[tool(description = "Get investment holdings for a specific account")]
    async fn get_account_holdings(
        &self,
        params: Parameters<GetAccountHoldingsParams>,
    ) -> Result<CallToolResult, McpError> {
        recover("getting account holdings", self.holdings(params.0).await)
    }

    // ── Write tools ─────────────────────────────────────────────────

    /// Creates a new transaction.
    #[tool(
        description = "Create a new transaction in Monarch Money. Amount is positive \
                       for income, negative for expenses; date is YYYY-MM-DD"
    )]
    async fn create_transaction(
        &self,
        params: Parameters<CreateTransactionParams>,
    ) -> Result<CallToolResult, McpError> {
        recover("creating transaction", self.create(params.0).await)
    }

    /// Updates an existing transaction.
    #[tool(
        description = "Update an existing transaction in Monarch Money. \
                       Only the supplied fields are changed"
    )]
    async fn update_transaction(
        &self,
        params: Parameters<UpdateTransactionParams>,
    ) -> Result<CallToolResult, McpError> {
        recover("updating transaction", self.update(params.0).await)
    }

    /// Requests a data refresh from the linked institutions.
    #[tool(description = "Request account data refresh from financial institutions")]
    async fn refresh_accounts(&self) -> Result<CallToolResult, McpError> {
        recover("refreshing accounts", self.refresh().await)
    }

    // ── Diagnostics ─────────────────────────────────────────────────

    /// Reports which session files and credentials are available.
    #[tool(description = "Check if already authenticated with Monarch Money")]
    async fn check_auth_status(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(
            self.auth_status_text(),
        )]))
    }

    /// Returns the one-time setup instructions.
    #[tool(
        description = "Get instructions for setting up secure authentication with Monarch Money"
    )]
    async fn setup_authentication(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(
            SETUP_INSTRUCTIONS,
        )]))
    }
}

#[tool_handler]
impl ServerHandler for MonarchMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Monarch Money personal finance MCP server. \
                 Query accounts, transactions, budgets, cashflow, and holdings; \
                 create or update transactions; run check_auth_status if calls \
                 report an authentication error."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::std_instead_of_alloc,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::fs;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rmcp::handler::server::wrapper::Parameters;
    use rmcp::model::CallToolResult;
    use serde_json::Value;

    use super::MonarchMcpServer;
    use crate::client::{
        CashflowFilters, CreateTransactionInput, MonarchGateway, TransactionFilters,
        UpdateTransactionInput,
    };
    use crate::config::ServerConfig;
    use crate::error::{MonarchError, MonarchResult};
    use crate::model::{Account, Budget, Transaction};
    use crate::params::{GetAccountHoldingsParams, GetTransactionsParams};

    /// Configurable stand-in for the remote API.
    #[derive(Default)]
    struct MockGateway {
        fail: bool,
        calls: AtomicUsize,
        last_filters: Mutex<Option<TransactionFilters>>,
    }

    impl MockGateway {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn tally(&self) -> MonarchResult<()> {
            let _count = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MonarchError::Api {
                    status: 500,
                    message: "mock remote failure".to_owned(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl MonarchGateway for MockGateway {
        async fn accounts(&self) -> MonarchResult<Vec<Account>> {
            self.tally()?;
            let account: Account = serde_json::from_str(
                r#"{
                    "id": "acc-1",
                    "displayName": "Everyday Checking",
                    "institution": null,
                    "currentBalance": 100.0
                }"#,
            )
            .expect("parseable fixture");
            Ok(vec![account])
        }

        async fn transactions(
            &self,
            _limit: u32,
            _offset: u32,
            filters: TransactionFilters,
        ) -> MonarchResult<Vec<Transaction>> {
            self.tally()?;
            *self.last_filters.lock().expect("uncontended lock") = Some(filters);
            Ok(Vec::new())
        }

        async fn budgets(&self) -> MonarchResult<Vec<Budget>> {
            self.tally()?;
            Ok(Vec::new())
        }

        async fn cashflow(&self, _filters: CashflowFilters) -> MonarchResult<Value> {
            self.tally()?;
            Ok(serde_json::json!({"summary": {"sumIncome": 10.0}}))
        }

        async fn account_holdings(&self, _account_id: &str) -> MonarchResult<Value> {
            self.tally()?;
            Ok(serde_json::json!({"portfolio": {}}))
        }

        async fn create_transaction(
            &self,
            _input: CreateTransactionInput,
        ) -> MonarchResult<Value> {
            self.tally()?;
            Ok(serde_json::json!({"transaction": {"id": "txn-new"}}))
        }

        async fn update_transaction(
            &self,
            _input: UpdateTransactionInput,
        ) -> MonarchResult<Value> {
            self.tally()?;
            Ok(serde_json::json!({"transaction": {"id": "txn-1"}}))
        }

        async fn request_accounts_refresh(&self) -> MonarchResult<Value> {
            self.tally()?;
            Ok(serde_json::json!({"success": true}))
        }
    }

    fn server_with(mock: &Arc<MockGateway>) -> MonarchMcpServer {
        let gateway: Arc<dyn MonarchGateway> = mock.clone();
        MonarchMcpServer::with_gateway(ServerConfig::new(), gateway)
    }

    fn result_text(result: &CallToolResult) -> String {
        serde_json::to_value(result)
            .ok()
            .and_then(|value| {
                value
                    .pointer("/content/0/text")
                    .and_then(Value::as_str)
                    .map(ToOwned::to_owned)
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn get_accounts_returns_flattened_json() {
        let mock = Arc::new(MockGateway::default());
        let server = server_with(&mock);

        let result = server.get_accounts().await.expect("handler never raises");
        assert_ne!(result.is_error, Some(true));
        let text = result_text(&result);
        assert!(text.contains("acc-1"));
        assert!(text.contains("Everyday Checking"));
        // The manual account's null institution survives as null.
        assert!(text.contains("\"institution\": null"));
    }

    #[tokio::test]
    async fn failures_become_error_text_and_server_keeps_serving() {
        let mock = Arc::new(MockGateway::failing());
        let server = server_with(&mock);

        let result = server.get_accounts().await.expect("handler never raises");
        assert_eq!(result.is_error, Some(true));
        assert!(result_text(&result).contains("Error getting accounts"));

        // The next call is served normally, with its own error text.
        let result = server.get_budgets().await.expect("handler never raises");
        assert_eq!(result.is_error, Some(true));
        assert!(result_text(&result).contains("Error getting budgets"));
        assert_eq!(mock.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn omitted_transaction_filters_stay_omitted() {
        let mock = Arc::new(MockGateway::default());
        let server = server_with(&mock);

        let params = GetTransactionsParams {
            limit: 50,
            start_date: Some("2024-01-01".to_owned()),
            ..GetTransactionsParams::default()
        };
        let result = server
            .get_transactions(Parameters(params))
            .await
            .expect("handler never raises");
        assert_ne!(result.is_error, Some(true));

        let forwarded = mock
            .last_filters
            .lock()
            .expect("uncontended lock")
            .clone()
            .expect("filters recorded");
        let wire = serde_json::to_value(&forwarded).expect("serializable filters");
        let object = wire.as_object().expect("filters serialize to an object");
        assert!(object.contains_key("startDate"));
        assert!(!object.contains_key("endDate"));
        assert!(!object.contains_key("accountId"));
    }

    #[tokio::test]
    async fn malformed_date_is_rejected_before_any_remote_call() {
        let mock = Arc::new(MockGateway::default());
        let server = server_with(&mock);

        let params = GetTransactionsParams {
            start_date: Some("January 1st".to_owned()),
            ..GetTransactionsParams::default()
        };
        let result = server
            .get_transactions(Parameters(params))
            .await
            .expect("handler never raises");
        assert_eq!(result.is_error, Some(true));
        assert!(result_text(&result).contains("invalid date"));
        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn write_and_passthrough_tools_serve_raw_payloads() {
        let mock = Arc::new(MockGateway::default());
        let server = server_with(&mock);

        let result = server
            .get_account_holdings(Parameters(GetAccountHoldingsParams {
                account_id: "acc-inv-1".to_owned(),
            }))
            .await
            .expect("handler never raises");
        assert_ne!(result.is_error, Some(true));
        assert!(result_text(&result).contains("portfolio"));

        let result = server
            .refresh_accounts()
            .await
            .expect("handler never raises");
        assert!(result_text(&result).contains("success"));
    }

    #[tokio::test]
    async fn accessor_reuses_the_populated_handle() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"token": "tok-1"}"#).expect("writable temp file");
        let config = ServerConfig::new()
            .with_session_file(path)
            .with_home_dir(dir.path().to_path_buf());
        let server = MonarchMcpServer::new(config);

        let first = server.gateway().await.expect("session loads");
        let second = server.gateway().await.expect("handle reused");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn accessor_failure_is_not_sticky() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = ServerConfig::new()
            .with_session_file(dir.path().join("absent.json"))
            .with_home_dir(dir.path().to_path_buf());
        let server = MonarchMcpServer::new(config);

        let err = server.gateway().await.err().expect("nothing to load");
        assert!(matches!(err, MonarchError::AuthenticationRequired));

        // The same remediation error is reported again on the next call.
        let err = server.gateway().await.err().expect("still nothing to load");
        assert!(matches!(err, MonarchError::AuthenticationRequired));
    }

    #[tokio::test]
    async fn auth_error_reaches_the_tool_caller_as_text() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = ServerConfig::new()
            .with_session_file(dir.path().join("absent.json"))
            .with_home_dir(dir.path().to_path_buf());
        let server = MonarchMcpServer::new(config);

        let result = server.get_accounts().await.expect("handler never raises");
        assert_eq!(result.is_error, Some(true));
        assert!(result_text(&result).contains("authentication required"));
        assert!(result_text(&result).contains("monarch-login"));
    }

    #[tokio::test]
    async fn auth_status_reports_candidates_and_credentials() {
        let dir = tempfile::tempdir().expect("temp dir");
        let present = dir.path().join("session.json");
        fs::write(&present, r#"{"token": "tok-1"}"#).expect("writable temp file");
        let config = ServerConfig::new()
            .with_session_file(present.clone())
            .with_home_dir(dir.path().to_path_buf())
            .with_credentials("a@b.c", "hunter2");
        let server = MonarchMcpServer::new(config);

        let result = server
            .check_auth_status()
            .await
            .expect("handler never raises");
        let text = result_text(&result);
        assert!(text.contains(&format!("found: {}", present.display())));
        assert!(text.contains("missing:"));
        assert!(text.contains("Environment email: a@b.c"));
        assert!(!text.contains("hunter2"));
    }

    #[tokio::test]
    async fn setup_instructions_are_static_text() {
        let mock = Arc::new(MockGateway::default());
        let server = server_with(&mock);

        let result = server
            .setup_authentication()
            .await
            .expect("handler never raises");
        let text = result_text(&result);
        assert!(text.contains("monarch-login"));
        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
    }
}
