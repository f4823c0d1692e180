//! Monarch Money API client.
//!
//! The API is GraphQL over HTTPS with a token obtained from a REST login
//! endpoint. Every operation the server exposes maps to exactly one
//! request here. [`MonarchGateway`] is the seam between the MCP tool
//! layer and this client so that handler tests can substitute a mock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{MonarchError, MonarchResult};
use crate::model::{Account, AccountsPayload, Budget, BudgetsPayload, Transaction, TransactionsPayload};
use crate::session::Session;

/// Header naming the client platform; the API expects `web`.
const CLIENT_PLATFORM_HEADER: &str = "Client-Platform";
/// Value of [`CLIENT_PLATFORM_HEADER`].
const CLIENT_PLATFORM: &str = "web";
/// Header carrying the device UUID the token was issued against.
const DEVICE_UUID_HEADER: &str = "device-uuid";

/// Accounts listing query.
const ACCOUNTS_QUERY: &str = "\
query GetAccounts {
  accounts {
    id
    name
    displayName
    type { name display }
    institution { id name }
    currentBalance
    isActive
  }
}";

/// Paged transaction listing query with optional filters.
const TRANSACTIONS_QUERY: &str = "\
query GetTransactionsList($offset: Int, $limit: Int, $filters: TransactionFilterInput) {
  allTransactions(filters: $filters) {
    totalCount
    results(offset: $offset, limit: $limit) {
      id
      date
      amount
      description
      isPending
      category { id name }
      merchant { id name }
      account { id displayName }
    }
  }
}";

/// Budgets listing query.
const BUDGETS_QUERY: &str = "\
query GetBudgets {
  budgets {
    id
    name
    amount
    spent
    remaining
    period
    category { id name }
  }
}";

/// Cashflow aggregates query.
const CASHFLOW_QUERY: &str = "\
query GetCashflow($filters: TransactionFilterInput) {
  summary: aggregates(filters: $filters) {
    summary { sumIncome sumExpense savings savingsRate }
  }
  byCategory: aggregates(filters: $filters, groupBy: [\"category\"]) {
    groupBy { category { id name } }
    summary { sum }
  }
}";

/// Investment holdings query for one account.
const HOLDINGS_QUERY: &str = "\
query GetAccountHoldings($accountId: ID!) {
  portfolio(input: { accountIds: [$accountId] }) {
    aggregateHoldings {
      edges {
        node {
          id
          quantity
          basis
          totalValue
          holdings { id name ticker quantity value }
          security { id name ticker currentPrice }
        }
      }
    }
  }
}";

/// Transaction creation mutation.
const CREATE_TRANSACTION_MUTATION: &str = "\
mutation CreateTransaction($input: CreateTransactionMutationInput!) {
  createTransaction(input: $input) {
    transaction { id }
    errors { message }
  }
}";

/// Transaction update mutation.
const UPDATE_TRANSACTION_MUTATION: &str = "\
mutation UpdateTransaction($input: UpdateTransactionMutationInput!) {
  updateTransaction(input: $input) {
    transaction { id amount date }
    errors { message }
  }
}";

/// Institution refresh mutation.
const REFRESH_ACCOUNTS_MUTATION: &str = "\
mutation ForceRefreshAccounts($input: ForceRefreshAccountsInput!) {
  forceRefreshAccounts(input: $input) {
    success
    errors { message }
  }
}";

/// Optional transaction filters, forwarded only when supplied.
///
/// Serialization skips absent fields entirely: an omitted filter never
/// reaches the wire as an empty string or zero.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilters {
    /// Earliest posting date, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Latest posting date, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Restrict to one account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

/// Optional cashflow date-range filters.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashflowFilters {
    /// Earliest posting date, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Latest posting date, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Input for the create-transaction mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionInput {
    /// Target account ID.
    pub account_id: String,
    /// Signed amount: positive income, negative expense.
    pub amount: f64,
    /// Transaction description.
    pub description: String,
    /// Posting date, `YYYY-MM-DD`.
    pub date: String,
    /// Category to assign, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    /// Merchant name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
}

/// Input for the update-transaction mutation; absent fields are untouched.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransactionInput {
    /// Transaction to update.
    pub id: String,
    /// New amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    /// New posting date, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// REST login request body.
#[derive(Debug, Serialize)]
struct LoginRequest<'req> {
    /// Account email.
    username: &'req str,
    /// Account password.
    password: &'req str,
    /// Whether to mark this device as trusted.
    trusted_device: bool,
    /// Advertise MFA support so the API signals the challenge cleanly.
    supports_mfa: bool,
    /// One-time code, present only in the second exchange.
    #[serde(skip_serializing_if = "Option::is_none")]
    totp: Option<&'req str>,
}

/// REST login success body.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    /// Issued API token.
    token: String,
}

/// REST login failure body.
#[derive(Debug, Deserialize)]
struct LoginFailure {
    /// Machine-readable error code.
    error_code: Option<String>,
    /// Human-readable detail.
    detail: Option<String>,
}

/// Returns whether a login failure body is the second-factor challenge.
fn is_mfa_challenge(failure: &LoginFailure) -> bool {
    failure.error_code.as_deref() == Some("MFA_REQUIRED")
        || failure
            .detail
            .as_deref()
            .is_some_and(|detail| detail.contains("Multi-Factor Auth Required"))
}

/// GraphQL request envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlRequest<'req> {
    /// Operation name, matching the document.
    operation_name: &'req str,
    /// Query document.
    query: &'req str,
    /// Operation variables.
    variables: Value,
}

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    /// Operation data, absent on failure.
    data: Option<Value>,
    /// Reported errors, absent on success.
    errors: Option<Vec<GraphQlError>>,
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Deserialize)]
struct GraphQlError {
    /// Error message.
    message: String,
}

/// Async boundary between tool handlers and the remote API.
///
/// Implemented by [`MonarchClient`] for production and by a mock in the
/// server tests.
#[async_trait]
pub trait MonarchGateway: Send + Sync {
    /// Lists all accounts.
    async fn accounts(&self) -> MonarchResult<Vec<Account>>;

    /// Lists a page of transactions matching the filters.
    async fn transactions(
        &self,
        limit: u32,
        offset: u32,
        filters: TransactionFilters,
    ) -> MonarchResult<Vec<Transaction>>;

    /// Lists all budgets.
    async fn budgets(&self) -> MonarchResult<Vec<Budget>>;

    /// Returns the raw cashflow aggregates.
    async fn cashflow(&self, filters: CashflowFilters) -> MonarchResult<Value>;

    /// Returns the raw holdings of one investment account.
    async fn account_holdings(&self, account_id: &str) -> MonarchResult<Value>;

    /// Creates a transaction; returns the raw mutation payload.
    async fn create_transaction(&self, input: CreateTransactionInput) -> MonarchResult<Value>;

    /// Updates a transaction; returns the raw mutation payload.
    async fn update_transaction(&self, input: UpdateTransactionInput) -> MonarchResult<Value>;

    /// Asks the institutions to refresh account data.
    async fn request_accounts_refresh(&self) -> MonarchResult<Value>;
}

/// Authenticated Monarch Money client.
pub struct MonarchClient {
    /// Shared HTTP connection pool.
    http: reqwest::Client,
    /// API base URL, without a trailing slash.
    base_url: String,
    /// Bearer token.
    token: String,
    /// Device UUID the token was issued against.
    device_uuid: String,
}

impl core::fmt::Debug for MonarchClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // The token is a credential; keep it out of debug output.
        f.debug_struct("MonarchClient")
            .field("base_url", &self.base_url)
            .field("device_uuid", &self.device_uuid)
            .finish_non_exhaustive()
    }
}

impl MonarchClient {
    /// Resumes an authenticated client from a saved session.
    #[must_use]
    pub fn from_session(config: &ServerConfig, session: Session) -> Self {
        let device_uuid = session
            .device_uuid
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url().trim_end_matches('/').to_owned(),
            token: session.token,
            device_uuid,
        }
    }

    /// Performs the primary email/password login.
    ///
    /// # Errors
    ///
    /// Returns [`MonarchError::MfaRequired`] when the API demands a
    /// one-time code; complete the login with [`Self::login_with_mfa`] in
    /// that case. Any other failure is terminal for this attempt.
    pub async fn login(
        config: &ServerConfig,
        email: &str,
        password: &str,
    ) -> MonarchResult<Self> {
        let request = LoginRequest {
            username: email,
            password,
            trusted_device: false,
            supports_mfa: true,
            totp: None,
        };
        let session = Self::authenticate(config, &request).await?;
        Ok(Self::from_session(config, session))
    }

    /// Performs the second, distinct exchange carrying the one-time code.
    ///
    /// # Errors
    ///
    /// Returns the API failure when the code is rejected.
    pub async fn login_with_mfa(
        config: &ServerConfig,
        email: &str,
        password: &str,
        totp: &str,
    ) -> MonarchResult<Self> {
        let request = LoginRequest {
            username: email,
            password,
            trusted_device: false,
            supports_mfa: true,
            totp: Some(totp),
        };
        let session = Self::authenticate(config, &request).await?;
        Ok(Self::from_session(config, session))
    }

    /// Runs one login exchange on a fresh HTTP client and device UUID.
    ///
    /// Each call starts from scratch: a client whose login raised the
    /// second-factor challenge is never reused for the MFA exchange.
    async fn authenticate(
        config: &ServerConfig,
        request: &LoginRequest<'_>,
    ) -> MonarchResult<Session> {
        let device_uuid = Uuid::new_v4().to_string();
        let http = reqwest::Client::new();
        let base_url = config.base_url().trim_end_matches('/');
        let response = http
            .post(format!("{base_url}/auth/login"))
            .header(CLIENT_PLATFORM_HEADER, CLIENT_PLATFORM)
            .header(DEVICE_UUID_HEADER, &device_uuid)
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            let body: LoginResponse = response.json().await?;
            return Ok(Session {
                token: body.token,
                device_uuid: Some(device_uuid),
            });
        }
        let message = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::FORBIDDEN {
            if let Ok(failure) = serde_json::from_str::<LoginFailure>(&message) {
                if is_mfa_challenge(&failure) {
                    return Err(MonarchError::MfaRequired);
                }
            }
        }
        Err(MonarchError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// The session this client authenticates with, for persisting.
    #[must_use]
    pub fn session(&self) -> Session {
        Session {
            token: self.token.clone(),
            device_uuid: Some(self.device_uuid.clone()),
        }
    }

    /// Executes one GraphQL operation and returns its `data` value.
    async fn graphql(
        &self,
        operation_name: &str,
        query: &str,
        variables: Value,
    ) -> MonarchResult<Value> {
        let request = GraphQlRequest {
            operation_name,
            query,
            variables,
        };
        let response = self
            .http
            .post(format!("{}/graphql", self.base_url))
            .header("Authorization", format!("Token {}", self.token))
            .header(CLIENT_PLATFORM_HEADER, CLIENT_PLATFORM)
            .header(DEVICE_UUID_HEADER, &self.device_uuid)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MonarchError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let envelope: GraphQlResponse = response.json().await?;
        unwrap_envelope(envelope)
    }
}

/// Extracts `data` from a response envelope, surfacing reported errors.
fn unwrap_envelope(envelope: GraphQlResponse) -> MonarchResult<Value> {
    if let Some(errors) = envelope.errors {
        if let Some(first) = errors.first() {
            return Err(MonarchError::GraphQl(first.message.clone()));
        }
    }
    envelope
        .data
        .ok_or_else(|| MonarchError::GraphQl("response contained no data".to_owned()))
}

#[async_trait]
impl MonarchGateway for MonarchClient {
    async fn accounts(&self) -> MonarchResult<Vec<Account>> {
        let data = self
            .graphql("GetAccounts", ACCOUNTS_QUERY, serde_json::json!({}))
            .await?;
        let payload: AccountsPayload = serde_json::from_value(data)?;
        Ok(payload.accounts)
    }

    async fn transactions(
        &self,
        limit: u32,
        offset: u32,
        filters: TransactionFilters,
    ) -> MonarchResult<Vec<Transaction>> {
        let variables = serde_json::json!({
            "limit": limit,
            "offset": offset,
            "filters": serde_json::to_value(&filters)?,
        });
        let data = self
            .graphql("GetTransactionsList", TRANSACTIONS_QUERY, variables)
            .await?;
        let payload: TransactionsPayload = serde_json::from_value(data)?;
        Ok(payload.all_transactions.results)
    }

    async fn budgets(&self) -> MonarchResult<Vec<Budget>> {
        let data = self
            .graphql("GetBudgets", BUDGETS_QUERY, serde_json::json!({}))
            .await?;
        let payload: BudgetsPayload = serde_json::from_value(data)?;
        Ok(payload.budgets)
    }

    async fn cashflow(&self, filters: CashflowFilters) -> MonarchResult<Value> {
        let variables = serde_json::json!({
            "filters": serde_json::to_value(&filters)?,
        });
        self.graphql("GetCashflow", CASHFLOW_QUERY, variables).await
    }

    async fn account_holdings(&self, account_id: &str) -> MonarchResult<Value> {
        let variables = serde_json::json!({ "accountId": account_id });
        self.graphql("GetAccountHoldings", HOLDINGS_QUERY, variables)
            .await
    }

    async fn create_transaction(&self, input: CreateTransactionInput) -> MonarchResult<Value> {
        let variables = serde_json::json!({ "input": serde_json::to_value(&input)? });
        self.graphql("CreateTransaction", CREATE_TRANSACTION_MUTATION, variables)
            .await
    }

    async fn update_transaction(&self, input: UpdateTransactionInput) -> MonarchResult<Value> {
        let variables = serde_json::json!({ "input": serde_json::to_value(&input)? });
        self.graphql("UpdateTransaction", UPDATE_TRANSACTION_MUTATION, variables)
            .await
    }

    async fn request_accounts_refresh(&self) -> MonarchResult<Value> {
        let variables = serde_json::json!({ "input": {} });
        self.graphql(
            "ForceRefreshAccounts",
            REFRESH_ACCOUNTS_MUTATION,
            variables,
        )
        .await
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use serde_json::Value;

    use super::{
        CreateTransactionInput, GraphQlResponse, LoginFailure, MonarchClient, TransactionFilters,
        UpdateTransactionInput, is_mfa_challenge, unwrap_envelope,
    };
    use crate::config::ServerConfig;
    use crate::error::MonarchError;
    use crate::session::Session;

    #[test]
    fn omitted_filters_are_absent_from_the_wire() {
        let filters = TransactionFilters {
            start_date: Some("2024-01-01".to_owned()),
            end_date: None,
            account_id: None,
        };
        let value = serde_json::to_value(&filters).expect("serializable filters");
        let object = value.as_object().expect("filters serialize to an object");
        assert_eq!(object.len(), 1);
        assert_eq!(
            object.get("startDate").and_then(Value::as_str),
            Some("2024-01-01")
        );
        assert!(!object.contains_key("endDate"));
        assert!(!object.contains_key("accountId"));
    }

    #[test]
    fn empty_filters_serialize_to_empty_object() {
        let value = serde_json::to_value(TransactionFilters::default())
            .expect("serializable filters");
        assert_eq!(value, serde_json::json!({}));
    }

    #[test]
    fn create_input_uses_camel_case_and_skips_absent_fields() {
        let input = CreateTransactionInput {
            account_id: "acc-1".to_owned(),
            amount: -12.5,
            description: "Coffee".to_owned(),
            date: "2024-06-15".to_owned(),
            category_id: None,
            merchant_name: Some("Blue Bottle".to_owned()),
        };
        let value = serde_json::to_value(&input).expect("serializable input");
        let object = value.as_object().expect("input serializes to an object");
        assert_eq!(object.get("accountId").and_then(Value::as_str), Some("acc-1"));
        assert_eq!(
            object.get("merchantName").and_then(Value::as_str),
            Some("Blue Bottle")
        );
        assert!(!object.contains_key("categoryId"));
    }

    #[test]
    fn update_input_carries_only_provided_fields() {
        let input = UpdateTransactionInput {
            id: "txn-1".to_owned(),
            amount: Some(80.0),
            description: None,
            category_id: None,
            date: None,
        };
        let value = serde_json::to_value(&input).expect("serializable input");
        let object = value.as_object().expect("input serializes to an object");
        assert_eq!(object.len(), 2);
        assert!(object.contains_key("id"));
        assert!(object.contains_key("amount"));
    }

    #[test]
    fn mfa_challenge_detected_by_code_or_detail() {
        let by_code: LoginFailure =
            serde_json::from_str(r#"{"error_code": "MFA_REQUIRED"}"#).expect("parseable body");
        assert!(is_mfa_challenge(&by_code));

        let by_detail: LoginFailure =
            serde_json::from_str(r#"{"detail": "Multi-Factor Auth Required"}"#)
                .expect("parseable body");
        assert!(is_mfa_challenge(&by_detail));

        let other: LoginFailure =
            serde_json::from_str(r#"{"detail": "Invalid credentials"}"#).expect("parseable body");
        assert!(!is_mfa_challenge(&other));
    }

    #[test]
    fn envelope_errors_win_over_data() {
        let envelope: GraphQlResponse = serde_json::from_str(
            r#"{"data": {"accounts": []}, "errors": [{"message": "token expired"}]}"#,
        )
        .expect("parseable envelope");
        let err = unwrap_envelope(envelope).expect_err("errors surface");
        assert!(matches!(err, MonarchError::GraphQl(message) if message == "token expired"));
    }

    #[test]
    fn envelope_without_data_is_an_error() {
        let envelope: GraphQlResponse =
            serde_json::from_str("{}").expect("parseable envelope");
        assert!(unwrap_envelope(envelope).is_err());
    }

    #[test]
    fn envelope_data_passes_through() {
        let envelope: GraphQlResponse =
            serde_json::from_str(r#"{"data": {"ok": true}}"#).expect("parseable envelope");
        let data = unwrap_envelope(envelope).expect("data present");
        assert_eq!(data, serde_json::json!({"ok": true}));
    }

    #[test]
    fn session_round_trips_through_the_client() {
        let config = ServerConfig::new().with_base_url("http://127.0.0.1:9/");
        let session = Session {
            token: "tok-1".to_owned(),
            device_uuid: Some("dev-1".to_owned()),
        };
        let client = MonarchClient::from_session(&config, session.clone());
        assert_eq!(client.session(), session);
    }

    #[test]
    fn missing_device_uuid_gets_a_fresh_one() {
        let config = ServerConfig::new();
        let client = MonarchClient::from_session(
            &config,
            Session {
                token: "tok-2".to_owned(),
                device_uuid: None,
            },
        );
        assert!(client.session().device_uuid.is_some());
    }
}
