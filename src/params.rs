//! Parameter structs for MCP tool inputs.
//!
//! Each struct derives [`serde::Deserialize`] and [`schemars::JsonSchema`]
//! so that `rmcp` can auto-generate JSON schemas for tool parameters.
//! Optional filters default to `None`, meaning "do not filter".

use schemars::JsonSchema;
use serde::Deserialize;

/// Default page size for `get_transactions`.
const DEFAULT_TRANSACTION_LIMIT: u32 = 100;

/// Returns the default transaction page size.
const fn default_limit() -> u32 {
    DEFAULT_TRANSACTION_LIMIT
}

/// Parameters for the `get_transactions` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetTransactionsParams {
    /// Number of transactions to return (default 100).
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Number of transactions to skip (default 0).
    #[serde(default)]
    pub offset: u32,
    /// Start date (inclusive), format `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// End date (inclusive), format `YYYY-MM-DD`.
    pub end_date: Option<String>,
    /// Restrict results to one account ID.
    pub account_id: Option<String>,
}

impl Default for GetTransactionsParams {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
            start_date: None,
            end_date: None,
            account_id: None,
        }
    }
}

/// Parameters for the `get_cashflow` tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct GetCashflowParams {
    /// Start date (inclusive), format `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// End date (inclusive), format `YYYY-MM-DD`.
    pub end_date: Option<String>,
}

/// Parameters for the `get_account_holdings` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetAccountHoldingsParams {
    /// ID of the investment account.
    pub account_id: String,
}

/// Parameters for the `create_transaction` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateTransactionParams {
    /// Account ID the transaction belongs to.
    pub account_id: String,
    /// Amount: positive for income, negative for expenses.
    pub amount: f64,
    /// Transaction description.
    pub description: String,
    /// Transaction date, format `YYYY-MM-DD`.
    pub date: String,
    /// Category ID to assign.
    pub category_id: Option<String>,
    /// Merchant name to record.
    pub merchant_name: Option<String>,
}

/// Parameters for the `update_transaction` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateTransactionParams {
    /// ID of the transaction to update.
    pub transaction_id: String,
    /// New amount.
    pub amount: Option<f64>,
    /// New description.
    pub description: Option<String>,
    /// New category ID.
    pub category_id: Option<String>,
    /// New date, format `YYYY-MM-DD`.
    pub date: Option<String>,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use super::{
        CreateTransactionParams, GetAccountHoldingsParams, GetCashflowParams,
        GetTransactionsParams, UpdateTransactionParams,
    };

    #[test]
    fn transactions_defaults() {
        let json = r"{}";
        let params: GetTransactionsParams =
            serde_json::from_str(json).expect("should deserialize empty object");
        assert_eq!(params.limit, 100);
        assert_eq!(params.offset, 0);
        assert!(params.start_date.is_none());
        assert!(params.end_date.is_none());
        assert!(params.account_id.is_none());
    }

    #[test]
    fn transactions_full() {
        let json = r#"{
            "limit": 50,
            "offset": 10,
            "start_date": "2024-01-01",
            "end_date": "2024-12-31",
            "account_id": "acc-001"
        }"#;
        let params: GetTransactionsParams =
            serde_json::from_str(json).expect("should deserialize full params");
        assert_eq!(params.limit, 50);
        assert_eq!(params.offset, 10);
        assert_eq!(params.start_date.as_deref(), Some("2024-01-01"));
        assert_eq!(params.end_date.as_deref(), Some("2024-12-31"));
        assert_eq!(params.account_id.as_deref(), Some("acc-001"));
    }

    #[test]
    fn cashflow_empty() {
        let json = r"{}";
        let params: GetCashflowParams =
            serde_json::from_str(json).expect("should deserialize empty");
        assert!(params.start_date.is_none());
        assert!(params.end_date.is_none());
    }

    #[test]
    fn cashflow_with_range() {
        let json = r#"{"start_date": "2024-01-01", "end_date": "2024-03-31"}"#;
        let params: GetCashflowParams =
            serde_json::from_str(json).expect("should deserialize range");
        assert_eq!(params.start_date.as_deref(), Some("2024-01-01"));
        assert_eq!(params.end_date.as_deref(), Some("2024-03-31"));
    }

    #[test]
    fn holdings_requires_account_id() {
        let json = r#"{"account_id": "acc-inv-1"}"#;
        let params: GetAccountHoldingsParams =
            serde_json::from_str(json).expect("should deserialize account_id");
        assert_eq!(params.account_id, "acc-inv-1");

        let missing: Result<GetAccountHoldingsParams, _> = serde_json::from_str(r"{}");
        assert!(missing.is_err());
    }

    #[test]
    fn create_transaction_params() {
        let json = r#"{
            "account_id": "acc-001",
            "amount": -42.5,
            "description": "Coffee",
            "date": "2024-06-15",
            "merchant_name": "Blue Bottle"
        }"#;
        let params: CreateTransactionParams =
            serde_json::from_str(json).expect("should deserialize");
        assert_eq!(params.account_id, "acc-001");
        assert!((params.amount + 42.5).abs() < f64::EPSILON);
        assert_eq!(params.description, "Coffee");
        assert_eq!(params.date, "2024-06-15");
        assert!(params.category_id.is_none());
        assert_eq!(params.merchant_name.as_deref(), Some("Blue Bottle"));
    }

    #[test]
    fn update_transaction_minimal() {
        let json = r#"{"transaction_id": "txn-001"}"#;
        let params: UpdateTransactionParams =
            serde_json::from_str(json).expect("should deserialize minimal");
        assert_eq!(params.transaction_id, "txn-001");
        assert!(params.amount.is_none());
        assert!(params.description.is_none());
        assert!(params.category_id.is_none());
        assert!(params.date.is_none());
    }

    #[test]
    fn update_transaction_partial() {
        let json = r#"{"transaction_id": "txn-001", "amount": 80.0, "date": "2024-07-01"}"#;
        let params: UpdateTransactionParams =
            serde_json::from_str(json).expect("should deserialize partial");
        assert!((params.amount.unwrap_or_default() - 80.0).abs() < f64::EPSILON);
        assert_eq!(params.date.as_deref(), Some("2024-07-01"));
    }
}
