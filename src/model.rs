//! Raw Monarch API response records.
//!
//! The GraphQL responses are loosely typed: any nested object (account
//! type, institution, category, merchant) may be absent or `null` for a
//! given record. Every such field is an explicit `Option` here so that a
//! missing mapping deserializes to `None` instead of failing the whole
//! response.

use serde::Deserialize;

/// A nested `{id, name}` reference (institution, category, merchant).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRef {
    /// Entity ID, when the API includes one.
    pub id: Option<String>,
    /// Display name.
    pub name: Option<String>,
}

/// A nested account-type reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTypeRef {
    /// Machine name (e.g. `depository`).
    pub name: Option<String>,
    /// Human-readable name (e.g. `Cash`).
    pub display: Option<String>,
}

/// A nested reference to the account a transaction belongs to.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRef {
    /// Account ID.
    pub id: Option<String>,
    /// Account display name.
    pub display_name: Option<String>,
}

/// One account as returned by the accounts query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account ID.
    pub id: String,
    /// Raw account name.
    pub name: Option<String>,
    /// Preferred display name.
    pub display_name: Option<String>,
    /// Account type, when classified.
    #[serde(rename = "type")]
    pub account_type: Option<AccountTypeRef>,
    /// Linked institution, `null` for manual accounts.
    pub institution: Option<NamedRef>,
    /// Current balance.
    pub current_balance: Option<f64>,
    /// Whether the account is active; absent means active.
    pub is_active: Option<bool>,
}

/// Payload of the accounts query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsPayload {
    /// All accounts.
    #[serde(default)]
    pub accounts: Vec<Account>,
}

/// One transaction as returned by the transactions query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction ID.
    pub id: String,
    /// Posting date, `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Signed amount: positive income, negative expense.
    pub amount: Option<f64>,
    /// Free-text description.
    pub description: Option<String>,
    /// Assigned category, `null` when uncategorized.
    pub category: Option<NamedRef>,
    /// Merchant, `null` when unresolved.
    pub merchant: Option<NamedRef>,
    /// Owning account.
    pub account: Option<AccountRef>,
    /// Whether the transaction is still pending.
    pub is_pending: Option<bool>,
}

/// The `allTransactions` page of the transactions query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBook {
    /// Total matching transactions, independent of paging.
    pub total_count: Option<i64>,
    /// The requested page of results.
    #[serde(default)]
    pub results: Vec<Transaction>,
}

/// Payload of the transactions query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsPayload {
    /// Paged transaction listing.
    pub all_transactions: TransactionBook,
}

/// One budget row as returned by the budgets query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    /// Budget ID.
    pub id: String,
    /// Budget name.
    pub name: Option<String>,
    /// Budgeted amount for the period.
    pub amount: Option<f64>,
    /// Amount spent so far.
    pub spent: Option<f64>,
    /// Amount remaining.
    pub remaining: Option<f64>,
    /// Budgeted category, `null` for overall budgets.
    pub category: Option<NamedRef>,
    /// Budget period (e.g. `monthly`).
    pub period: Option<String>,
}

/// Payload of the budgets query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetsPayload {
    /// All budgets.
    #[serde(default)]
    pub budgets: Vec<Budget>,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use super::{AccountsPayload, BudgetsPayload, TransactionsPayload};

    #[test]
    fn account_with_null_nested_objects_parses() {
        let json = r#"{
            "accounts": [
                {
                    "id": "acc-1",
                    "name": "Wallet",
                    "displayName": "Cash Wallet",
                    "type": null,
                    "institution": null,
                    "currentBalance": 120.5,
                    "isActive": true
                }
            ]
        }"#;
        let payload: AccountsPayload = serde_json::from_str(json).expect("parseable payload");
        let account = payload.accounts.first().expect("one account");
        assert!(account.account_type.is_none());
        assert!(account.institution.is_none());
        assert_eq!(account.current_balance, Some(120.5));
    }

    #[test]
    fn account_with_missing_optional_fields_parses() {
        let json = r#"{"accounts": [{"id": "acc-2"}]}"#;
        let payload: AccountsPayload = serde_json::from_str(json).expect("parseable payload");
        let account = payload.accounts.first().expect("one account");
        assert!(account.display_name.is_none());
        assert!(account.is_active.is_none());
    }

    #[test]
    fn transaction_page_parses_with_nested_refs() {
        let json = r#"{
            "allTransactions": {
                "totalCount": 2,
                "results": [
                    {
                        "id": "txn-1",
                        "date": "2024-03-02",
                        "amount": -42.17,
                        "description": "Coffee",
                        "category": {"id": "cat-1", "name": "Restaurants"},
                        "merchant": {"id": "m-1", "name": "Blue Bottle"},
                        "account": {"id": "acc-1", "displayName": "Checking"},
                        "isPending": false
                    },
                    {
                        "id": "txn-2",
                        "date": "2024-03-01",
                        "amount": 1500.0,
                        "description": "Payroll",
                        "category": null,
                        "merchant": null,
                        "account": null,
                        "isPending": true
                    }
                ]
            }
        }"#;
        let payload: TransactionsPayload = serde_json::from_str(json).expect("parseable payload");
        assert_eq!(payload.all_transactions.total_count, Some(2));
        assert_eq!(payload.all_transactions.results.len(), 2);
        let second = payload.all_transactions.results.last().expect("two rows");
        assert!(second.category.is_none());
        assert_eq!(second.is_pending, Some(true));
    }

    #[test]
    fn empty_results_default_to_empty_vec() {
        let json = r#"{"allTransactions": {"totalCount": 0}}"#;
        let payload: TransactionsPayload = serde_json::from_str(json).expect("parseable payload");
        assert!(payload.all_transactions.results.is_empty());
    }

    #[test]
    fn budgets_payload_parses() {
        let json = r#"{
            "budgets": [
                {
                    "id": "bud-1",
                    "name": "Groceries",
                    "amount": 600.0,
                    "spent": 412.35,
                    "remaining": 187.65,
                    "category": {"id": "cat-2", "name": "Groceries"},
                    "period": "monthly"
                }
            ]
        }"#;
        let payload: BudgetsPayload = serde_json::from_str(json).expect("parseable payload");
        let budget = payload.budgets.first().expect("one budget");
        assert_eq!(budget.name.as_deref(), Some("Groceries"));
        assert_eq!(budget.period.as_deref(), Some("monthly"));
    }
}
