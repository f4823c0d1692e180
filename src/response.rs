//! Flattened response structs for MCP tool outputs.
//!
//! Each record kind has one pure mapping from the raw API model to the
//! fixed field set the tools expose. A nested object that is `null`
//! upstream stays `null` in the output, never an error and never an
//! empty string.

use serde::Serialize;

use crate::model::{Account, Budget, Transaction};

/// Flattened account for display.
#[derive(Debug, Clone, Serialize)]
pub struct AccountOverview {
    /// Account ID.
    id: String,
    /// Display name, falling back to the raw name.
    name: Option<String>,
    /// Account type name, `null` when unclassified.
    #[serde(rename = "type")]
    account_type: Option<String>,
    /// Current balance.
    balance: Option<f64>,
    /// Institution name, `null` for manual accounts.
    institution: Option<String>,
    /// Whether the account is active; absent upstream means active.
    is_active: bool,
}

impl AccountOverview {
    /// Flattens one raw account record.
    #[must_use]
    pub fn from_account(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            name: account
                .display_name
                .clone()
                .or_else(|| account.name.clone()),
            account_type: account
                .account_type
                .as_ref()
                .and_then(|kind| kind.name.clone()),
            balance: account.current_balance,
            institution: account
                .institution
                .as_ref()
                .and_then(|institution| institution.name.clone()),
            is_active: account.is_active.unwrap_or(true),
        }
    }
}

/// Flattened transaction for display.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionOverview {
    /// Transaction ID.
    id: String,
    /// Posting date, `YYYY-MM-DD`.
    date: Option<String>,
    /// Signed amount: positive income, negative expense.
    amount: Option<f64>,
    /// Free-text description.
    description: Option<String>,
    /// Category name, `null` when uncategorized.
    category: Option<String>,
    /// Owning account display name.
    account: Option<String>,
    /// Merchant name, `null` when unresolved.
    merchant: Option<String>,
    /// Whether the transaction is still pending.
    is_pending: bool,
}

impl TransactionOverview {
    /// Flattens one raw transaction record.
    #[must_use]
    pub fn from_transaction(transaction: &Transaction) -> Self {
        Self {
            id: transaction.id.clone(),
            date: transaction.date.clone(),
            amount: transaction.amount,
            description: transaction.description.clone(),
            category: transaction
                .category
                .as_ref()
                .and_then(|category| category.name.clone()),
            account: transaction
                .account
                .as_ref()
                .and_then(|account| account.display_name.clone()),
            merchant: transaction
                .merchant
                .as_ref()
                .and_then(|merchant| merchant.name.clone()),
            is_pending: transaction.is_pending.unwrap_or(false),
        }
    }
}

/// Flattened budget for display.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetOverview {
    /// Budget ID.
    id: String,
    /// Budget name.
    name: Option<String>,
    /// Budgeted amount for the period.
    amount: Option<f64>,
    /// Amount spent so far.
    spent: Option<f64>,
    /// Amount remaining.
    remaining: Option<f64>,
    /// Budgeted category name, `null` for overall budgets.
    category: Option<String>,
    /// Budget period (e.g. `monthly`).
    period: Option<String>,
}

impl BudgetOverview {
    /// Flattens one raw budget record.
    #[must_use]
    pub fn from_budget(budget: &Budget) -> Self {
        Self {
            id: budget.id.clone(),
            name: budget.name.clone(),
            amount: budget.amount,
            spent: budget.spent,
            remaining: budget.remaining,
            category: budget
                .category
                .as_ref()
                .and_then(|category| category.name.clone()),
            period: budget.period.clone(),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use serde_json::Value;

    use super::{AccountOverview, BudgetOverview, TransactionOverview};
    use crate::model::{Account, AccountRef, AccountTypeRef, Budget, NamedRef, Transaction};

    fn sample_account() -> Account {
        Account {
            id: "acc-1".to_owned(),
            name: Some("Checking".to_owned()),
            display_name: Some("Everyday Checking".to_owned()),
            account_type: Some(AccountTypeRef {
                name: Some("depository".to_owned()),
                display: Some("Cash".to_owned()),
            }),
            institution: Some(NamedRef {
                id: Some("inst-1".to_owned()),
                name: Some("First National".to_owned()),
            }),
            current_balance: Some(2_450.12),
            is_active: Some(true),
        }
    }

    #[test]
    fn account_flattens_nested_names() {
        let overview = AccountOverview::from_account(&sample_account());
        assert_eq!(overview.name.as_deref(), Some("Everyday Checking"));
        assert_eq!(overview.account_type.as_deref(), Some("depository"));
        assert_eq!(overview.institution.as_deref(), Some("First National"));
        assert!(overview.is_active);
    }

    #[test]
    fn null_institution_stays_null_in_output() {
        let mut account = sample_account();
        account.institution = None;
        let overview = AccountOverview::from_account(&account);

        let value = serde_json::to_value(&overview).expect("serializable overview");
        let object = value.as_object().expect("overview serializes to an object");
        assert_eq!(object.get("institution"), Some(&Value::Null));
    }

    #[test]
    fn account_name_falls_back_to_raw_name() {
        let mut account = sample_account();
        account.display_name = None;
        let overview = AccountOverview::from_account(&account);
        assert_eq!(overview.name.as_deref(), Some("Checking"));
    }

    #[test]
    fn missing_is_active_means_active() {
        let mut account = sample_account();
        account.is_active = None;
        let overview = AccountOverview::from_account(&account);
        assert!(overview.is_active);
    }

    #[test]
    fn transaction_flattens_nested_names() {
        let transaction = Transaction {
            id: "txn-1".to_owned(),
            date: Some("2024-03-02".to_owned()),
            amount: Some(-42.17),
            description: Some("Coffee".to_owned()),
            category: Some(NamedRef {
                id: Some("cat-1".to_owned()),
                name: Some("Restaurants".to_owned()),
            }),
            merchant: None,
            account: Some(AccountRef {
                id: Some("acc-1".to_owned()),
                display_name: Some("Everyday Checking".to_owned()),
            }),
            is_pending: None,
        };
        let overview = TransactionOverview::from_transaction(&transaction);
        assert_eq!(overview.category.as_deref(), Some("Restaurants"));
        assert_eq!(overview.account.as_deref(), Some("Everyday Checking"));
        assert!(overview.merchant.is_none());
        assert!(!overview.is_pending);
    }

    #[test]
    fn budget_flattens_category_name() {
        let budget = Budget {
            id: "bud-1".to_owned(),
            name: Some("Groceries".to_owned()),
            amount: Some(600.0),
            spent: Some(412.35),
            remaining: Some(187.65),
            category: Some(NamedRef {
                id: Some("cat-2".to_owned()),
                name: Some("Groceries".to_owned()),
            }),
            period: Some("monthly".to_owned()),
        };
        let overview = BudgetOverview::from_budget(&budget);
        assert_eq!(overview.category.as_deref(), Some("Groceries"));
        assert_eq!(overview.period.as_deref(), Some("monthly"));

        let value = serde_json::to_value(&overview).expect("serializable overview");
        let object = value.as_object().expect("overview serializes to an object");
        assert_eq!(object.len(), 7);
    }
}
