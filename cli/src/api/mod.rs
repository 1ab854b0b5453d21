//! Remote budgeting API.

mod client;

pub use client::YnabClient;

use crate::error::Result;
use async_trait::async_trait;
use mirror_engine::{BudgetId, Collection, Cursor, Delta};
use serde::{Deserialize, Serialize};

/// A budget the token has access to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub id: BudgetId,
    pub name: String,
}

/// Operations the mirror and the commands need from the remote service.
#[async_trait]
pub trait BudgetApi: Send + Sync {
    /// Budgets visible to the token.
    async fn list_budgets(&self) -> Result<Vec<BudgetSummary>>;

    /// Entities of a collection changed since `cursor`, tombstones included.
    async fn fetch_delta(
        &self,
        budget_id: &str,
        collection: Collection,
        cursor: Cursor,
    ) -> Result<Delta>;

    /// Full listing of a collection.
    async fn list(
        &self,
        budget_id: &str,
        collection: Collection,
    ) -> Result<Vec<serde_json::Value>>;

    /// Transactions of one account.
    async fn list_account_transactions(
        &self,
        budget_id: &str,
        account_id: &str,
    ) -> Result<Vec<serde_json::Value>>;

    /// Bulk-update transactions. Returns the updated payloads as stored remotely.
    async fn update_transactions(
        &self,
        budget_id: &str,
        transactions: Vec<serde_json::Value>,
    ) -> Result<Vec<serde_json::Value>>;
}

/// Resolve a `--budget` argument, given as an id or a name, against the
/// budgets the token can see. Names match ignoring case.
pub fn resolve_budget<'a>(
    budgets: &'a [BudgetSummary],
    wanted: &str,
) -> Option<&'a BudgetSummary> {
    budgets
        .iter()
        .find(|b| b.id == wanted)
        .or_else(|| budgets.iter().find(|b| b.name.eq_ignore_ascii_case(wanted)))
}
