//! Read access to budget collections.
//!
//! With a mirror every call reconciles the partition first and filters the
//! refreshed records locally. Without one the remote listing endpoints are
//! queried directly and the same filters applied to the response.

use std::sync::Arc;

use mirror_engine::record::is_deleted;
use mirror_engine::{account_scope, Collection, RecordFilter};

use crate::api::BudgetApi;
use crate::error::Result;
use crate::sync::MirrorSync;

/// Filtered listings of accounts, payees and transactions.
#[derive(Clone)]
pub struct Query {
    api: Arc<dyn BudgetApi>,
    sync: Option<MirrorSync>,
}

impl Query {
    pub fn new(api: Arc<dyn BudgetApi>, sync: Option<MirrorSync>) -> Self {
        Self { api, sync }
    }

    pub async fn list_accounts(
        &self,
        budget_id: &str,
        filter: &RecordFilter,
    ) -> Result<Vec<serde_json::Value>> {
        let accounts = self.load(budget_id, Collection::Accounts).await?;
        Ok(filter.apply(accounts))
    }

    pub async fn list_payees(
        &self,
        budget_id: &str,
        filter: &RecordFilter,
    ) -> Result<Vec<serde_json::Value>> {
        let payees = self.load(budget_id, Collection::Payees).await?;
        Ok(filter.apply(payees))
    }

    /// Transactions of a budget, optionally restricted to one account.
    pub async fn list_transactions(
        &self,
        budget_id: &str,
        scope: Option<&str>,
        filter: &RecordFilter,
    ) -> Result<Vec<serde_json::Value>> {
        let transactions = match (scope, &self.sync) {
            (Some(account_id), None) => {
                let listed = self
                    .api
                    .list_account_transactions(budget_id, account_id)
                    .await?;
                live(listed)
            }
            _ => self.load(budget_id, Collection::Transactions).await?,
        };

        let filter = match scope {
            Some(account_id) => account_scope(account_id).and(filter.clone()),
            None => filter.clone(),
        };
        Ok(filter.apply(transactions))
    }

    async fn load(
        &self,
        budget_id: &str,
        collection: Collection,
    ) -> Result<Vec<serde_json::Value>> {
        match &self.sync {
            Some(sync) => {
                let records = sync.reconcile(budget_id, collection).await?;
                Ok(records.into_iter().map(|r| r.payload).collect())
            }
            None => Ok(live(self.api.list(budget_id, collection).await?)),
        }
    }
}

/// Drop tombstones from a direct listing. The mirror never holds them.
fn live(payloads: Vec<serde_json::Value>) -> Vec<serde_json::Value> {
    payloads.into_iter().filter(|p| !is_deleted(p)).collect()
}
