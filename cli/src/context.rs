//! Everything a command needs, assembled once per invocation.

use std::sync::Arc;

use tracing::info;

use crate::api::{resolve_budget, BudgetApi, BudgetSummary, YnabClient};
use crate::config::Config;
use crate::db::PgMirrorStore;
use crate::error::{Error, Result};
use crate::mirror::MirrorStore;
use crate::query::Query;
use crate::sync::{MirrorSync, WriteBack};

/// The remote client plus the optional local mirror.
#[derive(Clone)]
pub struct Context {
    api: Arc<dyn BudgetApi>,
    store: Option<Arc<dyn MirrorStore>>,
}

impl Context {
    pub fn new(api: Arc<dyn BudgetApi>, store: Option<Arc<dyn MirrorStore>>) -> Self {
        Self { api, store }
    }

    /// Build the context from configuration.
    ///
    /// The mirror is used when `DATABASE_URL` is set and `use_mirror` is true.
    pub async fn connect(config: &Config, token: &str, use_mirror: bool) -> Result<Self> {
        let api: Arc<dyn BudgetApi> = Arc::new(YnabClient::from_config(config, token)?);

        let store: Option<Arc<dyn MirrorStore>> = match &config.database_url {
            Some(url) if use_mirror => {
                let store = PgMirrorStore::connect(url, config.max_connections).await?;
                info!("Local mirror enabled");
                Some(Arc::new(store))
            }
            _ => None,
        };

        Ok(Self::new(api, store))
    }

    pub fn api(&self) -> &Arc<dyn BudgetApi> {
        &self.api
    }

    pub fn mirror_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Reconciliation driver, if a mirror is configured.
    pub fn sync(&self) -> Option<MirrorSync> {
        self.store
            .as_ref()
            .map(|store| MirrorSync::new(self.api.clone(), store.clone()))
    }

    pub fn query(&self) -> Query {
        Query::new(self.api.clone(), self.sync())
    }

    pub fn write_back(&self) -> WriteBack {
        WriteBack::new(self.api.clone(), self.store.clone())
    }

    /// Pick the budget a command works on.
    ///
    /// `wanted` may be an id or a name. Without it the token must see
    /// exactly one budget.
    pub async fn budget(&self, wanted: Option<&str>) -> Result<BudgetSummary> {
        let budgets = self.api.list_budgets().await?;

        match wanted {
            Some(wanted) => resolve_budget(&budgets, wanted)
                .cloned()
                .ok_or_else(|| Error::invalid_input(format!("no budget matches '{wanted}'"))),
            None => match budgets.as_slice() {
                [only] => Ok(only.clone()),
                [] => Err(Error::invalid_input("the token has no budgets")),
                _ => {
                    let names: Vec<_> = budgets.iter().map(|b| b.name.as_str()).collect();
                    Err(Error::invalid_input(format!(
                        "several budgets available ({}); pass --budget",
                        names.join(", ")
                    )))
                }
            },
        }
    }
}
