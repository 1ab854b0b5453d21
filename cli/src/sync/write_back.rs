//! Pushing edits upstream and folding the result into the mirror.

use std::sync::Arc;

use mirror_engine::record::{entity_id_of, is_deleted};
use mirror_engine::{Collection, Partition};
use tracing::{info, warn};

use crate::api::BudgetApi;
use crate::error::{Error, Result};
use crate::mirror::MirrorStore;

/// Submits transaction updates and keeps the mirror coherent with the
/// remote's answer.
#[derive(Clone)]
pub struct WriteBack {
    api: Arc<dyn BudgetApi>,
    store: Option<Arc<dyn MirrorStore>>,
}

impl WriteBack {
    pub fn new(api: Arc<dyn BudgetApi>, store: Option<Arc<dyn MirrorStore>>) -> Self {
        Self { api, store }
    }

    /// Submit `edited` in one bulk update and return the remote's payloads.
    ///
    /// With a mirror, each returned payload replaces the stored one while the
    /// stored `change_cursor` is kept, so the next pass still fetches anything
    /// else that changed meanwhile. Payloads with no stored counterpart are
    /// reported as [`Error::Consistency`] after the rest are written.
    pub async fn apply_edits(
        &self,
        budget_id: &str,
        edited: Vec<serde_json::Value>,
    ) -> Result<Vec<serde_json::Value>> {
        let count = edited.len();
        let updated = self.api.update_transactions(budget_id, edited).await?;
        info!(
            budget = budget_id,
            submitted = count,
            updated = updated.len(),
            "Updated transactions"
        );

        let Some(store) = &self.store else {
            return Ok(updated);
        };

        let partition = Partition::new(budget_id, Collection::Transactions);
        let _lease = store.lease(&partition).await?;

        let mut missing = Vec::new();
        for payload in &updated {
            let entity_id = entity_id_of(payload)?;
            match store.find_one(&partition, entity_id).await? {
                Some(mut record) => {
                    if is_deleted(payload) {
                        store.delete(&partition, entity_id).await?;
                    } else {
                        record.refresh_payload(payload.clone());
                        store.upsert(&record).await?;
                    }
                }
                None => missing.push(entity_id.to_string()),
            }
        }

        if !missing.is_empty() {
            warn!(%partition, missing = ?missing, "Updated transactions are not mirrored");
            return Err(Error::Consistency {
                entity_ids: missing,
            });
        }

        Ok(updated)
    }
}
