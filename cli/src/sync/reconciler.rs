//! Reconciliation passes against a live store.
//!
//! The engine decides what a pass must write; this module fetches the delta,
//! holds the partition lease and performs the writes in the order the plan
//! prescribes: deletions, staged upserts, then one cursor advance.

use std::sync::Arc;

use futures::future::try_join_all;
use mirror_engine::{
    Collection, MirrorRecord, Partition, ReconcilePlan, ReconcileSummary, Reconciler,
};
use tracing::{debug, info};

use crate::api::BudgetApi;
use crate::error::Result;
use crate::mirror::MirrorStore;

/// Drives reconciliation passes for any partition.
#[derive(Clone)]
pub struct MirrorSync {
    api: Arc<dyn BudgetApi>,
    store: Arc<dyn MirrorStore>,
}

impl MirrorSync {
    pub fn new(api: Arc<dyn BudgetApi>, store: Arc<dyn MirrorStore>) -> Self {
        Self { api, store }
    }

    /// Bring one partition up to date and return its live records.
    pub async fn reconcile(
        &self,
        budget_id: &str,
        collection: Collection,
    ) -> Result<Vec<MirrorRecord>> {
        let (records, _) = self.reconcile_with_summary(budget_id, collection).await?;
        Ok(records)
    }

    /// Like [`MirrorSync::reconcile`], also reporting what the pass did.
    pub async fn reconcile_with_summary(
        &self,
        budget_id: &str,
        collection: Collection,
    ) -> Result<(Vec<MirrorRecord>, ReconcileSummary)> {
        let partition = Partition::new(budget_id, collection);
        let _lease = self.store.lease(&partition).await?;

        let mut reconciler = Reconciler::new(partition.clone());
        reconciler.load_records(self.store.find(&partition).await?);
        let from_cursor = reconciler.cursor();

        let delta = self
            .api
            .fetch_delta(budget_id, collection, from_cursor)
            .await?;
        debug!(
            %partition,
            from_cursor,
            server_knowledge = delta.server_knowledge,
            changed = delta.entities.len(),
            "Planning reconciliation"
        );

        let plan = reconciler.reconcile(delta)?;
        self.apply(&partition, &plan).await?;

        let summary = plan.summary(&partition, from_cursor);
        info!(
            %partition,
            from = summary.from_cursor,
            to = summary.to_cursor,
            upserted = summary.upserted,
            deleted = summary.deleted,
            "Mirror reconciled"
        );
        Ok((plan.into_records(), summary))
    }

    /// Reconcile every collection of a budget concurrently.
    pub async fn reconcile_all(&self, budget_id: &str) -> Result<Vec<ReconcileSummary>> {
        let passes = Collection::ALL.into_iter().map(|collection| async move {
            let (_, summary) = self.reconcile_with_summary(budget_id, collection).await?;
            Ok::<_, crate::Error>(summary)
        });
        try_join_all(passes).await
    }

    async fn apply(&self, partition: &Partition, plan: &ReconcilePlan) -> Result<()> {
        match plan {
            ReconcilePlan::Current { .. } => {}
            ReconcilePlan::AdvanceCursor { cursor, .. } => {
                let moved = self.store.advance_cursor(partition, *cursor).await?;
                debug!(%partition, cursor, moved, "Advanced cursors");
            }
            ReconcilePlan::Merge(merge) => {
                for entity_id in &merge.deletes {
                    self.store.delete(partition, entity_id).await?;
                }
                for record in merge.staged() {
                    self.store.upsert(&record).await?;
                }
                self.store.advance_cursor(partition, merge.cursor).await?;
            }
        }
        Ok(())
    }
}
