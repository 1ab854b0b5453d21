//! In-memory partition state.
//!
//! A [`PartitionStore`] holds the mirrored records of one partition keyed by
//! entity id. It offers the same primitive writes the persistent stores do
//! (upsert, delete, advance cursors) so a [`ReconcilePlan`] can be applied to
//! it record by record.

use crate::{cursor::min_cursor, Cursor, EntityId, MirrorRecord, ReconcilePlan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Records of one partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionStore {
    records: BTreeMap<EntityId, MirrorRecord>,
}

impl PartitionStore {
    /// Create an empty partition.
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// Get a record by entity id.
    pub fn get(&self, entity_id: &str) -> Option<&MirrorRecord> {
        self.records.get(entity_id)
    }

    /// Insert or overwrite a record.
    pub fn upsert(&mut self, record: MirrorRecord) {
        self.records.insert(record.entity_id.clone(), record);
    }

    /// Remove a record. Returns whether it existed.
    pub fn delete(&mut self, entity_id: &str) -> bool {
        self.records.remove(entity_id).is_some()
    }

    /// Raise every cursor below `cursor` to `cursor`. Returns how many moved.
    pub fn advance_cursor(&mut self, cursor: Cursor) -> usize {
        let mut moved = 0;
        for record in self.records.values_mut() {
            if record.change_cursor < cursor {
                record.change_cursor = cursor;
                moved += 1;
            }
        }
        moved
    }

    /// All records, ordered by entity id.
    pub fn records(&self) -> impl Iterator<Item = &MirrorRecord> {
        self.records.values()
    }

    /// Partition-wide reconciled cursor.
    pub fn cursor(&self) -> Cursor {
        min_cursor(self.records.values())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Apply a plan in full.
    pub fn apply(&mut self, plan: &ReconcilePlan) {
        self.apply_partial(plan, usize::MAX);
    }

    /// Apply at most `limit` writes of a plan, in the order a live pass
    /// performs them: deletions, staged upserts, then the cursor advance.
    /// Anything short of the full count leaves the partition the way an
    /// interrupted pass would.
    pub fn apply_partial(&mut self, plan: &ReconcilePlan, limit: usize) {
        match plan {
            ReconcilePlan::Current { .. } => {}
            ReconcilePlan::AdvanceCursor { cursor, .. } => {
                if limit > 0 {
                    self.advance_cursor(*cursor);
                }
            }
            ReconcilePlan::Merge(merge) => {
                let mut budget = limit;
                for id in &merge.deletes {
                    if budget == 0 {
                        return;
                    }
                    self.delete(id);
                    budget -= 1;
                }
                for record in merge.staged() {
                    if budget == 0 {
                        return;
                    }
                    self.upsert(record);
                    budget -= 1;
                }
                if budget > 0 {
                    self.advance_cursor(merge.cursor);
                }
            }
        }
    }
}
