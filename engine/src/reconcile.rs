//! Delta reconciliation between the local mirror and the remote API.
//!
//! This is the core of the cache. Given the records stored for one partition
//! and the delta the remote returned for the partition's cursor, this module
//! decides, without doing any IO, what the mirror must look like afterwards.
//!
//! # Algorithm
//!
//! 1. The request cursor is the minimum stored cursor (see [`crate::cursor`])
//! 2. Remote cursor unchanged: nothing to do
//! 3. No changed entities but a newer cursor: advance every stored cursor
//! 4. Otherwise merge: delta entities first, then stored records, collapsed
//!    by entity id keeping the higher cursor; tombstones are deleted, every
//!    survivor ends up at the new cursor
//!
//! Merges are applied one record at a time. Survivors are first written at a
//! staging cursor no higher than the request cursor, and a single final
//! cursor advance moves the whole partition forward. A run that dies halfway
//! therefore never raises the minimum, and the next request fetches the same
//! window again. Stamping each record with the new cursor as it is written
//! would let a partly written first sync look complete.

use crate::{cursor::min_cursor, error::Result, Cursor, EntityId, MirrorRecord, Partition};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Changes reported by the remote since a cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delta {
    /// Entities changed since the requested cursor, tombstones included
    pub entities: Vec<serde_json::Value>,
    /// Remote cursor as of this response
    pub server_knowledge: Cursor,
}

impl Delta {
    pub fn new(entities: Vec<serde_json::Value>, server_knowledge: Cursor) -> Self {
        Self {
            entities,
            server_knowledge,
        }
    }
}

/// Writes needed to bring a partition up to a new cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    /// Cursor every surviving record ends up at
    pub cursor: Cursor,
    /// Cursor survivors are written with before the final advance
    pub staging_cursor: Cursor,
    /// Live records in their final state, in candidate order
    pub upserts: Vec<MirrorRecord>,
    /// Entity ids to purge from the mirror
    pub deletes: Vec<EntityId>,
}

impl MergePlan {
    /// Survivors as they are written before the final cursor advance.
    pub fn staged(&self) -> impl Iterator<Item = MirrorRecord> + '_ {
        self.upserts.iter().map(|r| {
            let mut staged = r.clone();
            staged.change_cursor = self.staging_cursor;
            staged
        })
    }
}

/// What a reconciliation pass has to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcilePlan {
    /// The mirror is already current.
    Current { records: Vec<MirrorRecord> },
    /// No content changed, only the cursor moved. `records` already carry
    /// the new cursor.
    AdvanceCursor {
        cursor: Cursor,
        records: Vec<MirrorRecord>,
    },
    /// Content changed.
    Merge(MergePlan),
}

impl ReconcilePlan {
    /// The live record set once the plan is applied.
    pub fn records(&self) -> &[MirrorRecord] {
        match self {
            ReconcilePlan::Current { records } => records,
            ReconcilePlan::AdvanceCursor { records, .. } => records,
            ReconcilePlan::Merge(merge) => &merge.upserts,
        }
    }

    pub fn into_records(self) -> Vec<MirrorRecord> {
        match self {
            ReconcilePlan::Current { records } => records,
            ReconcilePlan::AdvanceCursor { records, .. } => records,
            ReconcilePlan::Merge(merge) => merge.upserts,
        }
    }

    /// Describe the plan as a pass from `from_cursor`.
    pub fn summary(&self, partition: &Partition, from_cursor: Cursor) -> ReconcileSummary {
        let (to_cursor, upserted, deleted) = match self {
            ReconcilePlan::Current { .. } => (from_cursor, 0, 0),
            ReconcilePlan::AdvanceCursor { cursor, .. } => (*cursor, 0, 0),
            ReconcilePlan::Merge(merge) => {
                (merge.cursor, merge.upserts.len(), merge.deletes.len())
            }
        };
        ReconcileSummary {
            partition: partition.clone(),
            from_cursor,
            to_cursor,
            upserted,
            deleted,
        }
    }
}

/// Counters describing a finished pass, for logs and callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub partition: Partition,
    /// Cursor the delta was requested from
    pub from_cursor: Cursor,
    /// Cursor the mirror ends at
    pub to_cursor: Cursor,
    pub upserted: usize,
    pub deleted: usize,
}

/// Builds a [`ReconcilePlan`] for one partition.
pub struct Reconciler {
    partition: Partition,
    stored: Vec<MirrorRecord>,
}

impl Reconciler {
    /// Create a reconciler for a partition with nothing loaded.
    pub fn new(partition: Partition) -> Self {
        Self {
            partition,
            stored: Vec::new(),
        }
    }

    /// Load the records currently stored for the partition.
    pub fn load_records(&mut self, records: impl IntoIterator<Item = MirrorRecord>) {
        self.stored.extend(records);
    }

    /// Cursor to request the next delta from.
    pub fn cursor(&self) -> Cursor {
        min_cursor(&self.stored)
    }

    /// Decide how to fold `delta` into the stored records.
    ///
    /// Fails only if a delta entity has no id, before anything is planned.
    pub fn reconcile(self, delta: Delta) -> Result<ReconcilePlan> {
        let cursor = self.cursor();
        let knowledge = delta.server_knowledge;

        if knowledge == cursor {
            return Ok(ReconcilePlan::Current {
                records: self.stored,
            });
        }

        if delta.entities.is_empty() && knowledge > cursor {
            let records = self
                .stored
                .into_iter()
                .map(|mut r| {
                    r.change_cursor = r.change_cursor.max(knowledge);
                    r
                })
                .collect();
            return Ok(ReconcilePlan::AdvanceCursor {
                cursor: knowledge,
                records,
            });
        }

        // Remote entities go first so they win ties against stored copies.
        let mut candidates = Vec::with_capacity(delta.entities.len() + self.stored.len());
        for payload in delta.entities {
            candidates.push(MirrorRecord::from_remote(&self.partition, payload, knowledge)?);
        }
        candidates.extend(self.stored);

        let mut upserts = Vec::new();
        let mut deletes = Vec::new();
        for mut record in collapse_duplicates(candidates) {
            if record.is_deleted() {
                deletes.push(record.entity_id);
            } else {
                record.change_cursor = knowledge;
                upserts.push(record);
            }
        }

        Ok(ReconcilePlan::Merge(MergePlan {
            cursor: knowledge,
            staging_cursor: cursor.min(knowledge),
            upserts,
            deletes,
        }))
    }
}

/// Keep one record per entity id: the one with the highest cursor, the
/// earliest candidate on ties. Output follows first-seen order.
pub fn collapse_duplicates(candidates: Vec<MirrorRecord>) -> Vec<MirrorRecord> {
    let mut order: Vec<EntityId> = Vec::new();
    let mut best: HashMap<EntityId, MirrorRecord> = HashMap::new();

    for candidate in candidates {
        match best.entry(candidate.entity_id.clone()) {
            Entry::Occupied(mut slot) => {
                if candidate.change_cursor > slot.get().change_cursor {
                    slot.insert(candidate);
                }
            }
            Entry::Vacant(slot) => {
                order.push(candidate.entity_id.clone());
                slot.insert(candidate);
            }
        }
    }

    order.into_iter().filter_map(|id| best.remove(&id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Collection, Error};
    use serde_json::json;

    fn partition() -> Partition {
        Partition::new("budget-1", Collection::Payees)
    }

    fn stored(id: &str, name: &str, cursor: Cursor) -> MirrorRecord {
        MirrorRecord::new(&partition(), id, json!({"id": id, "name": name}), cursor)
    }

    fn reconciler_with(records: Vec<MirrorRecord>) -> Reconciler {
        let mut reconciler = Reconciler::new(partition());
        reconciler.load_records(records);
        reconciler
    }

    #[test]
    fn unchanged_cursor_is_current() {
        let records = vec![stored("a", "Store", 10), stored("b", "Bank", 10)];
        let plan = reconciler_with(records.clone())
            .reconcile(Delta::new(vec![], 10))
            .unwrap();

        assert_eq!(plan, ReconcilePlan::Current { records });
    }

    #[test]
    fn empty_delta_with_newer_cursor_advances() {
        let records = vec![stored("a", "Store", 10), stored("b", "Bank", 8)];
        let plan = reconciler_with(records)
            .reconcile(Delta::new(vec![], 14))
            .unwrap();

        match plan {
            ReconcilePlan::AdvanceCursor { cursor, records } => {
                assert_eq!(cursor, 14);
                assert!(records.iter().all(|r| r.change_cursor == 14));
                assert_eq!(records[0].payload, json!({"id": "a", "name": "Store"}));
            }
            other => panic!("expected AdvanceCursor, got {other:?}"),
        }
    }

    #[test]
    fn request_cursor_is_minimum() {
        let reconciler = reconciler_with(vec![stored("a", "x", 9), stored("b", "y", 5)]);
        assert_eq!(reconciler.cursor(), 5);
    }

    #[test]
    fn merge_stamps_every_survivor() {
        let records = vec![stored("a", "Store", 10), stored("b", "Bank", 10)];
        let delta = Delta::new(vec![json!({"id": "a", "name": "Grocer"})], 12);

        let plan = reconciler_with(records).reconcile(delta).unwrap();
        let ReconcilePlan::Merge(merge) = plan else {
            panic!("expected merge");
        };

        assert_eq!(merge.cursor, 12);
        assert!(merge.deletes.is_empty());
        assert_eq!(merge.upserts.len(), 2);
        assert!(merge.upserts.iter().all(|r| r.change_cursor == 12));
        assert_eq!(merge.upserts[0].payload["name"], "Grocer");
        assert_eq!(merge.upserts[1].payload["name"], "Bank");
    }

    #[test]
    fn merge_stages_at_request_cursor() {
        let records = vec![stored("a", "Store", 10), stored("b", "Bank", 4)];
        let delta = Delta::new(vec![json!({"id": "c", "name": "New"})], 12);

        let ReconcilePlan::Merge(merge) = reconciler_with(records).reconcile(delta).unwrap()
        else {
            panic!("expected merge");
        };

        assert_eq!(merge.staging_cursor, 4);
        assert!(merge.staged().all(|r| r.change_cursor == 4));
        assert!(merge.upserts.iter().all(|r| r.change_cursor == 12));
    }

    #[test]
    fn merge_purges_tombstones() {
        let records = vec![stored("a", "Store", 10), stored("b", "Bank", 10)];
        let delta = Delta::new(
            vec![
                json!({"id": "b", "name": "Bank", "deleted": true}),
                json!({"id": "c", "name": "Gone", "deleted": true}),
            ],
            11,
        );

        let ReconcilePlan::Merge(merge) = reconciler_with(records).reconcile(delta).unwrap()
        else {
            panic!("expected merge");
        };

        assert_eq!(merge.deletes, vec!["b".to_string(), "c".to_string()]);
        let ids: Vec<_> = merge.upserts.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);

        let summary = ReconcilePlan::Merge(merge).summary(&partition(), 10);
        assert_eq!(summary.from_cursor, 10);
        assert_eq!(summary.to_cursor, 11);
        assert_eq!(summary.upserted, 1);
        assert_eq!(summary.deleted, 2);
    }

    #[test]
    fn first_sync_from_empty_mirror() {
        let delta = Delta::new(
            vec![
                json!({"id": "a", "name": "Store"}),
                json!({"id": "b", "name": "Old", "deleted": true}),
            ],
            3,
        );

        let reconciler = reconciler_with(vec![]);
        assert_eq!(reconciler.cursor(), 0);
        let plan = reconciler.reconcile(delta).unwrap();

        assert_eq!(plan.records().len(), 1);
        assert_eq!(plan.records()[0].entity_id, "a");
    }

    #[test]
    fn duplicate_keeps_higher_cursor() {
        let low = stored("a", "five", 5);
        let high = stored("a", "nine", 9);

        let survivors = collapse_duplicates(vec![low.clone(), high.clone()]);
        assert_eq!(survivors, vec![high.clone()]);

        let survivors = collapse_duplicates(vec![high.clone(), low]);
        assert_eq!(survivors, vec![high]);
    }

    #[test]
    fn duplicate_tie_keeps_first() {
        let first = stored("a", "remote", 7);
        let second = stored("a", "local", 7);

        let survivors = collapse_duplicates(vec![first.clone(), second]);
        assert_eq!(survivors, vec![first]);
    }

    #[test]
    fn entity_without_id_aborts() {
        let delta = Delta::new(vec![json!({"name": "no id"})], 4);
        let err = reconciler_with(vec![]).reconcile(delta).unwrap_err();
        assert_eq!(err, Error::MissingEntityId);
    }

    #[test]
    fn regressed_remote_lowers_cursors() {
        let records = vec![stored("a", "Store", 10)];
        let delta = Delta::new(vec![], 6);

        let ReconcilePlan::Merge(merge) = reconciler_with(records).reconcile(delta).unwrap()
        else {
            panic!("expected merge");
        };
        assert_eq!(merge.cursor, 6);
        assert_eq!(merge.staging_cursor, 6);
        assert_eq!(merge.upserts[0].change_cursor, 6);
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_entity() -> impl Strategy<Value = (u8, bool, u8)> {
            (0u8..8, any::<bool>(), any::<u8>())
        }

        fn to_payloads(entities: &[(u8, bool, u8)]) -> Vec<serde_json::Value> {
            entities
                .iter()
                .map(|(id, deleted, v)| {
                    json!({"id": format!("e{id}"), "deleted": deleted, "v": v})
                })
                .collect()
        }

        proptest! {
            #[test]
            fn prop_merge_has_unique_live_ids(
                stored_entities in prop::collection::vec(arb_entity(), 0..12),
                delta_entities in prop::collection::vec(arb_entity(), 1..12),
                stored_cursor in 0u64..50,
                bump in 1u64..50,
            ) {
                let records: Vec<_> = to_payloads(&stored_entities)
                    .into_iter()
                    .filter(|p| !crate::record::is_deleted(p))
                    .map(|p| MirrorRecord::from_remote(&partition(), p, stored_cursor).unwrap())
                    .collect();
                let records = collapse_duplicates(records);
                let knowledge = stored_cursor + bump;

                let plan = reconciler_with(records)
                    .reconcile(Delta::new(to_payloads(&delta_entities), knowledge))
                    .unwrap();
                let ReconcilePlan::Merge(merge) = plan else {
                    return Err(TestCaseError::fail("expected merge"));
                };

                let mut ids: Vec<_> = merge.upserts.iter().map(|r| r.entity_id.clone()).collect();
                let total = ids.len();
                ids.sort();
                ids.dedup();
                prop_assert_eq!(ids.len(), total);
                prop_assert!(merge.upserts.iter().all(|r| !r.is_deleted()));
                prop_assert!(merge.upserts.iter().all(|r| r.change_cursor == knowledge));
                for id in &merge.deletes {
                    prop_assert!(!merge.upserts.iter().any(|r| &r.entity_id == id));
                }
            }

            #[test]
            fn prop_delta_always_wins(
                stored_entities in prop::collection::vec(arb_entity(), 0..12),
                delta_entities in prop::collection::vec(arb_entity(), 1..12),
            ) {
                let records: Vec<_> = to_payloads(&stored_entities)
                    .into_iter()
                    .filter(|p| !crate::record::is_deleted(p))
                    .map(|p| MirrorRecord::from_remote(&partition(), p, 3).unwrap())
                    .collect();
                let delta_payloads = to_payloads(&delta_entities);

                let plan = reconciler_with(collapse_duplicates(records))
                    .reconcile(Delta::new(delta_payloads.clone(), 20))
                    .unwrap();

                // The first delta occurrence of each id decides its fate.
                for record in plan.records() {
                    let first = delta_payloads
                        .iter()
                        .find(|p| p["id"] == record.payload["id"]);
                    if let Some(first) = first {
                        prop_assert_eq!(first, &record.payload);
                    }
                }
            }
        }
    }
}
