//! Shared fixtures: a scripted remote and a store that can be made to fail.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use budget_mirror::{
    BudgetApi, BudgetSummary, Context, Error, MemoryMirrorStore, MirrorStore, PartitionLease,
    Result, StoreError,
};
use mirror_engine::{Collection, Cursor, Delta, MirrorRecord, Partition};
use serde_json::{json, Value};

pub const BUDGET: &str = "budget-1";

#[derive(Default)]
struct RemoteState {
    knowledge: Cursor,
    collections: HashMap<Collection, BTreeMap<String, (Cursor, Value)>>,
    delta_requests: Vec<(Collection, Cursor)>,
    update_batches: Vec<Vec<Value>>,
}

/// In-memory stand-in for the budgeting service.
///
/// Every write bumps one budget-wide server knowledge, like the real API.
#[derive(Default)]
pub struct FakeBudget {
    state: Mutex<RemoteState>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delta_delay: Option<Duration>,
}

impl FakeBudget {
    pub fn new() -> Self {
        Self::default()
    }

    /// A remote whose delta responses take a while, to overlap passes.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delta_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn put(&self, collection: Collection, payload: Value) {
        let mut state = self.state.lock().unwrap();
        state.knowledge += 1;
        let knowledge = state.knowledge;
        let id = payload["id"].as_str().unwrap().to_string();
        state
            .collections
            .entry(collection)
            .or_default()
            .insert(id, (knowledge, payload));
    }

    pub fn delete(&self, collection: Collection, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.knowledge += 1;
        let knowledge = state.knowledge;
        if let Some((changed_at, payload)) = state
            .collections
            .entry(collection)
            .or_default()
            .get_mut(id)
        {
            *changed_at = knowledge;
            payload["deleted"] = json!(true);
        }
    }

    pub fn knowledge(&self) -> Cursor {
        self.state.lock().unwrap().knowledge
    }

    /// Live payloads of a collection, ordered by id.
    pub fn live(&self, collection: Collection) -> Vec<Value> {
        let state = self.state.lock().unwrap();
        state
            .collections
            .get(&collection)
            .map(|entities| {
                entities
                    .values()
                    .filter(|(_, p)| p["deleted"] != json!(true))
                    .map(|(_, p)| p.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn delta_requests(&self) -> Vec<(Collection, Cursor)> {
        self.state.lock().unwrap().delta_requests.clone()
    }

    pub fn update_batches(&self) -> Vec<Vec<Value>> {
        self.state.lock().unwrap().update_batches.clone()
    }

    pub fn max_concurrent_deltas(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BudgetApi for FakeBudget {
    async fn list_budgets(&self) -> Result<Vec<BudgetSummary>> {
        Ok(vec![BudgetSummary {
            id: BUDGET.to_string(),
            name: "Household".to_string(),
        }])
    }

    async fn fetch_delta(
        &self,
        budget_id: &str,
        collection: Collection,
        cursor: Cursor,
    ) -> Result<Delta> {
        if budget_id != BUDGET {
            return Err(Error::remote(404, "resource_not_found: Budget not found"));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delta_delay {
            tokio::time::sleep(delay).await;
        }

        let delta = {
            let mut state = self.state.lock().unwrap();
            state.delta_requests.push((collection, cursor));
            let entities = state
                .collections
                .get(&collection)
                .map(|entities| {
                    entities
                        .values()
                        .filter(|(changed_at, _)| *changed_at > cursor)
                        .map(|(_, p)| p.clone())
                        .collect()
                })
                .unwrap_or_default();
            Delta::new(entities, state.knowledge)
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(delta)
    }

    async fn list(&self, _budget_id: &str, collection: Collection) -> Result<Vec<Value>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .collections
            .get(&collection)
            .map(|entities| entities.values().map(|(_, p)| p.clone()).collect())
            .unwrap_or_default())
    }

    async fn list_account_transactions(
        &self,
        budget_id: &str,
        account_id: &str,
    ) -> Result<Vec<Value>> {
        let transactions = self.list(budget_id, Collection::Transactions).await?;
        Ok(transactions
            .into_iter()
            .filter(|t| t["account_id"] == json!(account_id))
            .collect())
    }

    async fn update_transactions(
        &self,
        _budget_id: &str,
        transactions: Vec<Value>,
    ) -> Result<Vec<Value>> {
        let mut state = self.state.lock().unwrap();
        state.update_batches.push(transactions.clone());

        let mut updated = Vec::new();
        for patch in transactions {
            let id = patch["id"].as_str().unwrap_or_default().to_string();
            state.knowledge += 1;
            let knowledge = state.knowledge;
            let stored = state
                .collections
                .entry(Collection::Transactions)
                .or_default()
                .get_mut(&id)
                .ok_or_else(|| Error::remote(400, format!("bad_request: unknown {id}")))?;

            if let (Some(target), Some(fields)) = (stored.1.as_object_mut(), patch.as_object()) {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
            }
            stored.0 = knowledge;
            updated.push(stored.1.clone());
        }
        Ok(updated)
    }
}

/// Memory store that refuses writes once its budget is spent.
pub struct FlakyStore {
    inner: MemoryMirrorStore,
    writes_left: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryMirrorStore::new(),
            writes_left: AtomicUsize::new(usize::MAX),
        }
    }

    pub fn fail_after(&self, writes: usize) {
        self.writes_left.store(writes, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.writes_left.store(usize::MAX, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryMirrorStore {
        &self.inner
    }

    fn spend(&self) -> std::result::Result<(), StoreError> {
        self.writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .map(|_| ())
            .map_err(|_| StoreError::Unavailable("disk full".into()))
    }
}

#[async_trait]
impl MirrorStore for FlakyStore {
    async fn lease(
        &self,
        partition: &Partition,
    ) -> std::result::Result<PartitionLease, StoreError> {
        self.inner.lease(partition).await
    }

    async fn find(
        &self,
        partition: &Partition,
    ) -> std::result::Result<Vec<MirrorRecord>, StoreError> {
        self.inner.find(partition).await
    }

    async fn find_one(
        &self,
        partition: &Partition,
        entity_id: &str,
    ) -> std::result::Result<Option<MirrorRecord>, StoreError> {
        self.inner.find_one(partition, entity_id).await
    }

    async fn upsert(&self, record: &MirrorRecord) -> std::result::Result<(), StoreError> {
        self.spend()?;
        self.inner.upsert(record).await
    }

    async fn delete(
        &self,
        partition: &Partition,
        entity_id: &str,
    ) -> std::result::Result<bool, StoreError> {
        self.spend()?;
        self.inner.delete(partition, entity_id).await
    }

    async fn advance_cursor(
        &self,
        partition: &Partition,
        cursor: Cursor,
    ) -> std::result::Result<u64, StoreError> {
        self.spend()?;
        self.inner.advance_cursor(partition, cursor).await
    }
}

/// Context over a fake remote and a fresh memory mirror.
pub fn mirrored_context(remote: &Arc<FakeBudget>) -> (Context, Arc<MemoryMirrorStore>) {
    let store = MemoryMirrorStore::new_shared();
    let ctx = Context::new(remote.clone(), Some(store.clone()));
    (ctx, store)
}

/// Context that always queries the fake remote directly.
pub fn direct_context(remote: &Arc<FakeBudget>) -> Context {
    Context::new(remote.clone(), None)
}

pub fn partition(collection: Collection) -> Partition {
    Partition::new(BUDGET, collection)
}

/// Payees and transactions from the audit walkthrough.
pub fn seed_audit(remote: &FakeBudget) {
    remote.put(Collection::Accounts, json!({"id": "acc-1", "name": "Checking", "deleted": false}));
    remote.put(Collection::Accounts, json!({"id": "acc-2", "name": "Savings", "deleted": false}));
    for (id, name, transfer) in [
        ("p1", "Grocer", Value::Null),
        ("p2", "Old Gym", Value::Null),
        ("p3", "Manual Balance Adjustment", Value::Null),
        ("p4", "Transfer : Savings", json!("acc-2")),
    ] {
        remote.put(
            Collection::Payees,
            json!({"id": id, "name": name, "transfer_account_id": transfer, "deleted": false}),
        );
    }
    remote.put(
        Collection::Transactions,
        json!({"id": "t1", "account_id": "acc-1", "payee_id": "p1", "date": "2024-03-01",
               "memo": "lunch", "amount": -1200, "deleted": false}),
    );
}
