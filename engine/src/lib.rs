//! # Mirror Engine
//!
//! Deterministic delta-merge logic for a local mirror of a budgeting API.
//!
//! The remote API hands out a monotonically increasing change cursor
//! ("server knowledge") and answers "what changed since cursor N" with the
//! changed entities plus its current cursor. This crate decides how such a
//! delta folds into the locally stored records. It never touches the network
//! or a database: the caller loads records, fetches the delta, and applies the
//! resulting [`ReconcilePlan`] to whatever store it uses.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine knows nothing about HTTP or storage
//! - **Deterministic**: the same records and delta always give the same plan
//! - **Convergent**: plans may be applied partially; re-running converges
//!
//! ## Core Concepts
//!
//! ### Records and partitions
//!
//! A [`MirrorRecord`] is one remote entity (account, payee or transaction)
//! of one budget, stored with the cursor its payload was confirmed at. Records
//! are grouped into [`Partition`]s, one per (budget, [`Collection`]).
//!
//! ### Cursor
//!
//! A partition's cursor is the minimum of its records' cursors, see
//! [`cursor::min_cursor`].
//!
//! ### Reconciliation
//!
//! [`Reconciler`] turns stored records and a [`Delta`] into a
//! [`ReconcilePlan`]: already current, advance cursors only, or merge.
//!
//! ## Quick Start
//!
//! ```rust
//! use mirror_engine::{
//!     Collection, Delta, MirrorRecord, Partition, PartitionStore, Reconciler,
//! };
//! use serde_json::json;
//!
//! let partition = Partition::new("budget-1", Collection::Payees);
//! let mut store = PartitionStore::new();
//! store.upsert(MirrorRecord::new(&partition, "p-1", json!({"id": "p-1", "name": "Store"}), 4));
//!
//! let mut reconciler = Reconciler::new(partition);
//! reconciler.load_records(store.records().cloned());
//! assert_eq!(reconciler.cursor(), 4);
//!
//! let delta = Delta::new(vec![json!({"id": "p-1", "deleted": true})], 5);
//! let plan = reconciler.reconcile(delta).unwrap();
//! store.apply(&plan);
//!
//! assert!(store.is_empty());
//! ```

pub mod audit;
pub mod cursor;
pub mod edit;
pub mod error;
pub mod filter;
pub mod reconcile;
pub mod record;
pub mod store;

// Re-export main types at crate root
pub use audit::{payee_choices, unused_payees, PayeeRef, RESERVED_PAYEE_NAME};
pub use cursor::min_cursor;
pub use edit::{EditMode, MemoEdit};
pub use error::Error;
pub use filter::{account_scope, parse_date, Condition, Match, RecordFilter, TransactionSearch};
pub use reconcile::{Delta, MergePlan, ReconcilePlan, ReconcileSummary, Reconciler};
pub use record::{Collection, MirrorRecord, Partition, EPOCH_DATE};
pub use store::PartitionStore;

/// Type aliases for clarity
pub type BudgetId = String;
pub type EntityId = String;
pub type Cursor = u64;
