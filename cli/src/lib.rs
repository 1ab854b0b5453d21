//! budget-mirror: bulk edits and audits for a YNAB-compatible budget, with an
//! optional local mirror kept current through delta requests.
//!
//! The pure merge planning lives in `mirror_engine`; this crate performs the
//! IO around it: the remote client, the mirror stores, reconciliation passes,
//! write-back and the command-line surface.

pub mod api;
pub mod commands;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod mirror;
pub mod prompt;
pub mod query;
pub mod sync;

pub use api::{BudgetApi, BudgetSummary, YnabClient};
pub use config::Config;
pub use context::Context;
pub use error::{Error, Result, Severity};
pub use mirror::{MemoryMirrorStore, MirrorStore, PartitionLease, StoreError};
pub use query::Query;
pub use sync::{MirrorSync, WriteBack};
