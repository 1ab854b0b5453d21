//! PostgreSQL persistence for the mirror.

mod pool;
mod records;
mod store;

pub use pool::*;
pub use records::*;
pub use store::PgMirrorStore;
