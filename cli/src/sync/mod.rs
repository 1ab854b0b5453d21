//! Keeping the mirror in step with the remote.

mod reconciler;
mod write_back;

pub use reconciler::MirrorSync;
pub use write_back::WriteBack;
