//! Change-cursor bookkeeping.
//!
//! The remote API exposes a monotonically increasing "server knowledge"
//! counter. Each mirrored record remembers the counter value as of which its
//! payload was last confirmed. The partition-wide cursor is never stored on
//! its own: it is the minimum over the partition's records.
//!
//! Taking the minimum rather than the maximum is what makes an interrupted
//! merge safe. If only some records were advanced before a failure, the next
//! delta request restarts from the oldest confirmed point and re-fetches the
//! overlap instead of skipping it.

use crate::{Cursor, MirrorRecord};

/// The cursor a partition is known to be fully reconciled up to.
///
/// Returns 0 when the partition holds no records, which asks the remote for
/// a full listing.
pub fn min_cursor<'a, I>(records: I) -> Cursor
where
    I: IntoIterator<Item = &'a MirrorRecord>,
{
    records
        .into_iter()
        .map(|r| r.change_cursor)
        .min()
        .unwrap_or(0)
}
