//! Debug assertion macros for the stream's cursor invariants.
//!
//! These are only active in debug builds (`#[cfg(debug_assertions)]`), so
//! there is zero overhead in release builds.  Each macro names the property
//! it checks; a failure message reports the offending cursor values.

/// Assert that the write region is ordered: `write_end >= write_start`.
///
/// Holds at every observation point; the two are equal when no write is in
/// progress.
macro_rules! debug_assert_write_region_ordered {
    ($start:expr, $end:expr) => {
        debug_assert!(
            $end >= $start,
            "write region inverted: write_end {} is behind write_start {}",
            $end,
            $start
        )
    };
}

/// Assert that a reader cursor only moves forward on the read path.
///
/// Backward movement is legal only through `seek`, which holds the
/// backward-seek lock; `read` must never regress its cursor.
macro_rules! debug_assert_cursor_advance {
    ($old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "reader cursor moved backward during read: {} -> {}",
            $old,
            $new
        )
    };
}

/// Assert that the oldest-unconsumed barrier never passes a cursor it just
/// scanned.
///
/// Used after the barrier recomputation: every enabled reader the scan saw
/// must still be at or ahead of the stored barrier.
macro_rules! debug_assert_barrier_behind {
    ($oldest:expr, $cursor:expr) => {
        debug_assert!(
            $oldest <= $cursor,
            "oldest-unconsumed barrier {} passed an enabled reader cursor {}",
            $oldest,
            $cursor
        )
    };
}

/// Assert that a reader slot id is within the configured bounds.
macro_rules! debug_assert_reader_id {
    ($id:expr, $max:expr) => {
        debug_assert!(
            $id < $max,
            "reader slot {} out of range (max readers {})",
            $id,
            $max
        )
    };
}

pub(crate) use debug_assert_barrier_behind;
pub(crate) use debug_assert_cursor_advance;
pub(crate) use debug_assert_reader_id;
pub(crate) use debug_assert_write_region_ordered;
