//! Event handlers bound to Gerrit event types.
//!
//! | Handler | Event type |
//! |---------|------------|
//! | [`ChangeMergedHandler`] | `change-merged` |
//! | [`RefUpdatedHandler`] | `ref-updated` |

mod change_merged;
mod ref_updated;

#[cfg(test)]
pub(crate) mod fake_tracker;

pub use change_merged::ChangeMergedHandler;
pub use ref_updated::RefUpdatedHandler;

/// Event type handled by [`ChangeMergedHandler`].
pub const CHANGE_MERGED: &str = "change-merged";

/// Event type handled by [`RefUpdatedHandler`].
pub const REF_UPDATED: &str = "ref-updated";
