//! Calling queue: default staleness ordering plus the priority overlay.
//!
//! Both halves are pure functions over already-loaded state so they can be
//! exercised without storage or network collaborators.

pub mod builder;
pub mod overlay;

pub use builder::{build_queue, queue_stats, QueueFilter, QueueStats};
pub use overlay::{apply_priority_overlay, parse_priority_ids};
