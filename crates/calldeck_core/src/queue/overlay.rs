//! Priority overlay: merges an untrusted external ranking onto the queue.
//!
//! # Invariants
//! - Output is a permutation of the input queue; it never grows or shrinks.
//! - Only position in the priority list and original queue order matter.

use crate::model::contact::ContactId;
use std::collections::HashSet;
use uuid::Uuid;

/// Reorders `queue` by `priority`.
///
/// Ids from `priority` that are in `queue` come first, in priority order and
/// once each (first occurrence wins). Remaining queue ids follow in their
/// original relative order. Unknown ids are ignored.
pub fn apply_priority_overlay(queue: &[ContactId], priority: &[ContactId]) -> Vec<ContactId> {
    let known = queue.iter().copied().collect::<HashSet<_>>();
    let mut placed = HashSet::with_capacity(queue.len());
    let mut merged = Vec::with_capacity(queue.len());

    for id in priority {
        if known.contains(id) && placed.insert(*id) {
            merged.push(*id);
        }
    }
    for id in queue {
        if placed.insert(*id) {
            merged.push(*id);
        }
    }
    merged
}

/// Parses externally supplied identifiers, skipping anything that is not a
/// UUID. Order and duplicates are kept for the overlay to resolve.
pub fn parse_priority_ids(raw: &[String]) -> Vec<ContactId> {
    raw.iter()
        .filter_map(|value| Uuid::parse_str(value.trim()).ok())
        .collect()
}
