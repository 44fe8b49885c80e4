//! Default calling order.
//!
//! # Invariants
//! - Output is a permutation of the (filtered) input ids.
//! - Never-engaged contacts come first, then oldest engagement first.
//! - Ties break on `created_at` ascending, then on delivered order.

use crate::model::contact::{Contact, ContactId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Which contacts the queue should contain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueFilter {
    #[default]
    All,
    /// Only contacts that were never engaged.
    Never,
}

/// Progress counters for a calling session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    /// Contacts engaged at least once.
    pub contacted: usize,
}

/// Orders contacts for calling, most stale first.
pub fn build_queue(contacts: &[Contact], filter: QueueFilter) -> Vec<ContactId> {
    let mut ordered = contacts
        .iter()
        .filter(|contact| match filter {
            QueueFilter::All => true,
            QueueFilter::Never => contact.is_never_engaged(),
        })
        .collect::<Vec<_>>();
    ordered.sort_by(|left, right| compare_staleness(left, right));
    ordered.into_iter().map(|contact| contact.id).collect()
}

/// Counts total and already-contacted contacts.
pub fn queue_stats(contacts: &[Contact]) -> QueueStats {
    QueueStats {
        total: contacts.len(),
        contacted: contacts
            .iter()
            .filter(|contact| !contact.is_never_engaged())
            .count(),
    }
}

fn compare_staleness(left: &Contact, right: &Contact) -> Ordering {
    // `None < Some(_)` for `Option`, which is exactly "never engaged first".
    left.last_engaged_at
        .cmp(&right.last_engaged_at)
        .then(left.created_at.cmp(&right.created_at))
}

#[cfg(test)]
mod tests {
    use super::{build_queue, queue_stats, QueueFilter};
    use crate::model::contact::Contact;
    use std::collections::HashSet;
    use uuid::Uuid;

    const JAN_1_2024_MS: i64 = 1_704_067_200_000;

    fn contact(created_at: i64, last_engaged_at: Option<i64>) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            full_name: format!("contact-{created_at}"),
            org: None,
            phone: "1".to_string(),
            email: None,
            tags: None,
            notes: None,
            created_at,
            last_engaged_at,
            last_engaged_by: last_engaged_at.map(|_| "rep".to_string()),
        }
    }

    #[test]
    fn never_engaged_first_then_created_order() {
        let x = contact(1, None);
        let y = contact(2, Some(JAN_1_2024_MS));
        let z = contact(3, None);
        let queue = build_queue(&[x.clone(), y.clone(), z.clone()], QueueFilter::All);
        assert_eq!(queue, vec![x.id, z.id, y.id]);
    }

    #[test]
    fn older_engagement_is_called_before_recent_one() {
        let recent = contact(1, Some(JAN_1_2024_MS + 1_000));
        let stale = contact(2, Some(JAN_1_2024_MS));
        let queue = build_queue(&[recent.clone(), stale.clone()], QueueFilter::All);
        assert_eq!(queue, vec![stale.id, recent.id]);
    }

    #[test]
    fn equal_engagement_ties_break_on_creation_regardless_of_input_order() {
        let early = contact(10, Some(JAN_1_2024_MS));
        let late = contact(20, Some(JAN_1_2024_MS));
        for _ in 0..3 {
            assert_eq!(
                build_queue(&[late.clone(), early.clone()], QueueFilter::All),
                vec![early.id, late.id]
            );
        }
    }

    #[test]
    fn never_filter_keeps_relative_order() {
        let a = contact(1, None);
        let b = contact(2, Some(JAN_1_2024_MS));
        let c = contact(3, None);
        let queue = build_queue(&[c.clone(), b, a.clone()], QueueFilter::Never);
        assert_eq!(queue, vec![a.id, c.id]);
    }

    #[test]
    fn output_is_a_permutation_of_input() {
        let contacts = (0..25)
            .map(|idx| {
                let engaged = (idx % 3 != 0).then_some(JAN_1_2024_MS + (idx * 7 % 5));
                contact(idx % 4, engaged)
            })
            .collect::<Vec<_>>();
        let queue = build_queue(&contacts, QueueFilter::All);
        assert_eq!(queue.len(), contacts.len());
        let unique = queue.iter().collect::<HashSet<_>>();
        assert_eq!(unique.len(), contacts.len());
        assert!(contacts.iter().all(|contact| unique.contains(&contact.id)));

        let first_engaged = queue
            .iter()
            .position(|id| {
                contacts
                    .iter()
                    .any(|contact| contact.id == *id && !contact.is_never_engaged())
            })
            .unwrap_or(queue.len());
        assert!(queue[first_engaged..].iter().all(|id| contacts
            .iter()
            .any(|contact| contact.id == *id && !contact.is_never_engaged())));
    }

    #[test]
    fn stats_count_contacted() {
        let contacts = vec![contact(1, None), contact(2, Some(JAN_1_2024_MS))];
        let stats = queue_stats(&contacts);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.contacted, 1);
    }
}
