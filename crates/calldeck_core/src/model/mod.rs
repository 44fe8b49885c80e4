//! Domain model for contacts and their engagement ledger.
//!
//! # Responsibility
//! - Define canonical records shared by import, queue and ledger logic.
//! - Own field-level validation rules for write requests.
//!
//! # Invariants
//! - Every contact and interaction is identified by a stable UUID.
//! - A contact's engagement fields mirror its latest interaction.

pub mod contact;
pub mod interaction;

use chrono::{DateTime, SecondsFormat, Utc};

/// Renders an epoch-milliseconds timestamp as UTC RFC 3339.
///
/// Returns `None` for values outside chrono's representable range.
pub fn epoch_ms_to_rfc3339(epoch_ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|value| value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::epoch_ms_to_rfc3339;

    #[test]
    fn engagement_timestamps_render_as_utc_rfc3339() {
        assert_eq!(
            epoch_ms_to_rfc3339(1_704_067_200_000).as_deref(),
            Some("2024-01-01T00:00:00.000Z")
        );
    }
}
