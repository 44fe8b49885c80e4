//! Core domain logic for CallDeck.
//! This crate is the single source of truth for contact import, engagement
//! and calling-queue invariants.

pub mod config;
pub mod db;
pub mod dial;
pub mod import;
pub mod logging;
pub mod model;
pub mod queue;
pub mod repo;
pub mod service;
pub mod suggest;

pub use config::{AppConfig, ConfigError};
pub use import::normalizer::{
    normalize_csv, normalize_row, normalize_rows, parse_tags, read_csv, ImportError, ImportRow,
    NormalizedImport, RawRow,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::epoch_ms_to_rfc3339;
pub use model::contact::{Contact, ContactId, ContactValidationError, Engagement, NewContact};
pub use model::interaction::{
    Interaction, InteractionId, InteractionKind, InteractionValidationError, NewInteraction,
};
pub use queue::{
    apply_priority_overlay, build_queue, parse_priority_ids, queue_stats, QueueFilter, QueueStats,
};
pub use repo::contact_repo::{ContactRepository, RepoError, RepoResult, SqliteContactRepository};
pub use repo::interaction_repo::{InteractionRepository, SqliteInteractionRepository};
pub use service::calling_service::{
    CallingQueue, CallingService, CallingServiceError, PrioritizeOutcome, ScriptOutcome,
};
pub use service::import_service::{
    CsvImportReport, ImportReport, ImportService, ImportServiceError,
};
pub use service::ledger_service::{LedgerService, LedgerServiceError};
pub use suggest::{
    OpenRouterClient, PrioritizeRequest, PriorityCandidate, PriorityResponse, ScriptContact,
    ScriptRequest, ScriptSuggestion, SuggestError, SuggestionClient,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
