//! Calling session orchestration.
//!
//! # Responsibility
//! - Load the current queue from storage on every read.
//! - Merge advisory AI ranking and scripts without ever blocking the core
//!   calling workflow.
//! - Route engagement writes through the ledger.
//!
//! # Invariants
//! - Queue state is recomputed from storage after each mutation, never
//!   patched incrementally.
//! - Suggestion failures degrade to `Unchanged` / `Unavailable`.

use crate::model::contact::{Contact, ContactId};
use crate::model::epoch_ms_to_rfc3339;
use crate::model::interaction::{Interaction, InteractionKind};
use crate::queue::{apply_priority_overlay, build_queue, parse_priority_ids, queue_stats};
use crate::queue::{QueueFilter, QueueStats};
use crate::repo::contact_repo::{ContactRepository, RepoError};
use crate::repo::interaction_repo::InteractionRepository;
use crate::service::ledger_service::{LedgerService, LedgerServiceError};
use crate::suggest::{
    PrioritizeRequest, PriorityCandidate, ScriptContact, ScriptRequest, ScriptSuggestion,
    SuggestionClient,
};
use log::{info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Most recent notes sent with a script request.
const SCRIPT_NOTES_LIMIT: usize = 5;

#[derive(Debug)]
pub enum CallingServiceError {
    ContactNotFound(ContactId),
    Persistence(RepoError),
    Ledger(LedgerServiceError),
}

impl Display for CallingServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContactNotFound(id) => write!(f, "contact not found: {id}"),
            Self::Persistence(err) => write!(f, "failed to load contacts: {err}"),
            Self::Ledger(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CallingServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ContactNotFound(_) => None,
            Self::Persistence(err) => Some(err),
            Self::Ledger(err) => Some(err),
        }
    }
}

impl From<RepoError> for CallingServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::ContactNotFound(id),
            other => Self::Persistence(other),
        }
    }
}

impl From<LedgerServiceError> for CallingServiceError {
    fn from(value: LedgerServiceError) -> Self {
        Self::Ledger(value)
    }
}

/// Ordered contacts ready for calling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallingQueue {
    pub filter: QueueFilter,
    /// Contacts in calling order.
    pub contacts: Vec<Contact>,
    /// Counters over the whole contact set, independent of `filter`.
    pub stats: QueueStats,
}

impl CallingQueue {
    pub fn ids(&self) -> Vec<ContactId> {
        self.contacts.iter().map(|contact| contact.id).collect()
    }

    pub fn next(&self) -> Option<&Contact> {
        self.contacts.first()
    }
}

/// Result of asking for an AI ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrioritizeOutcome {
    Reordered(CallingQueue),
    /// The suggestion was unavailable or did not change anything.
    Unchanged(CallingQueue),
}

impl PrioritizeOutcome {
    pub fn queue(&self) -> &CallingQueue {
        match self {
            Self::Reordered(queue) | Self::Unchanged(queue) => queue,
        }
    }

    pub fn into_queue(self) -> CallingQueue {
        match self {
            Self::Reordered(queue) | Self::Unchanged(queue) => queue,
        }
    }
}

/// Result of asking for a call script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    Ready(ScriptSuggestion),
    Unavailable,
}

/// One user's calling session over storage and an optional suggestion client.
pub struct CallingService<C, I, S>
where
    C: ContactRepository,
    I: InteractionRepository,
    S: SuggestionClient,
{
    contacts: C,
    ledger: LedgerService<I>,
    suggestions: Option<S>,
}

impl<C, I, S> CallingService<C, I, S>
where
    C: ContactRepository,
    I: InteractionRepository,
    S: SuggestionClient,
{
    pub fn new(contacts: C, ledger: LedgerService<I>, suggestions: Option<S>) -> Self {
        Self {
            contacts,
            ledger,
            suggestions,
        }
    }

    /// Reads contacts and orders them most-stale first.
    pub fn load_queue(&self, filter: QueueFilter) -> Result<CallingQueue, CallingServiceError> {
        let contacts = self.contacts.list_contacts()?;
        let stats = queue_stats(&contacts);
        let order = build_queue(&contacts, filter);

        let mut by_id = contacts
            .into_iter()
            .map(|contact| (contact.id, contact))
            .collect::<HashMap<_, _>>();
        let ordered = order
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect::<Vec<_>>();

        info!(
            "event=queue_load module=service status=ok filter={filter:?} size={} total={} contacted={}",
            ordered.len(),
            stats.total,
            stats.contacted
        );
        Ok(CallingQueue {
            filter,
            contacts: ordered,
            stats,
        })
    }

    /// Asks the suggestion client for a ranking and overlays it on `queue`.
    ///
    /// Never fails: any problem leaves the queue as it was.
    pub fn prioritize(&self, queue: CallingQueue) -> PrioritizeOutcome {
        let Some(client) = self.suggestions.as_ref() else {
            warn!("event=queue_prioritize module=service status=skip reason=not_configured");
            return PrioritizeOutcome::Unchanged(queue);
        };
        if queue.contacts.is_empty() {
            return PrioritizeOutcome::Unchanged(queue);
        }

        let counts = match self.ledger.repo().interaction_counts() {
            Ok(counts) => counts,
            Err(err) => {
                warn!("event=queue_prioritize module=service status=skip reason=counts_unavailable error={err}");
                return PrioritizeOutcome::Unchanged(queue);
            }
        };

        let request = PrioritizeRequest {
            contacts: queue
                .contacts
                .iter()
                .map(|contact| priority_candidate(contact, &counts))
                .collect(),
        };
        let response = match client.request_priority(&request) {
            Ok(response) => response,
            Err(err) => {
                warn!("event=queue_prioritize module=service status=skip reason=suggestion_failed error={err}");
                return PrioritizeOutcome::Unchanged(queue);
            }
        };

        let current = queue.ids();
        let merged = apply_priority_overlay(&current, &parse_priority_ids(&response.ordered_ids));
        if merged == current {
            info!(
                "event=queue_prioritize module=service status=skip reason=no_change suggested={}",
                response.ordered_ids.len()
            );
            return PrioritizeOutcome::Unchanged(queue);
        }

        let CallingQueue {
            filter,
            contacts,
            stats,
        } = queue;
        let mut by_id = contacts
            .into_iter()
            .map(|contact| (contact.id, contact))
            .collect::<HashMap<_, _>>();
        let reordered = merged
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect::<Vec<_>>();

        info!(
            "event=queue_prioritize module=service status=ok size={} suggested={}",
            reordered.len(),
            response.ordered_ids.len()
        );
        PrioritizeOutcome::Reordered(CallingQueue {
            filter,
            contacts: reordered,
            stats,
        })
    }

    /// Drafts a call script and chat message for one contact.
    ///
    /// # Errors
    /// - `ContactNotFound` / `Persistence` when the contact cannot be loaded.
    ///   Suggestion failures are not errors; they yield `Unavailable`.
    pub fn draft_script(
        &self,
        contact_id: ContactId,
    ) -> Result<ScriptOutcome, CallingServiceError> {
        let contact = self
            .contacts
            .get_contact(contact_id)?
            .ok_or(CallingServiceError::ContactNotFound(contact_id))?;

        let Some(client) = self.suggestions.as_ref() else {
            warn!("event=script_draft module=service status=unavailable reason=not_configured");
            return Ok(ScriptOutcome::Unavailable);
        };

        let mut notes = match self.ledger.list_interactions(contact_id, None) {
            Ok(interactions) => interactions
                .into_iter()
                .filter_map(|interaction| interaction.note)
                .take(SCRIPT_NOTES_LIMIT)
                .collect::<Vec<_>>(),
            Err(err) => {
                warn!("event=script_draft module=service status=degraded reason=notes_unavailable error={err}");
                Vec::new()
            }
        };
        if let Some(imported) = contact.notes.clone() {
            notes.push(imported);
        }

        let request = ScriptRequest {
            contact: ScriptContact {
                full_name: contact.full_name,
                org: contact.org,
                phone: contact.phone,
                email: contact.email,
            },
            notes: if notes.is_empty() { None } else { Some(notes) },
        };

        match client.request_script(&request) {
            Ok(suggestion) => Ok(ScriptOutcome::Ready(suggestion)),
            Err(err) => {
                warn!("event=script_draft module=service status=unavailable error={err}");
                Ok(ScriptOutcome::Unavailable)
            }
        }
    }

    pub fn record_note(
        &mut self,
        contact_id: ContactId,
        note: &str,
    ) -> Result<Interaction, CallingServiceError> {
        Ok(self.ledger.record_note(contact_id, note)?)
    }

    pub fn record_call(
        &mut self,
        contact_id: ContactId,
        note: Option<&str>,
    ) -> Result<Interaction, CallingServiceError> {
        Ok(self.ledger.record_call(contact_id, note)?)
    }

    pub fn record_interaction(
        &mut self,
        contact_id: ContactId,
        kind: InteractionKind,
        note: Option<&str>,
    ) -> Result<Interaction, CallingServiceError> {
        Ok(self.ledger.record_interaction(contact_id, kind, note)?)
    }

    pub fn history(
        &self,
        contact_id: ContactId,
        limit: Option<u32>,
    ) -> Result<Vec<Interaction>, CallingServiceError> {
        if self.contacts.get_contact(contact_id)?.is_none() {
            return Err(CallingServiceError::ContactNotFound(contact_id));
        }
        Ok(self.ledger.list_interactions(contact_id, limit)?)
    }

    pub fn ledger(&self) -> &LedgerService<I> {
        &self.ledger
    }
}

fn priority_candidate(contact: &Contact, counts: &HashMap<ContactId, u32>) -> PriorityCandidate {
    PriorityCandidate {
        id: contact.id.to_string(),
        full_name: contact.full_name.clone(),
        last_engaged_at: contact.last_engaged_at.and_then(epoch_ms_to_rfc3339),
        interactions_count: Some(counts.get(&contact.id).copied().unwrap_or(0)),
        tags: contact.tags.clone(),
    }
}

