//! Engagement ledger use-cases.
//!
//! # Responsibility
//! - Validate engagement writes before anything touches storage.
//! - Expose "record and refresh" as the only way to change a contact's
//!   engagement cache.
//!
//! # Invariants
//! - After every successful write, `latest_engagement` agrees with the
//!   contact's cached `last_engaged_at`/`last_engaged_by`.
//! - A rejected write leaves ledger and cache untouched.

use crate::model::contact::{ContactId, Engagement};
use crate::model::interaction::{
    Interaction, InteractionKind, InteractionValidationError, NewInteraction,
};
use crate::repo::contact_repo::RepoError;
use crate::repo::interaction_repo::InteractionRepository;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum LedgerServiceError {
    Validation(InteractionValidationError),
    ContactNotFound(ContactId),
    /// Cached engagement disagrees with the ledger.
    CacheDrift {
        contact_id: ContactId,
        cached: Option<Engagement>,
        ledger: Option<Engagement>,
    },
    Persistence(RepoError),
}

impl Display for LedgerServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ContactNotFound(id) => write!(f, "contact not found: {id}"),
            Self::CacheDrift { contact_id, .. } => write!(
                f,
                "engagement cache for contact {contact_id} disagrees with the ledger"
            ),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LedgerServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::ContactNotFound(_) | Self::CacheDrift { .. } => None,
        }
    }
}

impl From<RepoError> for LedgerServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::ContactNotFound(id),
            RepoError::InteractionValidation(err) => Self::Validation(err),
            other => Self::Persistence(other),
        }
    }
}

impl From<InteractionValidationError> for LedgerServiceError {
    fn from(value: InteractionValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Ledger facade bound to one acting identity.
pub struct LedgerService<R: InteractionRepository> {
    repo: R,
    actor: String,
}

impl<R: InteractionRepository> LedgerService<R> {
    pub fn new(repo: R, actor: impl Into<String>) -> Self {
        Self {
            repo,
            actor: actor.into().trim().to_string(),
        }
    }

    pub fn actor(&self) -> &str {
        self.actor.as_str()
    }

    /// Appends one interaction and refreshes the contact's engagement cache.
    ///
    /// # Errors
    /// - `Validation` for a blank note on a `note` interaction (nothing written).
    /// - `ContactNotFound` when the contact does not exist (nothing written).
    /// - `Persistence` when the transaction fails (nothing written).
    pub fn record_interaction(
        &mut self,
        contact_id: ContactId,
        kind: InteractionKind,
        note: Option<&str>,
    ) -> Result<Interaction, LedgerServiceError> {
        let request = NewInteraction::new(contact_id, kind, note, self.actor.as_str());
        if let Err(err) = request.validate() {
            warn!(
                "event=interaction_record module=service status=rejected kind={} reason={err}",
                request.kind
            );
            return Err(err.into());
        }

        match self.repo.record_interaction(&request) {
            Ok(interaction) => {
                info!(
                    "event=interaction_record module=service status=ok kind={} interaction_id={}",
                    interaction.kind, interaction.id
                );
                Ok(interaction)
            }
            Err(err) => {
                error!(
                    "event=interaction_record module=service status=error kind={} error={err}",
                    request.kind
                );
                Err(err.into())
            }
        }
    }

    pub fn record_note(
        &mut self,
        contact_id: ContactId,
        note: &str,
    ) -> Result<Interaction, LedgerServiceError> {
        self.record_interaction(contact_id, InteractionKind::Note, Some(note))
    }

    pub fn record_call(
        &mut self,
        contact_id: ContactId,
        note: Option<&str>,
    ) -> Result<Interaction, LedgerServiceError> {
        self.record_interaction(contact_id, InteractionKind::Call, note)
    }

    /// Latest engagement according to the ledger itself.
    pub fn latest_engagement(
        &self,
        contact_id: ContactId,
    ) -> Result<Option<Engagement>, LedgerServiceError> {
        Ok(self
            .repo
            .latest_interaction(contact_id)?
            .map(|interaction| Engagement {
                at: interaction.created_at,
                by: interaction.actor,
            }))
    }

    /// Interactions for one contact, newest first.
    pub fn list_interactions(
        &self,
        contact_id: ContactId,
        limit: Option<u32>,
    ) -> Result<Vec<Interaction>, LedgerServiceError> {
        Ok(self.repo.list_interactions(contact_id, limit)?)
    }

    /// Checks that the contact's cached engagement matches the ledger.
    ///
    /// # Errors
    /// - `CacheDrift` on disagreement.
    pub fn verify_engagement_cache(
        &self,
        contact_id: ContactId,
    ) -> Result<Option<Engagement>, LedgerServiceError> {
        let cached = self.repo.cached_engagement(contact_id)?;
        let ledger = self.latest_engagement(contact_id)?;
        if cached != ledger {
            warn!("event=engagement_verify module=service status=drift contact_id={contact_id}");
            return Err(LedgerServiceError::CacheDrift {
                contact_id,
                cached,
                ledger,
            });
        }
        Ok(ledger)
    }

    /// Rewrites the contact's cached engagement from the ledger.
    pub fn refresh_engagement_cache(
        &mut self,
        contact_id: ContactId,
    ) -> Result<Option<Engagement>, LedgerServiceError> {
        let engagement = self.repo.refresh_engagement(contact_id)?;
        info!("event=engagement_refresh module=service status=ok contact_id={contact_id}");
        Ok(engagement)
    }

    pub(crate) fn repo(&self) -> &R {
        &self.repo
    }
}
