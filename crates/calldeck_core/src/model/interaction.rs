//! Interaction (engagement ledger entry) domain model.
//!
//! # Invariants
//! - Interactions are immutable once created.
//! - `kind = note` requires a non-empty trimmed note.

use crate::model::contact::ContactId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type InteractionId = Uuid;

/// Engagement category. Open-ended: unknown labels round-trip as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum InteractionKind {
    Note,
    Call,
    Other(String),
}

impl InteractionKind {
    /// Parses a stored or user-provided label (trimmed, lowercased).
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "note" => Self::Note,
            "call" => Self::Call,
            _ => Self::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Note => "note",
            Self::Call => "call",
            Self::Other(label) => label.as_str(),
        }
    }
}

impl Display for InteractionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<InteractionKind> for String {
    fn from(value: InteractionKind) -> Self {
        value.as_str().to_string()
    }
}

impl From<String> for InteractionKind {
    fn from(value: String) -> Self {
        Self::from_label(value.as_str())
    }
}

/// One recorded engagement with a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub contact_id: ContactId,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub note: Option<String>,
    pub actor: String,
    /// Unix epoch milliseconds, assigned by the store.
    pub created_at: i64,
}

/// Write request for the engagement ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInteraction {
    pub contact_id: ContactId,
    pub kind: InteractionKind,
    pub note: Option<String>,
    pub actor: String,
}

impl NewInteraction {
    /// Builds a request with the note trimmed; blank notes collapse to `None`.
    ///
    /// `kind` is canonicalized through its label, so `Other("note")` becomes
    /// `Note` and is held to the same rules.
    pub fn new(
        contact_id: ContactId,
        kind: InteractionKind,
        note: Option<&str>,
        actor: impl Into<String>,
    ) -> Self {
        let note = note
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Self {
            contact_id,
            kind: InteractionKind::from_label(kind.as_str()),
            note,
            actor: actor.into().trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), InteractionValidationError> {
        if self.kind.as_str().is_empty() {
            return Err(InteractionValidationError::EmptyKind);
        }
        if self.actor.trim().is_empty() {
            return Err(InteractionValidationError::EmptyActor);
        }
        let note_is_blank = self
            .note
            .as_deref()
            .map_or(true, |note| note.trim().is_empty());
        let kind = InteractionKind::from_label(self.kind.as_str());
        if kind == InteractionKind::Note && note_is_blank {
            return Err(InteractionValidationError::EmptyNote);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionValidationError {
    /// Note interactions must carry text.
    EmptyNote,
    EmptyKind,
    EmptyActor,
}

impl Display for InteractionValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyNote => write!(f, "note interactions require non-empty note text"),
            Self::EmptyKind => write!(f, "interaction type must not be empty"),
            Self::EmptyActor => write!(f, "interaction actor must not be empty"),
        }
    }
}

impl Error for InteractionValidationError {}

#[cfg(test)]
mod tests {
    use super::{InteractionKind, InteractionValidationError, NewInteraction};
    use uuid::Uuid;

    #[test]
    fn kind_labels_are_normalized_and_open_ended() {
        assert_eq!(InteractionKind::from_label(" NOTE "), InteractionKind::Note);
        assert_eq!(InteractionKind::from_label("call"), InteractionKind::Call);
        assert_eq!(
            InteractionKind::from_label("WhatsApp"),
            InteractionKind::Other("whatsapp".to_string())
        );
    }

    #[test]
    fn note_kind_requires_text_after_trim() {
        let request = NewInteraction::new(Uuid::new_v4(), InteractionKind::Note, Some("   "), "me");
        assert_eq!(request.note, None);
        assert_eq!(
            request.validate(),
            Err(InteractionValidationError::EmptyNote)
        );
    }

    #[test]
    fn reserved_labels_in_other_are_canonicalized() {
        let request = NewInteraction::new(
            Uuid::new_v4(),
            InteractionKind::Other("note".to_string()),
            None,
            "me",
        );
        assert_eq!(request.kind, InteractionKind::Note);
        assert_eq!(
            request.validate(),
            Err(InteractionValidationError::EmptyNote)
        );

        let sms = NewInteraction::new(
            Uuid::new_v4(),
            InteractionKind::Other(" SMS ".to_string()),
            None,
            "me",
        );
        assert_eq!(sms.kind, InteractionKind::Other("sms".to_string()));
    }

    #[test]
    fn hand_built_request_with_note_label_still_requires_text() {
        let request = NewInteraction {
            contact_id: Uuid::new_v4(),
            kind: InteractionKind::Other("Note".to_string()),
            note: None,
            actor: "me".to_string(),
        };
        assert_eq!(
            request.validate(),
            Err(InteractionValidationError::EmptyNote)
        );
    }

    #[test]
    fn call_without_note_is_valid() {
        let request = NewInteraction::new(Uuid::new_v4(), InteractionKind::Call, None, "me");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn kind_serializes_as_plain_label() {
        let json = serde_json::to_string(&InteractionKind::Other("sms".to_string())).unwrap();
        assert_eq!(json, "\"sms\"");
    }
}
