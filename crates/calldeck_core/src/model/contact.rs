//! Contact domain model.
//!
//! # Responsibility
//! - Define the persisted contact record and its insert request shape.
//! - Validate mandatory fields before anything reaches storage.
//!
//! # Invariants
//! - `full_name` and `phone` are non-empty after trimming.
//! - `last_engaged_at`/`last_engaged_by` are either both set or both absent,
//!   and equal the latest interaction for the contact.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier assigned to a contact at persistence time.
pub type ContactId = Uuid;

/// A person in the calling list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub full_name: String,
    pub org: Option<String>,
    /// Free-form, trimmed only.
    pub phone: String,
    pub email: Option<String>,
    /// `None` when the source row carried no usable tags.
    pub tags: Option<Vec<String>>,
    /// Free text carried over from import. Not an engagement.
    pub notes: Option<String>,
    /// Unix epoch milliseconds, strictly increasing per store.
    pub created_at: i64,
    /// Unix epoch milliseconds of the latest interaction.
    pub last_engaged_at: Option<i64>,
    /// Actor of the latest interaction.
    pub last_engaged_by: Option<String>,
}

impl Contact {
    /// Returns whether this contact has never been engaged.
    pub fn is_never_engaged(&self) -> bool {
        self.last_engaged_at.is_none()
    }

    /// Returns the cached engagement pair, if any.
    pub fn engagement(&self) -> Option<Engagement> {
        match (self.last_engaged_at, self.last_engaged_by.as_ref()) {
            (Some(at), Some(by)) => Some(Engagement { at, by: by.clone() }),
            _ => None,
        }
    }
}

/// Most recent engagement of a contact: when and by whom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    /// Unix epoch milliseconds.
    pub at: i64,
    pub by: String,
}

/// Insert request for one contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub full_name: String,
    pub org: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NewContact {
    /// Checks mandatory fields.
    ///
    /// # Errors
    /// - `EmptyFullName` when `full_name` is blank after trimming.
    /// - `EmptyPhone` when `phone` is blank after trimming.
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        if self.full_name.trim().is_empty() {
            return Err(ContactValidationError::EmptyFullName);
        }
        if self.phone.trim().is_empty() {
            return Err(ContactValidationError::EmptyPhone);
        }
        if let Some(tags) = self.tags.as_ref() {
            if tags.iter().any(|tag| tag.trim().is_empty()) {
                return Err(ContactValidationError::BlankTag);
            }
        }
        Ok(())
    }
}

/// Field-level validation failure for contact writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactValidationError {
    EmptyFullName,
    EmptyPhone,
    BlankTag,
}

impl Display for ContactValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFullName => write!(f, "contact full_name must not be empty"),
            Self::EmptyPhone => write!(f, "contact phone must not be empty"),
            Self::BlankTag => write!(f, "contact tags must not contain blank values"),
        }
    }
}

impl Error for ContactValidationError {}

#[cfg(test)]
mod tests {
    use super::{ContactValidationError, NewContact};

    fn request(name: &str, phone: &str) -> NewContact {
        NewContact {
            full_name: name.to_string(),
            phone: phone.to_string(),
            ..NewContact::default()
        }
    }

    #[test]
    fn validate_rejects_whitespace_only_mandatory_fields() {
        assert_eq!(
            request("  ", "123").validate(),
            Err(ContactValidationError::EmptyFullName)
        );
        assert_eq!(
            request("Ada", "\t").validate(),
            Err(ContactValidationError::EmptyPhone)
        );
        assert!(request("Ada", "123").validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_tags() {
        let mut contact = request("Ada", "123");
        contact.tags = Some(vec!["warm".to_string(), " ".to_string()]);
        assert_eq!(contact.validate(), Err(ContactValidationError::BlankTag));
    }
}
