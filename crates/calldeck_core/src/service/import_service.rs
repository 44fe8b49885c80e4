//! Reconciliation & import gate.
//!
//! # Responsibility
//! - Re-validate normalized rows and insert the survivors as one batch.
//! - Report inserted vs skipped counts for every submitted row.
//!
//! # Invariants
//! - `inserted_count + skipped_count` equals the number of submitted rows.
//! - `inserted_count` is what persistence reports back, never assumed.
//! - No duplicate detection against existing contacts happens here.

use crate::import::normalizer::{normalize_csv, ImportError, ImportRow};
use crate::model::contact::{ContactId, NewContact};
use crate::repo::contact_repo::{ContactRepository, RepoError};
use log::{error, info};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Read;

#[derive(Debug)]
pub enum ImportServiceError {
    /// The source file could not be parsed; nothing was inserted.
    Input(ImportError),
    /// The batch insert failed as a whole; nothing was inserted.
    Persistence(RepoError),
}

impl Display for ImportServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input(err) => write!(f, "failed to parse import file: {err}"),
            Self::Persistence(err) => write!(f, "failed to insert contacts: {err}"),
        }
    }
}

impl Error for ImportServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Input(err) => Some(err),
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<ImportError> for ImportServiceError {
    fn from(value: ImportError) -> Self {
        Self::Input(value)
    }
}

/// Outcome of one gate pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub inserted_count: usize,
    pub skipped_count: usize,
    #[serde(skip)]
    pub inserted_ids: Vec<ContactId>,
}

/// Outcome of a whole file import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvImportReport {
    /// Data rows in the file.
    pub rows_read: usize,
    /// Rows the normalizer dropped for a missing name or phone.
    pub rows_dropped: usize,
    /// Gate counts over the normalized rows.
    pub report: ImportReport,
}

/// Import gate over a contact repository.
pub struct ImportService<R: ContactRepository> {
    repo: R,
}

impl<R: ContactRepository> ImportService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validates and inserts normalized rows.
    ///
    /// Rows whose name or phone is blank after trimming are skipped. Optional
    /// fields are trimmed and blank ones dropped.
    ///
    /// # Errors
    /// - `Persistence` when the batch insert fails; no partial count is
    ///   reported in that case.
    pub fn import_rows(
        &mut self,
        rows: Vec<ImportRow>,
    ) -> Result<ImportReport, ImportServiceError> {
        let submitted = rows.len();
        let batch = rows
            .into_iter()
            .filter_map(clean_row)
            .collect::<Vec<NewContact>>();

        if batch.is_empty() {
            info!(
                "event=contacts_import module=service status=skip submitted={submitted} inserted=0 skipped={submitted}"
            );
            return Ok(ImportReport {
                inserted_count: 0,
                skipped_count: submitted,
                inserted_ids: Vec::new(),
            });
        }

        let inserted_ids = match self.repo.insert_contacts(&batch) {
            Ok(ids) => ids,
            Err(err) => {
                error!(
                    "event=contacts_import module=service status=error submitted={submitted} error={err}"
                );
                return Err(ImportServiceError::Persistence(err));
            }
        };

        let inserted_count = inserted_ids.len().min(submitted);
        let report = ImportReport {
            inserted_count,
            skipped_count: submitted - inserted_count,
            inserted_ids,
        };
        info!(
            "event=contacts_import module=service status=ok submitted={submitted} inserted={} skipped={}",
            report.inserted_count, report.skipped_count
        );
        Ok(report)
    }

    /// Parses, normalizes and imports a CSV source in one call.
    ///
    /// # Errors
    /// - `Input` when the file is malformed; nothing is inserted.
    /// - `Persistence` when the batch insert fails.
    pub fn import_csv<S: Read>(
        &mut self,
        source: S,
    ) -> Result<CsvImportReport, ImportServiceError> {
        let normalized = normalize_csv(source)?;
        let report = self.import_rows(normalized.rows)?;
        Ok(CsvImportReport {
            rows_read: normalized.rows_read,
            rows_dropped: normalized.rows_dropped,
            report,
        })
    }
}

fn clean_row(row: ImportRow) -> Option<NewContact> {
    let full_name = row.full_name.trim();
    let phone = row.phone.trim();
    if full_name.is_empty() || phone.is_empty() {
        return None;
    }

    let tags = row
        .tags
        .map(|tags| {
            tags.into_iter()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|tags| !tags.is_empty());

    Some(NewContact {
        full_name: full_name.to_string(),
        org: trimmed_optional(row.org),
        phone: phone.to_string(),
        email: trimmed_optional(row.email),
        notes: trimmed_optional(row.notes),
        tags,
    })
}

fn trimmed_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
