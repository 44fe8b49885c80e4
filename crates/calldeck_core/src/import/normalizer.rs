//! Contact normalizer.
//!
//! Each canonical field resolves from an ordered, case-sensitive alias list;
//! the first alias present with a non-empty value wins.

use crate::model::contact::NewContact;
use log::{error, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Read;

/// One raw row: column label to cell value.
pub type RawRow = HashMap<String, String>;

const NAME_ALIASES: &[&str] = &["full_name", "name", "Name", "Full Name"];
const PHONE_ALIASES: &[&str] = &["phone", "Phone", "phone_number", "Phone Number"];
const ORG_ALIASES: &[&str] = &["org", "organization", "company", "Org"];
const EMAIL_ALIASES: &[&str] = &["email", "Email", "email_address"];
const NOTES_ALIASES: &[&str] = &["notes", "Notes"];
const TAGS_ALIASES: &[&str] = &["tags", "Tags"];

const TAG_SEPARATORS: [char; 2] = [',', ';'];

/// A normalized, not-yet-persisted contact candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub full_name: String,
    pub org: Option<String>,
    /// Trimmed; no format validation.
    pub phone: String,
    pub email: Option<String>,
    pub notes: Option<String>,
    /// `None` when the tags cell was absent or contained no usable pieces.
    pub tags: Option<Vec<String>>,
}

impl From<ImportRow> for NewContact {
    fn from(row: ImportRow) -> Self {
        Self {
            full_name: row.full_name,
            org: row.org,
            phone: row.phone,
            email: row.email,
            notes: row.notes,
            tags: row.tags,
        }
    }
}

/// Rows produced from one file, plus how many were dropped on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImport {
    pub rows: Vec<ImportRow>,
    /// Data rows read from the file (header excluded).
    pub rows_read: usize,
    /// Rows dropped for a missing name or phone.
    pub rows_dropped: usize,
}

/// Parse-level failure; the whole file is rejected.
#[derive(Debug)]
pub enum ImportError {
    /// The header row is missing or has no labels.
    MissingHeader,
    /// A record could not be decoded.
    Malformed { line: Option<u64>, source: csv::Error },
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "import file has no header row"),
            Self::Malformed {
                line: Some(line),
                source,
            } => write!(f, "malformed import file at line {line}: {source}"),
            Self::Malformed { line: None, source } => {
                write!(f, "malformed import file: {source}")
            }
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MissingHeader => None,
            Self::Malformed { source, .. } => Some(source),
        }
    }
}

impl From<csv::Error> for ImportError {
    fn from(source: csv::Error) -> Self {
        let line = source.position().map(|position| position.line());
        Self::Malformed { line, source }
    }
}

/// Reads a comma-delimited file with a header row into raw rows.
///
/// Blank lines are skipped. Cells are keyed by their header label exactly as
/// written; when a label repeats, the first column keeps it. A row shorter or
/// longer than the header is malformed.
///
/// # Errors
/// - `MissingHeader` when the input has no header labels.
/// - `Malformed` on the first undecodable record. No rows are returned.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RawRow>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    if headers.iter().all(|label| label.trim().is_empty()) {
        return Err(ImportError::MissingHeader);
    }

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let mut row = RawRow::with_capacity(headers.len());
        for (label, value) in headers.iter().zip(record.iter()) {
            row.entry(label.to_string()).or_insert_with(|| value.to_string());
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Normalizes raw rows, dropping those without a name or phone.
///
/// Output preserves input order.
pub fn normalize_rows<I>(rows: I) -> Vec<ImportRow>
where
    I: IntoIterator<Item = RawRow>,
{
    rows.into_iter()
        .filter_map(|row| normalize_row(&row))
        .collect()
}

/// Normalizes one raw row. Returns `None` when name or phone is missing.
pub fn normalize_row(row: &RawRow) -> Option<ImportRow> {
    let full_name = resolve_field(row, NAME_ALIASES)?;
    let phone = resolve_field(row, PHONE_ALIASES)?.trim().to_string();
    if phone.is_empty() {
        return None;
    }

    Some(ImportRow {
        full_name: full_name.to_string(),
        org: resolve_field(row, ORG_ALIASES).map(str::to_string),
        phone,
        email: resolve_field(row, EMAIL_ALIASES).map(str::to_string),
        notes: resolve_field(row, NOTES_ALIASES).map(str::to_string),
        tags: resolve_field(row, TAGS_ALIASES).and_then(parse_tags),
    })
}

/// Read + normalize in one pass over a CSV source.
pub fn normalize_csv<R: Read>(reader: R) -> Result<NormalizedImport, ImportError> {
    let raw_rows = match read_csv(reader) {
        Ok(rows) => rows,
        Err(err) => {
            error!("event=import_parse module=import status=error error={err}");
            return Err(err);
        }
    };

    let rows_read = raw_rows.len();
    let rows = normalize_rows(raw_rows);
    let rows_dropped = rows_read - rows.len();
    info!(
        "event=import_parse module=import status=ok rows_read={rows_read} rows_kept={} rows_dropped={rows_dropped}",
        rows.len()
    );

    Ok(NormalizedImport {
        rows,
        rows_read,
        rows_dropped,
    })
}

/// Splits a tags cell on `,`/`;`, trimming pieces and dropping empties.
///
/// An all-empty result collapses to `None`.
pub fn parse_tags(raw: &str) -> Option<Vec<String>> {
    let tags = raw
        .split(TAG_SEPARATORS)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}

fn resolve_field<'row>(row: &'row RawRow, aliases: &[&str]) -> Option<&'row str> {
    aliases
        .iter()
        .filter_map(|alias| row.get(*alias))
        .map(String::as_str)
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{normalize_row, normalize_rows, parse_tags, read_csv, ImportError, RawRow};

    fn row(cells: &[(&str, &str)]) -> RawRow {
        cells
            .iter()
            .map(|(label, value)| (label.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn name_resolves_from_full_name_label_variant() {
        let normalized = normalize_row(&row(&[("Full Name", "Ada Lovelace"), ("phone", "42")]))
            .expect("row should normalize");
        assert_eq!(normalized.full_name, "Ada Lovelace");
    }

    #[test]
    fn row_without_any_name_alias_is_dropped() {
        assert!(normalize_row(&row(&[("Contact", "Ada"), ("phone", "42")])).is_none());
    }

    #[test]
    fn aliases_are_case_sensitive() {
        assert!(normalize_row(&row(&[("FULL_NAME", "Ada"), ("phone", "42")])).is_none());
    }

    #[test]
    fn first_non_empty_alias_wins() {
        let normalized = normalize_row(&row(&[
            ("full_name", ""),
            ("name", "Second"),
            ("Name", "Third"),
            ("Phone Number", "7"),
        ]))
        .expect("row should normalize");
        assert_eq!(normalized.full_name, "Second");
        assert_eq!(normalized.phone, "7");
    }

    #[test]
    fn phone_is_trimmed_and_whitespace_only_phone_drops_row() {
        let kept = normalize_row(&row(&[("name", "A"), ("phone", "  +1 555 0100 ")]))
            .expect("row should normalize");
        assert_eq!(kept.phone, "+1 555 0100");
        assert!(normalize_row(&row(&[("name", "A"), ("phone", "   ")])).is_none());
    }

    #[test]
    fn optional_fields_resolve_through_aliases() {
        let normalized = normalize_row(&row(&[
            ("name", "A"),
            ("phone", "1"),
            ("company", "Acme"),
            ("email_address", "a@acme.test"),
            ("Notes", "met at expo"),
            ("Tags", "warm; demo"),
        ]))
        .expect("row should normalize");
        assert_eq!(normalized.org.as_deref(), Some("Acme"));
        assert_eq!(normalized.email.as_deref(), Some("a@acme.test"));
        assert_eq!(normalized.notes.as_deref(), Some("met at expo"));
        assert_eq!(
            normalized.tags,
            Some(vec!["warm".to_string(), "demo".to_string()])
        );
    }

    #[test]
    fn tags_split_on_both_separators_and_collapse_empty_to_none() {
        assert_eq!(
            parse_tags(" a , b;c ;; "),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(parse_tags(" ; , "), None);
    }

    #[test]
    fn mixed_rows_keep_only_complete_ones_in_order() {
        let rows = vec![
            row(&[("name", "A"), ("phone", "1")]),
            row(&[("name", ""), ("phone", "2")]),
            row(&[("name", "B"), ("phone", "")]),
            row(&[("name", "C"), ("phone", "3")]),
        ];
        let normalized = normalize_rows(rows);
        let names = normalized
            .iter()
            .map(|row| row.full_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn read_csv_skips_blank_lines() {
        let input = "name,phone\nA,1\n\nB,2\n";
        let rows = read_csv(input.as_bytes()).expect("csv should parse");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("name").map(String::as_str), Some("B"));
    }

    #[test]
    fn repeated_header_label_keeps_first_column() {
        let rows = read_csv("name,phone,name\nAda,1,\n".as_bytes()).expect("csv should parse");
        assert_eq!(rows[0].get("name").map(String::as_str), Some("Ada"));

        let normalized = normalize_rows(rows);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].full_name, "Ada");
    }

    #[test]
    fn read_csv_rejects_ragged_rows_as_a_whole() {
        let input = "name,phone\nA,1\nB,2,extra\n";
        let err = read_csv(input.as_bytes()).expect_err("ragged rows must fail");
        assert!(matches!(err, ImportError::Malformed { .. }));
    }

    #[test]
    fn read_csv_rejects_empty_input() {
        let err = read_csv("".as_bytes()).expect_err("empty input has no header");
        assert!(matches!(err, ImportError::MissingHeader));
    }
}
