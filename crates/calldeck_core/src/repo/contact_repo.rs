//! Contact repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide batch insert and read APIs over the `contacts` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `NewContact::validate()` before SQL mutations.
//! - `created_at` is strictly increasing across inserted contacts.
//! - A batch insert is one transaction: all rows land or none do.

use crate::db::{now_epoch_ms, DbError};
use crate::model::contact::{Contact, ContactId, ContactValidationError, NewContact};
use crate::model::interaction::InteractionValidationError;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

const CONTACT_SELECT_SQL: &str = "SELECT
    id,
    full_name,
    org,
    phone,
    email,
    notes,
    created_at,
    last_engaged_at,
    last_engaged_by
FROM contacts";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by contact and interaction persistence.
#[derive(Debug)]
pub enum RepoError {
    ContactValidation(ContactValidationError),
    InteractionValidation(InteractionValidationError),
    Db(DbError),
    NotFound(ContactId),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContactValidation(err) => write!(f, "{err}"),
            Self::InteractionValidation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "contact not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing; run migrations first")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ContactValidation(err) => Some(err),
            Self::InteractionValidation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<ContactValidationError> for RepoError {
    fn from(value: ContactValidationError) -> Self {
        Self::ContactValidation(value)
    }
}

impl From<InteractionValidationError> for RepoError {
    fn from(value: InteractionValidationError) -> Self {
        Self::InteractionValidation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for contact persistence.
pub trait ContactRepository {
    /// Inserts a batch and returns the ids that were actually created, in
    /// batch order.
    fn insert_contacts(&mut self, batch: &[NewContact]) -> RepoResult<Vec<ContactId>>;
    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>>;
    /// Lists every contact in creation order.
    fn list_contacts(&self) -> RepoResult<Vec<Contact>>;
}

/// SQLite-backed contact repository.
pub struct SqliteContactRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContactRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `MissingRequiredTable` when migrations have not been applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        for table in ["contacts", "contact_tags"] {
            ensure_table_exists(conn, table)?;
        }
        Ok(Self { conn })
    }
}

impl ContactRepository for SqliteContactRepository<'_> {
    fn insert_contacts(&mut self, batch: &[NewContact]) -> RepoResult<Vec<ContactId>> {
        for contact in batch {
            contact.validate()?;
        }
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let started_at = Instant::now();
        let result = insert_batch(self.conn, batch);
        match &result {
            Ok(ids) => info!(
                "event=contacts_insert module=repo status=ok batch_size={} inserted={} duration_ms={}",
                batch.len(),
                ids.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=contacts_insert module=repo status=error batch_size={} duration_ms={} error={}",
                batch.len(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CONTACT_SELECT_SQL} WHERE id = ?1;"))?;
        let contact = stmt
            .query_row([id.to_string()], parse_contact_row)
            .optional()?;
        match contact {
            Some(contact) => {
                let mut contact = contact?;
                contact.tags = load_tags(self.conn, &contact.id.to_string())?;
                Ok(Some(contact))
            }
            None => Ok(None),
        }
    }

    fn list_contacts(&self) -> RepoResult<Vec<Contact>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONTACT_SELECT_SQL} ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut contacts = Vec::new();
        while let Some(row) = rows.next()? {
            contacts.push(parse_contact_row(row)??);
        }

        let mut tags = load_all_tags(self.conn)?;
        for contact in &mut contacts {
            contact.tags = tags.remove(&contact.id);
        }
        Ok(contacts)
    }
}

fn insert_batch(conn: &Connection, batch: &[NewContact]) -> RepoResult<Vec<ContactId>> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let first_created_at = next_created_at(&tx, "contacts")?;
    let mut ids = Vec::with_capacity(batch.len());

    for (offset, contact) in batch.iter().enumerate() {
        let id = Uuid::new_v4();
        let created_at = first_created_at + offset as i64;
        tx.execute(
            "INSERT INTO contacts (
                id,
                full_name,
                org,
                phone,
                email,
                notes,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                id.to_string(),
                contact.full_name.trim(),
                contact.org.as_deref(),
                contact.phone.trim(),
                contact.email.as_deref(),
                contact.notes.as_deref(),
                created_at,
            ],
        )?;

        if let Some(tags) = contact.tags.as_ref() {
            for (position, tag) in tags.iter().enumerate() {
                tx.execute(
                    "INSERT INTO contact_tags (contact_id, position, tag) VALUES (?1, ?2, ?3);",
                    params![id.to_string(), position as i64, tag.trim()],
                )?;
            }
        }
        ids.push(id);
    }

    tx.commit()?;
    Ok(ids)
}

/// Returns a creation timestamp strictly greater than any stored in `table`.
///
/// `table` must be a trusted, compile-time table name.
pub(crate) fn next_created_at(conn: &Connection, table: &'static str) -> RepoResult<i64> {
    let latest: Option<i64> = conn.query_row(
        &format!("SELECT MAX(created_at) FROM {table};"),
        [],
        |row| row.get(0),
    )?;
    let now = now_epoch_ms();
    Ok(match latest {
        Some(latest) if latest >= now => latest + 1,
        _ => now,
    })
}

pub(crate) fn parse_contact_id(value: &str, column: &str) -> RepoResult<ContactId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn parse_contact_row(row: &Row<'_>) -> rusqlite::Result<RepoResult<Contact>> {
    let id_text: String = row.get("id")?;
    let contact = Contact {
        id: Uuid::nil(),
        full_name: row.get("full_name")?,
        org: row.get("org")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        tags: None,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        last_engaged_at: row.get("last_engaged_at")?,
        last_engaged_by: row.get("last_engaged_by")?,
    };
    Ok(parse_contact_id(&id_text, "contacts.id").and_then(|id| {
        if contact.last_engaged_at.is_some() != contact.last_engaged_by.is_some() {
            return Err(RepoError::InvalidData(format!(
                "contact {id} has a partial engagement cache"
            )));
        }
        Ok(Contact { id, ..contact })
    }))
}

fn load_tags(conn: &Connection, contact_id: &str) -> RepoResult<Option<Vec<String>>> {
    let mut stmt = conn.prepare(
        "SELECT tag
         FROM contact_tags
         WHERE contact_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([contact_id])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(row.get::<_, String>(0)?);
    }
    Ok(if tags.is_empty() { None } else { Some(tags) })
}

fn load_all_tags(conn: &Connection) -> RepoResult<HashMap<ContactId, Vec<String>>> {
    let mut stmt = conn.prepare(
        "SELECT contact_id, tag
         FROM contact_tags
         ORDER BY contact_id ASC, position ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut tags: HashMap<ContactId, Vec<String>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let contact_id: String = row.get(0)?;
        let contact_id = parse_contact_id(&contact_id, "contact_tags.contact_id")?;
        tags.entry(contact_id).or_default().push(row.get(1)?);
    }
    Ok(tags)
}

pub(crate) fn ensure_table_exists(conn: &Connection, table: &'static str) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(RepoError::MissingRequiredTable(table))
    }
}
