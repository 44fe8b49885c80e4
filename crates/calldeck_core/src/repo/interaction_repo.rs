//! Engagement ledger persistence.
//!
//! # Responsibility
//! - Append interactions and refresh the owning contact's engagement cache in
//!   one SQLite transaction.
//! - Answer "latest engagement" reads straight from the ledger.
//!
//! # Invariants
//! - `record_interaction` never leaves an interaction without the matching
//!   contact update (or the reverse); a failed write rolls back both.
//! - `created_at` is strictly increasing across the whole ledger.

use crate::model::contact::{ContactId, Engagement};
use crate::model::interaction::{Interaction, InteractionKind, NewInteraction};
use crate::repo::contact_repo::{
    ensure_table_exists, next_created_at, parse_contact_id, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use uuid::Uuid;

const INTERACTION_SELECT_SQL: &str = "SELECT
    id,
    contact_id,
    kind,
    note,
    actor,
    created_at
FROM interactions";

/// Repository interface for the engagement ledger.
pub trait InteractionRepository {
    /// Appends one interaction and refreshes the contact's engagement cache.
    fn record_interaction(&mut self, request: &NewInteraction) -> RepoResult<Interaction>;
    /// Latest interaction for one contact, read from the ledger.
    fn latest_interaction(&self, contact_id: ContactId) -> RepoResult<Option<Interaction>>;
    /// Interactions for one contact, newest first.
    fn list_interactions(
        &self,
        contact_id: ContactId,
        limit: Option<u32>,
    ) -> RepoResult<Vec<Interaction>>;
    /// Number of interactions per contact; contacts without any are absent.
    fn interaction_counts(&self) -> RepoResult<HashMap<ContactId, u32>>;
    /// Engagement cache currently stored on the contact.
    ///
    /// Returns `NotFound` when the contact does not exist.
    fn cached_engagement(&self, contact_id: ContactId) -> RepoResult<Option<Engagement>>;
    /// Recomputes the contact's engagement cache from the ledger.
    fn refresh_engagement(&mut self, contact_id: ContactId) -> RepoResult<Option<Engagement>>;
}

/// SQLite-backed ledger repository.
pub struct SqliteInteractionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInteractionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        for table in ["contacts", "interactions"] {
            ensure_table_exists(conn, table)?;
        }
        Ok(Self { conn })
    }
}

impl InteractionRepository for SqliteInteractionRepository<'_> {
    fn record_interaction(&mut self, request: &NewInteraction) -> RepoResult<Interaction> {
        request.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let contact_id_text = request.contact_id.to_string();
        if !contact_exists(&tx, contact_id_text.as_str())? {
            return Err(RepoError::NotFound(request.contact_id));
        }

        let interaction = Interaction {
            id: Uuid::new_v4(),
            contact_id: request.contact_id,
            kind: InteractionKind::from_label(request.kind.as_str()),
            note: request.note.clone(),
            actor: request.actor.clone(),
            created_at: next_created_at(&tx, "interactions")?,
        };

        tx.execute(
            "INSERT INTO interactions (
                id,
                contact_id,
                kind,
                note,
                actor,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                interaction.id.to_string(),
                contact_id_text.as_str(),
                interaction.kind.as_str(),
                interaction.note.as_deref(),
                interaction.actor.as_str(),
                interaction.created_at,
            ],
        )?;
        write_engagement_cache(
            &tx,
            contact_id_text.as_str(),
            Some(interaction.created_at),
            Some(interaction.actor.as_str()),
        )?;

        tx.commit()?;
        Ok(interaction)
    }

    fn latest_interaction(&self, contact_id: ContactId) -> RepoResult<Option<Interaction>> {
        latest_in(self.conn, contact_id.to_string().as_str())
    }

    fn list_interactions(
        &self,
        contact_id: ContactId,
        limit: Option<u32>,
    ) -> RepoResult<Vec<Interaction>> {
        let limit = limit.map_or(-1, i64::from);
        let mut stmt = self.conn.prepare(&format!(
            "{INTERACTION_SELECT_SQL}
             WHERE contact_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2;"
        ))?;
        let mut rows = stmt.query(params![contact_id.to_string(), limit])?;
        let mut interactions = Vec::new();
        while let Some(row) = rows.next()? {
            interactions.push(parse_interaction_row(row)??);
        }
        Ok(interactions)
    }

    fn interaction_counts(&self) -> RepoResult<HashMap<ContactId, u32>> {
        let mut stmt = self
            .conn
            .prepare("SELECT contact_id, COUNT(*) FROM interactions GROUP BY contact_id;")?;
        let mut rows = stmt.query([])?;
        let mut counts = HashMap::new();
        while let Some(row) = rows.next()? {
            let contact_id: String = row.get(0)?;
            let count: u32 = row.get(1)?;
            counts.insert(
                parse_contact_id(&contact_id, "interactions.contact_id")?,
                count,
            );
        }
        Ok(counts)
    }

    fn cached_engagement(&self, contact_id: ContactId) -> RepoResult<Option<Engagement>> {
        let cached = self
            .conn
            .query_row(
                "SELECT last_engaged_at, last_engaged_by FROM contacts WHERE id = ?1;",
                [contact_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, Option<i64>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                    ))
                },
            )
            .optional()?;

        match cached {
            None => Err(RepoError::NotFound(contact_id)),
            Some((Some(at), Some(by))) => Ok(Some(Engagement { at, by })),
            Some((None, None)) => Ok(None),
            Some(_) => Err(RepoError::InvalidData(format!(
                "contact {contact_id} has a partial engagement cache"
            ))),
        }
    }

    fn refresh_engagement(&mut self, contact_id: ContactId) -> RepoResult<Option<Engagement>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let contact_id_text = contact_id.to_string();
        if !contact_exists(&tx, contact_id_text.as_str())? {
            return Err(RepoError::NotFound(contact_id));
        }

        let engagement = latest_in(&tx, contact_id_text.as_str())?.map(|latest| Engagement {
            at: latest.created_at,
            by: latest.actor,
        });
        write_engagement_cache(
            &tx,
            contact_id_text.as_str(),
            engagement.as_ref().map(|value| value.at),
            engagement.as_ref().map(|value| value.by.as_str()),
        )?;
        tx.commit()?;
        Ok(engagement)
    }
}

fn latest_in(conn: &Connection, contact_id: &str) -> RepoResult<Option<Interaction>> {
    let mut stmt = conn.prepare(&format!(
        "{INTERACTION_SELECT_SQL}
         WHERE contact_id = ?1
         ORDER BY created_at DESC, rowid DESC
         LIMIT 1;"
    ))?;
    let latest = stmt
        .query_row([contact_id], parse_interaction_row)
        .optional()?;
    latest.transpose()
}

fn write_engagement_cache(
    conn: &Connection,
    contact_id: &str,
    at: Option<i64>,
    by: Option<&str>,
) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE contacts
         SET
            last_engaged_at = ?2,
            last_engaged_by = ?3
         WHERE id = ?1;",
        params![contact_id, at, by],
    )?;
    if changed == 0 {
        return Err(RepoError::InvalidData(format!(
            "contact {contact_id} vanished during engagement update"
        )));
    }
    Ok(())
}

fn contact_exists(conn: &Connection, contact_id: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM contacts WHERE id = ?1);",
        [contact_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_interaction_row(row: &Row<'_>) -> rusqlite::Result<RepoResult<Interaction>> {
    let id_text: String = row.get("id")?;
    let contact_id_text: String = row.get("contact_id")?;
    let kind: String = row.get("kind")?;
    let note: Option<String> = row.get("note")?;
    let actor: String = row.get("actor")?;
    let created_at: i64 = row.get("created_at")?;

    Ok(parse_contact_id(&id_text, "interactions.id").and_then(|id| {
        let contact_id = parse_contact_id(&contact_id_text, "interactions.contact_id")?;
        Ok(Interaction {
            id,
            contact_id,
            kind: InteractionKind::from_label(&kind),
            note,
            actor,
            created_at,
        })
    }))
}
