//! `calldeck` command-line entry point.
//!
//! # Responsibility
//! - Wire configuration, storage and the optional suggestion client into the
//!   core services for one command invocation.
//! - Render queue, history and script output as plain text.

use anyhow::{Context, Result};
use calldeck_core::db::open_db;
use calldeck_core::dial::{tel_href, whatsapp_href};
use calldeck_core::{
    default_log_level, epoch_ms_to_rfc3339, init_logging, AppConfig, CallingService, Contact,
    ContactId, ImportService, Interaction, LedgerService, OpenRouterClient, PrioritizeOutcome,
    QueueFilter, ScriptOutcome, SqliteContactRepository, SqliteInteractionRepository,
    SuggestError,
};
use clap::{Parser, Subcommand};
use log::warn;
use rusqlite::Connection;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "calldeck", version, about = "Contact calling queue with an engagement ledger")]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "CALLDECK_DB", default_value = "calldeck.sqlite3", global = true)]
    db: PathBuf,

    /// Identity recorded on interactions. Overrides CALLDECK_ACTOR from config.
    #[arg(long, global = true)]
    actor: Option<String>,

    /// Absolute directory for rolling log files. Logging is off when omitted.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import contacts from a CSV file.
    Import { csv: PathBuf },
    /// Print the calling queue, most stale first.
    Queue {
        /// Only contacts never engaged.
        #[arg(long)]
        never: bool,
        /// Overlay an AI-suggested ranking when available.
        #[arg(long)]
        prioritize: bool,
    },
    /// Record a note against a contact.
    Note { contact_id: ContactId, text: String },
    /// Record a call, optionally with a note.
    Call {
        contact_id: ContactId,
        #[arg(long)]
        note: Option<String>,
    },
    /// Print a contact's interactions, newest first.
    History {
        contact_id: ContactId,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Draft a call script and chat message for a contact.
    Script { contact_id: ContactId },
}

type Session<'conn> = CallingService<
    SqliteContactRepository<'conn>,
    SqliteInteractionRepository<'conn>,
    OpenRouterClient,
>;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).context("failed to initialize logging")?;
    }

    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(actor) = cli.actor {
        config.actor = actor;
    }

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;

    match cli.command {
        Command::Import { csv } => import(&conn, &csv),
        Command::Queue { never, prioritize } => {
            let filter = if never {
                QueueFilter::Never
            } else {
                QueueFilter::All
            };
            queue(&session(&conn, &config)?, &config, filter, prioritize)
        }
        Command::Note { contact_id, text } => {
            let interaction = session(&conn, &config)?.record_note(contact_id, &text)?;
            print_interaction(&interaction);
            Ok(())
        }
        Command::Call { contact_id, note } => {
            let interaction =
                session(&conn, &config)?.record_call(contact_id, note.as_deref())?;
            print_interaction(&interaction);
            Ok(())
        }
        Command::History { contact_id, limit } => {
            let interactions = session(&conn, &config)?.history(contact_id, limit)?;
            if interactions.is_empty() {
                println!("No interactions yet.");
            }
            for interaction in &interactions {
                print_interaction(interaction);
            }
            Ok(())
        }
        Command::Script { contact_id } => {
            match session(&conn, &config)?.draft_script(contact_id)? {
                ScriptOutcome::Ready(suggestion) => {
                    println!("Call script:\n{}\n", suggestion.call_script);
                    println!("WhatsApp message:\n{}", suggestion.whatsapp_message);
                }
                ScriptOutcome::Unavailable => println!("Script suggestions are unavailable."),
            }
            Ok(())
        }
    }
}

fn session<'conn>(conn: &'conn Connection, config: &AppConfig) -> Result<Session<'conn>> {
    let contacts = SqliteContactRepository::try_new(conn)?;
    let interactions = SqliteInteractionRepository::try_new(conn)?;
    let ledger = LedgerService::new(interactions, config.actor.as_str());
    Ok(CallingService::new(contacts, ledger, suggestion_client(config)))
}

fn suggestion_client(config: &AppConfig) -> Option<OpenRouterClient> {
    match OpenRouterClient::from_config(config) {
        Ok(client) => Some(client),
        Err(SuggestError::NotConfigured) => None,
        Err(err) => {
            warn!("event=suggest_client module=cli status=skip error={err}");
            None
        }
    }
}

fn import(conn: &Connection, path: &Path) -> Result<()> {
    let file =
        File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    let mut service = ImportService::new(SqliteContactRepository::try_new(conn)?);
    let outcome = service
        .import_csv(file)
        .with_context(|| format!("failed to import `{}`", path.display()))?;

    println!(
        "Imported {} contacts. Skipped {} rows.",
        outcome.report.inserted_count, outcome.report.skipped_count
    );
    if outcome.rows_dropped > 0 {
        println!(
            "{} of {} rows had no name or phone and were not read.",
            outcome.rows_dropped, outcome.rows_read
        );
    }
    Ok(())
}

fn queue(
    session: &Session<'_>,
    config: &AppConfig,
    filter: QueueFilter,
    prioritize: bool,
) -> Result<()> {
    let mut queue = session.load_queue(filter)?;
    if prioritize {
        queue = match session.prioritize(queue) {
            PrioritizeOutcome::Reordered(queue) => {
                println!("Queue reordered by AI suggestion.");
                queue
            }
            PrioritizeOutcome::Unchanged(queue) => {
                println!("No AI reordering; showing default order.");
                queue
            }
        };
    }

    println!("{} contacted • {} total", queue.stats.contacted, queue.stats.total);
    for (position, contact) in queue.contacts.iter().enumerate() {
        print_contact(position + 1, contact, &config.default_country_code);
    }
    Ok(())
}

fn print_contact(position: usize, contact: &Contact, country_code: &str) {
    let org = contact
        .org
        .as_deref()
        .map(|org| format!(" ({org})"))
        .unwrap_or_default();
    println!("{position:>3}. {}{org}  [{}]", contact.full_name, contact.id);

    match contact.engagement() {
        Some(engagement) => println!(
            "     last engaged {} by {}",
            render_time(engagement.at),
            engagement.by
        ),
        None => println!("     never engaged"),
    }
    if let Some(tags) = contact.tags.as_deref().filter(|tags| !tags.is_empty()) {
        println!("     tags: {}", tags.join(", "));
    }

    print!("     {}", tel_href(&contact.phone));
    match whatsapp_href(&contact.phone, country_code) {
        Some(link) => println!("  {link}"),
        None => println!(),
    }
}

fn print_interaction(interaction: &Interaction) {
    let note = interaction.note.as_deref().unwrap_or("-");
    println!(
        "{}  {:<6} {}  {}",
        render_time(interaction.created_at),
        interaction.kind.as_str(),
        interaction.actor,
        note
    );
}

fn render_time(epoch_ms: i64) -> String {
    epoch_ms_to_rfc3339(epoch_ms).unwrap_or_else(|| epoch_ms.to_string())
}
