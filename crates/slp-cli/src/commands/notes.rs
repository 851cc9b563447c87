//! `slp notes ...` and `slp db ...`: direct access to the notes database.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use slp_config::{resolve_secrets, SourceMode};
use slp_db::{NotesStore, PgNotesStore};
use slp_schemas::{DateRange, SleepNote};
use uuid::Uuid;

use super::CliConfig;

/// Store for the database named by `notes.database_url_env`.
pub async fn connect_store(cfg: &CliConfig) -> Result<PgNotesStore> {
    let secrets = resolve_secrets(&cfg.loaded.config_json, SourceMode::Mock)?;
    let url = secrets.database_url.with_context(|| {
        format!(
            "SECRETS_MISSING: env var '{}' (notes database url) is not set or empty",
            secrets.database_url_env
        )
    })?;
    Ok(PgNotesStore::new(slp_db::connect(&url).await?))
}

pub async fn db_status(cfg: &CliConfig) -> Result<()> {
    let store = connect_store(cfg).await?;
    let s = slp_db::status(store.pool()).await?;
    println!("db_ok={} has_notes_table={}", s.ok, s.has_notes_table);
    Ok(())
}

pub async fn db_migrate(cfg: &CliConfig) -> Result<()> {
    let store = connect_store(cfg).await?;
    slp_db::migrate(store.pool()).await?;
    println!("migrations_applied=true");
    Ok(())
}

pub async fn notes_list(cfg: &CliConfig, range: &DateRange, json: bool) -> Result<()> {
    let store = connect_store(cfg).await?;
    let notes = store.notes_in_range(range).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
        return Ok(());
    }
    println!("notes={}", notes.len());
    for n in &notes {
        print_note(n);
    }
    Ok(())
}

pub async fn notes_get(cfg: &CliConfig, day: NaiveDate) -> Result<()> {
    let store = connect_store(cfg).await?;
    match store.note_for_day(day).await? {
        Some(n) => print_note(&n),
        None => println!("day={day} note=none"),
    }
    Ok(())
}

/// Upsert by day; the last write wins.
pub async fn notes_set(cfg: &CliConfig, day: NaiveDate, text: &str) -> Result<()> {
    let store = connect_store(cfg).await?;
    let n = store.upsert_note(day, text).await?;
    println!("note_saved=true id={} day={}", n.id, n.day);
    Ok(())
}

/// Rewrite an existing note by id. Fails if the id does not exist.
pub async fn notes_edit(cfg: &CliConfig, id: Uuid, text: &str) -> Result<()> {
    let store = connect_store(cfg).await?;
    let n = store.update_note(id, text).await?;
    println!("note_saved=true id={} day={}", n.id, n.day);
    Ok(())
}

fn print_note(n: &SleepNote) {
    println!(
        "id={} day={} updated_at={} notes={:?}",
        n.id,
        n.day,
        n.updated_at.to_rfc3339(),
        n.notes
    );
}
