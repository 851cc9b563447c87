//! slp-db
//!
//! Persistence for user sleep notes.
//!
//! Connection helpers, embedded migrations, and the [`NotesStore`] contract
//! with its Postgres implementation. Notes are keyed by calendar day; the
//! schema enforces at most one note per day.

mod notes;

pub use notes::PgNotesStore;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use slp_schemas::{DateRange, SleepNote};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

pub const ENV_DB_URL: &str = "SLP_DATABASE_URL";

/// Connect to Postgres using SLP_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='sleep_notes'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_notes_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_notes_table: bool,
}

// ---------------------------------------------------------------------------
// Notes contract
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NotesError {
    #[error("notes database error: {0}")]
    Database(String),
    #[error("note {0} not found")]
    NotFound(Uuid),
    #[error("notes store config error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for NotesError {
    fn from(e: sqlx::Error) -> Self {
        NotesError::Database(e.to_string())
    }
}

/// Read/write access to per-day notes.
///
/// Writes are last-writer-wins; there is no optimistic concurrency.
#[async_trait::async_trait]
pub trait NotesStore: Send + Sync {
    /// Notes whose day falls inside `range`, newest day first.
    async fn notes_in_range(&self, range: &DateRange) -> Result<Vec<SleepNote>, NotesError>;

    async fn note_for_day(&self, day: NaiveDate) -> Result<Option<SleepNote>, NotesError>;

    /// Create the day's note or replace its text. Bumps `updated_at`.
    async fn upsert_note(&self, day: NaiveDate, text: &str) -> Result<SleepNote, NotesError>;

    /// Replace the text of an existing note by id.
    async fn update_note(&self, id: Uuid, text: &str) -> Result<SleepNote, NotesError>;
}
