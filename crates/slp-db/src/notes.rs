use chrono::{DateTime, NaiveDate, Utc};
use slp_schemas::{DateRange, SleepNote};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{NotesError, NotesStore};

const NOTE_COLUMNS: &str = "id, sleep_date, notes, created_at, updated_at";

/// [`NotesStore`] over the `sleep_notes` table.
#[derive(Debug, Clone)]
pub struct PgNotesStore {
    pool: PgPool,
}

impl PgNotesStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn note_from_row(row: &PgRow) -> Result<SleepNote, NotesError> {
    Ok(SleepNote {
        id: row.try_get::<Uuid, _>("id")?,
        day: row.try_get::<NaiveDate, _>("sleep_date")?,
        notes: row.try_get::<String, _>("notes")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

#[async_trait::async_trait]
impl NotesStore for PgNotesStore {
    async fn notes_in_range(&self, range: &DateRange) -> Result<Vec<SleepNote>, NotesError> {
        let sql = format!(
            "select {NOTE_COLUMNS} from sleep_notes \
             where sleep_date between $1 and $2 \
             order by sleep_date desc"
        );
        let rows = sqlx::query(&sql)
            .bind(range.start())
            .bind(range.end())
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(
            start = %range.start(),
            end = %range.end(),
            rows = rows.len(),
            "notes range query"
        );
        rows.iter().map(note_from_row).collect()
    }

    async fn note_for_day(&self, day: NaiveDate) -> Result<Option<SleepNote>, NotesError> {
        let sql = format!("select {NOTE_COLUMNS} from sleep_notes where sleep_date = $1");
        let row = sqlx::query(&sql)
            .bind(day)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(note_from_row).transpose()
    }

    async fn upsert_note(&self, day: NaiveDate, text: &str) -> Result<SleepNote, NotesError> {
        let sql = format!(
            "insert into sleep_notes (id, sleep_date, notes) values ($1, $2, $3) \
             on conflict (sleep_date) do update \
               set notes = excluded.notes, updated_at = now() \
             returning {NOTE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(day)
            .bind(text)
            .fetch_one(&self.pool)
            .await?;

        let note = note_from_row(&row)?;
        tracing::info!(day = %day, note_id = %note.id, "note saved");
        Ok(note)
    }

    async fn update_note(&self, id: Uuid, text: &str) -> Result<SleepNote, NotesError> {
        let sql = format!(
            "update sleep_notes set notes = $2, updated_at = now() \
             where id = $1 \
             returning {NOTE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(text)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(NotesError::NotFound(id))?;

        let note = note_from_row(&row)?;
        tracing::info!(day = %note.day, note_id = %id, "note updated");
        Ok(note)
    }
}
