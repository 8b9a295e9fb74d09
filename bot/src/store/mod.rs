//! SQLite-backed local storage: round history and the local trivia
//! question bank. The engine only ever touches rounds through the
//! [`RoundStore`] contract so tests can swap in an in-memory fake.

mod questions;
mod rounds;

pub use questions::{StoredMedia, StoredQuestion};
pub use rounds::StoredRound;

use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::models::{Round, RoundResult, RoundState};

/// Write-mostly persistence contract consumed by the round engine. The
/// only read-backs are startup recovery and round numbering.
pub trait RoundStore: Send + Sync {
    /// Archives a freshly published round.
    fn record_round(&self, round: &Round) -> Result<()>;

    /// Marks a round finished, with its aggregate result when one was
    /// computed (zero-reply rounds finish without a result).
    fn finalize_round(
        &self,
        number: i64,
        state: RoundState,
        result: Option<RoundResult>,
        ended_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Most recently created round, if any.
    fn last_round(&self) -> Result<Option<StoredRound>>;

    /// Removes an abandoned round from history.
    fn purge_round(&self, number: i64) -> Result<()>;
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open database at {}", path.as_ref().display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL mode")?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("Failed to enable foreign keys")?;

        let db = Self { conn: Mutex::new(conn) };
        db.init_schema()?;

        tracing::info!("SQLite database ready at {}", path.as_ref().display());
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS rounds (
                    number      INTEGER PRIMARY KEY,
                    state       TEXT NOT NULL,
                    answer      TEXT NOT NULL,
                    source      TEXT NOT NULL,
                    post_uri    TEXT,
                    post_cid    TEXT,
                    percent     INTEGER,
                    attempts    INTEGER,
                    created_at  TEXT NOT NULL,
                    ended_at    TEXT
                );

                CREATE TABLE IF NOT EXISTS trivia_questions (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    prompt      TEXT NOT NULL,
                    answer      TEXT NOT NULL,
                    category    TEXT NOT NULL DEFAULT 'General',
                    difficulty  TEXT NOT NULL DEFAULT 'medium',
                    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS trivia_media (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    question_id INTEGER NOT NULL
                                REFERENCES trivia_questions(id) ON DELETE CASCADE,
                    bytes       BLOB NOT NULL,
                    mime_type   TEXT NOT NULL,
                    alt_text    TEXT NOT NULL DEFAULT ''
                );",
            )
            .context("Failed to initialize database schema")
        })
    }

    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))?;
        f(&conn)
    }
}

pub(crate) fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}
