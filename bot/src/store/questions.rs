use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use super::Database;

/// Row from the local trivia question bank.
#[derive(Debug, Clone)]
pub struct StoredQuestion {
    pub id: i64,
    pub prompt: String,
    pub answer: String,
    pub category: String,
    pub difficulty: String,
}

/// Media blob attached to a stored question.
#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub alt_text: String,
}

impl Database {
    /// Uniformly random question from the bank, with its media rows.
    /// `None` when the bank is empty.
    pub fn random_question(&self) -> Result<Option<(StoredQuestion, Vec<StoredMedia>)>> {
        self.with_conn(|conn| {
            let question = conn
                .query_row(
                    "SELECT id, prompt, answer, category, difficulty
                     FROM trivia_questions ORDER BY RANDOM() LIMIT 1",
                    [],
                    |row| {
                        Ok(StoredQuestion {
                            id: row.get(0)?,
                            prompt: row.get(1)?,
                            answer: row.get(2)?,
                            category: row.get(3)?,
                            difficulty: row.get(4)?,
                        })
                    },
                )
                .optional()
                .context("Failed to query random question")?;

            let Some(question) = question else {
                return Ok(None);
            };

            let mut stmt = conn
                .prepare(
                    "SELECT bytes, mime_type, alt_text
                     FROM trivia_media WHERE question_id = ?1 ORDER BY id",
                )
                .context("Failed to prepare media query")?;
            let media = stmt
                .query_map(params![question.id], |row| {
                    Ok(StoredMedia {
                        bytes: row.get(0)?,
                        mime_type: row.get(1)?,
                        alt_text: row.get(2)?,
                    })
                })
                .context("Failed to query question media")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("Failed to read question media rows")?;

            Ok(Some((question, media)))
        })
    }

    pub fn insert_question(
        &self,
        prompt: &str,
        answer: &str,
        category: &str,
        difficulty: &str,
        media: Option<(&[u8], &str)>,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO trivia_questions (prompt, answer, category, difficulty)
                 VALUES (?1, ?2, ?3, ?4)",
                params![prompt, answer, category, difficulty],
            )
            .context("Failed to insert question")?;
            let id = conn.last_insert_rowid();

            if let Some((bytes, mime_type)) = media {
                conn.execute(
                    "INSERT INTO trivia_media (question_id, bytes, mime_type)
                     VALUES (?1, ?2, ?3)",
                    params![id, bytes, mime_type],
                )
                .context("Failed to insert question media")?;
            }

            Ok(id)
        })
    }

    pub fn question_count(&self) -> Result<i64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM trivia_questions", [], |row| row.get(0))
                .context("Failed to count questions")
        })
    }
}
