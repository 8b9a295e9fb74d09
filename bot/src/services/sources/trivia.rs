use std::path::Path;

use crate::error::SourceError;
use crate::models::{Question, QuestionMedia};
use crate::store::Database;

pub const NAME: &str = "General Trivia";

/// Serves questions from the local SQLite bank. Holds its own
/// connection to the database file; an empty bank is an eligibility
/// condition, not a failure.
pub struct TriviaQuestionSource {
    db: Database,
}

impl TriviaQuestionSource {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub async fn fetch_question(&self) -> Result<Question, SourceError> {
        let Some((stored, media_rows)) = self.db.random_question().map_err(SourceError::Collaborator)? else {
            return Err(SourceError::NoEligibleQuestion);
        };

        let media = media_rows
            .into_iter()
            .map(|m| QuestionMedia {
                bytes: m.bytes,
                mime_type: m.mime_type,
                alt_text: m.alt_text,
            })
            .collect();

        Ok(Question::new(
            stored.prompt,
            stored.answer,
            media,
            Some(stored.category),
            NAME,
        ))
    }
}
