use uuid::Uuid;

use crate::matcher;

/// A trivia question with its canonical answer and any media payloads.
/// Immutable once created; owned by the active round for its lifetime.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: Uuid,
    pub prompt: String,
    pub answer: String,
    /// Canonical comparison form, fixed at creation so every reply is
    /// scored against the same string.
    pub answer_normalized: String,
    pub media: Vec<QuestionMedia>,
    pub category: Option<String>,
    /// Name of the source that produced this question.
    pub source: String,
}

impl Question {
    pub fn new(
        prompt: impl Into<String>,
        answer: impl Into<String>,
        media: Vec<QuestionMedia>,
        category: Option<String>,
        source: impl Into<String>,
    ) -> Self {
        let answer = answer.into();
        let answer_normalized = matcher::normalize(&answer);
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            answer,
            answer_normalized,
            media,
            category,
            source: source.into(),
        }
    }

    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }
}

/// Raw media attached to a question before the image pipeline runs.
#[derive(Debug, Clone)]
pub struct QuestionMedia {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub alt_text: String,
}

impl QuestionMedia {
    pub fn jpeg(bytes: Vec<u8>, alt_text: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: "image/jpeg".to_string(),
            alt_text: alt_text.into(),
        }
    }
}
