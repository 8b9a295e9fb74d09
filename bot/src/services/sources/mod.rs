//! Question backends. A closed set: the engine picks one variant at
//! random per round and dispatches with an exhaustive match, so adding
//! a backend means adding a variant here and nowhere else.

mod movie;
mod trivia;

pub use movie::MovieQuestionSource;
pub use trivia::TriviaQuestionSource;

use crate::error::SourceError;
use crate::models::Question;

pub enum QuestionSource {
    Movie(MovieQuestionSource),
    Trivia(TriviaQuestionSource),
}

impl QuestionSource {
    /// Asks the backend for a question. `NoEligibleQuestion` means the
    /// backend is healthy but has nothing usable right now; the engine
    /// retries another variant.
    pub async fn fetch_question(&self) -> Result<Question, SourceError> {
        match self {
            QuestionSource::Movie(source) => source.fetch_question().await,
            QuestionSource::Trivia(source) => source.fetch_question().await,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QuestionSource::Movie(_) => movie::NAME,
            QuestionSource::Trivia(_) => trivia::NAME,
        }
    }

    /// Whether this backend's media must pass through the censoring
    /// pipeline before publication. Movie backdrops give the answer
    /// away uncensored; trivia attachments are published as-is.
    pub fn censor_media(&self) -> bool {
        match self {
            QuestionSource::Movie(_) => true,
            QuestionSource::Trivia(_) => false,
        }
    }
}
