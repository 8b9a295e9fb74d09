use crate::error::SourceError;
use crate::models::{Question, QuestionMedia};
use crate::services::catalog::TmdbClient;

pub const NAME: &str = "Movie Trivia";

const PROMPT: &str = "Can you guess the movie from these backdrops?";

/// Turns random catalog movies into guess-the-movie questions. A movie
/// qualifies only with enough backdrops to censor; thin ones are
/// reported as ineligible so the engine can try again.
pub struct MovieQuestionSource {
    catalog: TmdbClient,
    min_backdrops: usize,
    max_backdrops: usize,
}

impl MovieQuestionSource {
    pub fn new(catalog: TmdbClient, min_backdrops: usize, max_backdrops: usize) -> Self {
        Self { catalog, min_backdrops, max_backdrops }
    }

    pub async fn fetch_question(&self) -> Result<Question, SourceError> {
        let movie = self.catalog.random_popular_movie().await?;
        let paths = self.catalog.backdrop_paths(movie.id).await?;

        if paths.len() < self.min_backdrops {
            tracing::debug!(
                "Movie '{}' has {} backdrops, below the minimum of {}",
                movie.title,
                paths.len(),
                self.min_backdrops
            );
            return Err(SourceError::NoEligibleQuestion);
        }

        let mut media = Vec::with_capacity(self.max_backdrops);
        for path in paths.iter().take(self.max_backdrops) {
            let bytes = self.catalog.download_backdrop(path).await?;
            media.push(QuestionMedia::jpeg(bytes, "Censored movie backdrop"));
        }

        tracing::info!("Selected movie: {}", movie.title);
        Ok(Question::new(PROMPT, movie.title, media, Some("Movies".to_string()), NAME))
    }
}
