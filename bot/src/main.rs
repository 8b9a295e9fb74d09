use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bluequiz::config::Config;
use bluequiz::imaging::{CoverageRange, ImagePreparer};
use bluequiz::services::catalog::TmdbClient;
use bluequiz::services::engine::{EngineSettings, RoundEngine};
use bluequiz::services::social::BskyClient;
use bluequiz::services::sources::{MovieQuestionSource, QuestionSource, TriviaQuestionSource};
use bluequiz::store::Database;
use bluequiz::utils::clock::SystemClock;
use bluequiz::utils::retry::RetryPolicy;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bluequiz=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting BlueQuiz");

    let config = Config::load().expect("Failed to load configuration");

    let store = Database::open(&config.db_path)?;
    let social = BskyClient::login(&config.social).await?;

    let catalog = TmdbClient::new(&config.catalog);
    let sources = vec![
        QuestionSource::Movie(MovieQuestionSource::new(
            catalog,
            config.catalog.min_backdrops,
            config.catalog.max_backdrops,
        )),
        QuestionSource::Trivia(TriviaQuestionSource::open(&config.db_path)?),
    ];

    let preparer = ImagePreparer::new(
        config.image.max_dimension,
        config.image.jpeg_quality,
        CoverageRange { min: config.image.visible_min, max: config.image.visible_max },
    );

    let settings = EngineSettings {
        round_window: chrono::Duration::minutes(config.game.round_minutes as i64),
        break_delay: std::time::Duration::from_secs(config.game.break_minutes * 60),
        cooldown: std::time::Duration::from_secs(config.game.cooldown_secs),
        threshold: config.game.threshold,
        source_retry: RetryPolicy::with_attempts(config.game.source_attempts),
    };

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    let mut engine = RoundEngine::new(
        social,
        store,
        SystemClock,
        sources,
        preparer,
        settings,
        cancel,
    );

    engine.run().await
}
