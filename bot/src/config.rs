use serde::Deserialize;
use std::env;

/// Runtime configuration. Loaded from an optional `config/{env}.toml`
/// with `APP_`-prefixed environment overrides layered on top, after
/// `.env` is applied. Secrets (platform credentials, catalog API key)
/// have no defaults and must be provided.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub db_path: String,
    pub social: SocialSettings,
    pub catalog: CatalogSettings,
    pub game: GameSettings,
    pub image: ImageSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocialSettings {
    /// PDS base URL.
    pub service: String,
    /// Handle or DID used to log in.
    pub identifier: String,
    /// App password.
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    pub api_base: String,
    pub image_base: String,
    pub api_key: String,
    /// Movies with fewer backdrops than this are ineligible.
    pub min_backdrops: usize,
    /// Backdrops published per movie round.
    pub max_backdrops: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameSettings {
    /// Reply window length.
    pub round_minutes: u64,
    /// Delay between rounds.
    pub break_minutes: u64,
    /// Delay after a failed round or an empty selection.
    pub cooldown_secs: u64,
    /// Similarity threshold for a correct answer, 0-100.
    pub threshold: u32,
    /// Attempt budget for question selection across sources.
    pub source_attempts: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageSettings {
    /// Neither output dimension exceeds this.
    pub max_dimension: u32,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    /// Visible-window area bounds as fractions of the full image.
    pub visible_min: f64,
    pub visible_max: f64,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        config::Config::builder()
            .set_default("db_path", "bluequiz.db")?
            .set_default("social.service", "https://bsky.social")?
            .set_default("catalog.api_base", "https://api.themoviedb.org/3")?
            .set_default("catalog.image_base", "https://image.tmdb.org/t/p/w1280")?
            .set_default("catalog.min_backdrops", 4)?
            .set_default("catalog.max_backdrops", 4)?
            .set_default("game.round_minutes", 30)?
            .set_default("game.break_minutes", 30)?
            .set_default("game.cooldown_secs", 60)?
            .set_default("game.threshold", 80)?
            .set_default("game.source_attempts", 4)?
            .set_default("image.max_dimension", 1280)?
            .set_default("image.jpeg_quality", 75)?
            .set_default("image.visible_min", 0.08)?
            .set_default("image.visible_max", 0.20)?
            // Load base config from TOML file, allow missing and
            // fall back to ENV entirely
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()
    }
}
