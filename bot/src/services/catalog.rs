//! Movie catalog access (TMDB). Supplies the movie question source with
//! random popular movies and their backdrop images.

use anyhow::{anyhow, Context, Result};
use rand::Rng;
use serde::Deserialize;

use crate::config::CatalogSettings;

/// Discovery never pages past this; popularity ordering gets noisy and
/// obscure beyond it.
const MAX_DISCOVER_PAGE: u32 = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogMovie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiscoverResponse {
    results: Vec<CatalogMovie>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    backdrops: Vec<BackdropEntry>,
}

#[derive(Debug, Deserialize)]
struct BackdropEntry {
    file_path: String,
}

pub struct TmdbClient {
    http: reqwest::Client,
    api_base: String,
    image_base: String,
    api_key: String,
}

impl TmdbClient {
    pub fn new(settings: &CatalogSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: settings.api_base.clone(),
            image_base: settings.image_base.clone(),
            api_key: settings.api_key.clone(),
        }
    }

    /// Random movie from a random page of the popularity-sorted
    /// discovery listing.
    pub async fn random_popular_movie(&self) -> Result<CatalogMovie> {
        let page = rand::rng().random_range(1..=MAX_DISCOVER_PAGE);

        let response: DiscoverResponse = self
            .http
            .get(format!("{}/discover/movie", self.api_base))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("sort_by", "popularity.desc"),
                ("include_adult", "false"),
                ("page", &page.to_string()),
            ])
            .send()
            .await
            .context("Failed to query movie discovery")?
            .error_for_status()
            .context("Movie discovery rejected")?
            .json()
            .await
            .context("Malformed discovery response")?;

        let mut results = response.results;
        if results.is_empty() {
            return Err(anyhow!("discovery page {page} returned no movies"));
        }
        let index = rand::rng().random_range(0..results.len());
        Ok(results.swap_remove(index))
    }

    /// Backdrop image paths for a movie, most relevant first.
    pub async fn backdrop_paths(&self, movie_id: i64) -> Result<Vec<String>> {
        let response: ImagesResponse = self
            .http
            .get(format!("{}/movie/{movie_id}/images", self.api_base))
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .context("Failed to query movie images")?
            .error_for_status()
            .context("Movie images request rejected")?
            .json()
            .await
            .context("Malformed movie images response")?;

        Ok(response.backdrops.into_iter().map(|b| b.file_path).collect())
    }

    pub async fn download_backdrop(&self, file_path: &str) -> Result<Vec<u8>> {
        let bytes = self
            .http
            .get(format!("{}{}", self.image_base, file_path))
            .send()
            .await
            .context("Failed to download backdrop")?
            .error_for_status()
            .context("Backdrop download rejected")?
            .bytes()
            .await
            .context("Failed to read backdrop bytes")?;
        Ok(bytes.to_vec())
    }
}
