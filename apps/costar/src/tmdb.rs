//! # TMDB Client
//!
//! `MetadataProvider` over the TMDB v3 REST API.

use async_trait::async_trait;
use costar_core::{CostarError, MetadataProvider, WorkMetadata, parse_tmdb_movie};
use serde::Deserialize;

use crate::config::ProviderConfig;

/// Minimum vote count for the popular-works listing.
const POPULAR_MIN_VOTES: u32 = 1000;

/// One page of `GET /discover/movie`.
#[derive(Debug, Deserialize)]
struct DiscoverPage {
    #[serde(default)]
    results: Vec<DiscoverEntry>,
}

#[derive(Debug, Deserialize)]
struct DiscoverEntry {
    id: u64,
}

/// HTTP client for TMDB.
#[derive(Debug, Clone)]
pub struct TmdbProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl TmdbProvider {
    /// Build a client from the provider section. An API key is required.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, CostarError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            CostarError::Validation(
                "TMDB API key missing (set TMDB_API_KEY or [provider] api_key)".to_string(),
            )
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CostarError::UpstreamFetch(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            language: config.language.clone(),
        })
    }

    /// GET `{base}{path}` with the API key and language attached.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<u8>, CostarError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("language", self.language.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| CostarError::UpstreamFetch(format!("GET {path}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(path, status = status.as_u16(), "TMDB request failed");
            return Err(CostarError::UpstreamFetch(format!(
                "provider returned {} for {path}",
                status.as_u16()
            )));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| CostarError::UpstreamFetch(format!("GET {path}: {e}")))?;
        Ok(body.to_vec())
    }

    /// Ids of one page of popular, well-voted works.
    pub async fn discover_popular(&self, page: u32) -> Result<Vec<String>, CostarError> {
        let body = self
            .get(
                "/discover/movie",
                &[
                    ("sort_by", "popularity.desc".to_string()),
                    ("vote_count.gte", POPULAR_MIN_VOTES.to_string()),
                    ("page", page.max(1).to_string()),
                ],
            )
            .await?;
        let page: DiscoverPage = serde_json::from_slice(&body)
            .map_err(|e| CostarError::UpstreamFetch(format!("malformed discover payload: {e}")))?;
        Ok(page.results.into_iter().map(|r| r.id.to_string()).collect())
    }
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    async fn fetch(&self, id: &str) -> Result<WorkMetadata, CostarError> {
        // Ids land in the URL path.
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(CostarError::UpstreamFetch(format!("invalid TMDB id '{id}'")));
        }
        let body = self
            .get(
                &format!("/movie/{id}"),
                &[("append_to_response", "credits".to_string())],
            )
            .await?;
        parse_tmdb_movie(&body)
    }
}

// =============================================================================
// TESTS
// =============================================================================
