//! MusicBrainz and Cover Art Archive HTTP client
//!
//! Handles communication with both web services.
//! See: https://musicbrainz.org/doc/MusicBrainz_API
//!      https://coverartarchive.org
//!
//! IMPORTANT: MusicBrainz requires a User-Agent header and rate limits to
//! 1 req/sec. The client does not sleep itself; callers that loop must go
//! through [`crate::art::resolver::ArtResolver`], which owns the shared
//! rate limiter.

use super::{adapter, dto, MusicBrainzError, ReleaseCandidate, ReleaseDetails};

/// User agent string - MusicBrainz requires this
const USER_AGENT: &str = concat!(
    "Musicshelf/",
    env!("CARGO_PKG_VERSION"),
    " (personal music library)"
);

/// MusicBrainz + Cover Art Archive API client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    base_url: String,
    caa_base_url: String,
}

impl MusicBrainzClient {
    /// Create a new client
    pub fn new() -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            base_url: "https://musicbrainz.org/ws/2".to_string(),
            caa_base_url: "https://coverartarchive.org".to_string(),
        }
    }

    /// Create a client for testing with custom base URLs
    #[cfg(test)]
    pub fn with_base_urls(base_url: impl Into<String>, caa_base_url: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            base_url: base_url.into(),
            caa_base_url: caa_base_url.into(),
        }
    }

    /// Search for releases matching an album title and artist.
    ///
    /// Returns up to 10 candidates in the service's relevance order.
    pub async fn search_releases(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Vec<ReleaseCandidate>, MusicBrainzError> {
        let query = format!("release:\"{}\" AND artist:\"{}\"", title, artist);
        let url = format!("{}/release", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("query", query.as_str()), ("fmt", "json"), ("limit", "10")])
            .send()
            .await
            .map_err(|e| MusicBrainzError::Network(e.to_string()))?;

        let body = self.check_status(response).await?;
        let parsed: dto::SearchResponse =
            serde_json::from_str(&body).map_err(|e| MusicBrainzError::Parse(e.to_string()))?;

        Ok(parsed.releases.iter().map(adapter::to_candidate).collect())
    }

    /// Fetch full release details for pre-populating the album form.
    pub async fn get_release(&self, mbid: &str) -> Result<ReleaseDetails, MusicBrainzError> {
        let url = format!("{}/release/{}", self.base_url, mbid);

        let response = self
            .http_client
            .get(&url)
            .query(&[("inc", "recordings+artist-credits+labels"), ("fmt", "json")])
            .send()
            .await
            .map_err(|e| MusicBrainzError::Network(e.to_string()))?;

        let body = self.check_status(response).await?;
        let parsed: dto::Release =
            serde_json::from_str(&body).map_err(|e| MusicBrainzError::Parse(e.to_string()))?;

        Ok(adapter::to_details(&parsed))
    }

    /// Download the front cover art from the Cover Art Archive.
    ///
    /// Returns `Ok(None)` on 404 - the archive simply has no art for this
    /// release, which is a normal outcome, not an error.
    pub async fn front_cover(&self, mbid: &str) -> Result<Option<Vec<u8>>, MusicBrainzError> {
        let url = format!("{}/release/{}/front", self.caa_base_url, mbid);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| MusicBrainzError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(MusicBrainzError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MusicBrainzError::Network(e.to_string()))?;

        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(bytes.to_vec()))
    }

    /// Map non-success statuses to typed errors and return the body text.
    async fn check_status(&self, response: reqwest::Response) -> Result<String, MusicBrainzError> {
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MusicBrainzError::NotFound);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MusicBrainzError::RateLimited);
        }
        if !status.is_success() {
            // Try to parse the structured error response
            if let Ok(body) = response.text().await
                && let Ok(error) = serde_json::from_str::<dto::ApiError>(&body)
            {
                return Err(MusicBrainzError::Api(error.error));
            }
            return Err(MusicBrainzError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .text()
            .await
            .map_err(|e| MusicBrainzError::Network(e.to_string()))
    }
}

impl Default for MusicBrainzClient {
    fn default() -> Self {
        Self::new()
    }
}
