//! Unsplash image search for goal artwork.
//!
//! Image lookups are decoration: every failure (no key, network error,
//! non-2xx, unexpected body, zero results) is logged and returns `None`.
//!
//! See: <https://unsplash.com/documentation#search-photos>

use std::time::Duration;

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{HuginnError, Result};

pub const UNSPLASH_BASE_URL: &str = "https://api.unsplash.com";

/// Environment variable read by [`ImageSearchClient::from_env`] by default.
pub const DEFAULT_ACCESS_KEY_ENV: &str = "UNSPLASH_ACCESS_KEY";

const IMAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// A photo picked for a goal, with the attribution Unsplash requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalImage {
    pub url: String,
    pub thumb_url: String,
    pub alt: String,
    pub photographer: String,
    pub photographer_url: String,
}

#[derive(Clone)]
enum AccessKey {
    Static(String),
    Env(String),
}

impl AccessKey {
    fn resolve(&self) -> Option<String> {
        let raw = match self {
            AccessKey::Static(key) => key.clone(),
            AccessKey::Env(var) => std::env::var(var).ok()?,
        };
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Client for the Unsplash photo search endpoint.
#[derive(Clone)]
pub struct ImageSearchClient {
    http: Client,
    base_url: String,
    key: AccessKey,
}

impl ImageSearchClient {
    /// Client with a fixed access key.
    pub fn new(access_key: impl Into<String>) -> Result<Self> {
        Self::with_key(AccessKey::Static(access_key.into()))
    }

    /// Client that reads its access key from `var` on every search.
    pub fn from_env(var: impl Into<String>) -> Result<Self> {
        Self::with_key(AccessKey::Env(var.into()))
    }

    fn with_key(key: AccessKey) -> Result<Self> {
        let http = Client::builder()
            .timeout(IMAGE_TIMEOUT)
            .user_agent(crate::version::user_agent())
            .build()
            .map_err(|e| HuginnError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: UNSPLASH_BASE_URL.to_string(),
            key,
        })
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Whether an access key is available right now.
    pub fn is_configured(&self) -> bool {
        self.key.resolve().is_some()
    }

    /// Best landscape photo for `query`, if any.
    pub async fn search(&self, query: &str) -> Option<GoalImage> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        let Some(key) = self.key.resolve() else {
            debug!("no image search key configured");
            return None;
        };

        let url = format!("{}/search/photos", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Client-ID {key}"))
            .header("Accept-Version", "v1")
            .query(&[("query", query), ("per_page", "1"), ("orientation", "landscape")])
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "image search request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "image search failed");
            return None;
        }

        let body: SearchResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "unreadable image search response");
                return None;
            }
        };

        let image = body.results.into_iter().next().map(|photo| photo.into_image(query));
        if image.is_none() {
            debug!(query, "no images found");
        }
        image
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Deserialize)]
struct Photo {
    urls: PhotoUrls,
    #[serde(default)]
    alt_description: Option<String>,
    #[serde(default)]
    description: Option<String>,
    user: Photographer,
}

#[derive(Deserialize)]
struct PhotoUrls {
    regular: String,
    #[serde(default)]
    small: Option<String>,
    #[serde(default)]
    thumb: Option<String>,
}

#[derive(Deserialize)]
struct Photographer {
    name: String,
    links: PhotographerLinks,
}

#[derive(Deserialize)]
struct PhotographerLinks {
    html: String,
}

impl Photo {
    fn into_image(self, query: &str) -> GoalImage {
        let thumb_url = self
            .urls
            .small
            .or(self.urls.thumb)
            .unwrap_or_else(|| self.urls.regular.clone());
        let alt = self
            .alt_description
            .or(self.description)
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| query.to_string());
        GoalImage {
            url: self.urls.regular,
            thumb_url,
            alt,
            photographer: self.user.name,
            photographer_url: self.user.links.html,
        }
    }
}
