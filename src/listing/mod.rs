//! URL listing: one request to an image service yields the whole workload.
//!
//! - [`UrlLister`] - async trait the benchmark driver depends on
//! - [`PicsumLister`] - Lorem Picsum style `/v2/list` endpoint
//! - [`SyntheticLister`] - placeholder URLs for offline, simulated runs

mod error;

pub use error::ListError;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use crate::fetch::HttpTimeouts;
use crate::user_agent;

/// Default listing service.
pub const DEFAULT_LISTING_BASE_URL: &str = "https://picsum.photos";

/// Produces the ordered URLs of one benchmark workload.
#[async_trait]
pub trait UrlLister: Send + Sync {
    /// Returns exactly `count` image URLs.
    ///
    /// # Errors
    ///
    /// Returns [`ListError`] when the listing cannot be obtained or holds
    /// fewer than `count` entries. No retry is attempted.
    async fn list_urls(&self, count: usize) -> Result<Vec<String>, ListError>;
}

/// Pixel size requested for derived image URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// One entry of the listing response. Extra fields are ignored.
#[derive(Debug, Deserialize)]
struct ListingEntry {
    id: String,
    download_url: String,
}

/// Lister for the Lorem Picsum `/v2/list` endpoint.
///
/// With an [`ImageSize`] configured, image URLs are derived as
/// `{base}/id/{id}/{width}/{height}`; otherwise each entry's
/// `download_url` is used as is.
#[derive(Debug, Clone)]
pub struct PicsumLister {
    client: Client,
    base_url: Url,
    image_size: Option<ImageSize>,
}

impl PicsumLister {
    /// Creates a lister for `base_url` with the given request timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::InvalidBaseUrl`] for an unparsable base URL and
    /// [`ListError::Client`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, ListError> {
        let mut parsed =
            Url::parse(base_url).map_err(|e| ListError::invalid_base_url(base_url, e))?;
        // Url::join replaces the last path segment unless the path ends in '/'.
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(ListError::Client)?;

        Ok(Self {
            client,
            base_url: parsed,
            image_size: None,
        })
    }

    /// Derives fixed-size image URLs from entry ids.
    #[must_use]
    pub fn with_image_size(mut self, size: ImageSize) -> Self {
        self.image_size = Some(size);
        self
    }

    /// Listing request URL for `count` entries.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::InvalidBaseUrl`] if the base cannot be joined.
    pub fn listing_url(&self, count: usize) -> Result<Url, ListError> {
        let mut url = self
            .base_url
            .join("v2/list")
            .map_err(|e| ListError::invalid_base_url(self.base_url.as_str(), e))?;
        url.query_pairs_mut()
            .append_pair("page", "1")
            .append_pair("limit", &count.to_string());
        Ok(url)
    }

    fn image_url(&self, entry: ListingEntry) -> Result<String, ListError> {
        let Some(size) = self.image_size else {
            return Ok(entry.download_url);
        };
        let relative = format!("id/{}/{}/{}", entry.id, size.width, size.height);
        self.base_url
            .join(&relative)
            .map(String::from)
            .map_err(|e| ListError::invalid_base_url(self.base_url.as_str(), e))
    }
}

#[async_trait]
impl UrlLister for PicsumLister {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn list_urls(&self, count: usize) -> Result<Vec<String>, ListError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let listing_url = self.listing_url(count)?;
        let url = listing_url.as_str();
        debug!(%url, "requesting image listing");

        let response = self
            .client
            .get(listing_url.clone())
            .send()
            .await
            .map_err(|e| ListError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ListError::http_status(url, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ListError::network(url, e))?;
        let entries: Vec<ListingEntry> =
            serde_json::from_slice(&body).map_err(|e| ListError::parse(url, e))?;

        if entries.len() < count {
            return Err(ListError::ShortListing {
                requested: count,
                received: entries.len(),
            });
        }

        let urls = entries
            .into_iter()
            .take(count)
            .map(|entry| self.image_url(entry))
            .collect::<Result<Vec<_>, _>>()?;

        info!(count = urls.len(), "image listing received");
        Ok(urls)
    }
}

/// Lister that invents `sim://image/{n}` URLs without any request.
///
/// Pairs with [`SimulatedFetcher`](crate::fetch::SimulatedFetcher), which
/// never dereferences its URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticLister;

#[async_trait]
impl UrlLister for SyntheticLister {
    async fn list_urls(&self, count: usize) -> Result<Vec<String>, ListError> {
        Ok((0..count).map(|n| format!("sim://image/{n}")).collect())
    }
}
