use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};
use url::Url;

use super::types::{ApiResponse, Artwork};
use super::{Page, PageFetcher};
use crate::config::ApiSettings;
use crate::error::FetchError;

/// Page fetcher backed by the artwork collection HTTP API.
///
/// Issues `GET <base_url>?page=P` and decodes the `{ data, pagination }`
/// envelope. One shared reqwest client with the configured user agent and
/// per-request timeout.
pub struct ArticHttpClient {
    client: reqwest::Client,
    base_url: Url,
    page_size: usize,
}

impl ArticHttpClient {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let base_url = Url::parse(&settings.base_url)
            .with_context(|| format!("Invalid api.base_url '{}'", settings.base_url))?;

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            page_size: settings.page_size,
        })
    }

    /// URL for the given 1-based page index.
    pub fn page_url(&self, page_index: usize) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("page", &page_index.to_string());
        url
    }
}

#[async_trait]
impl PageFetcher for ArticHttpClient {
    type Record = Artwork;

    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn fetch(&self, page_index: usize) -> Result<Page<Artwork>, FetchError> {
        if page_index == 0 {
            return Err(FetchError::InvalidPage(page_index));
        }

        let url = self.page_url(page_index);
        info!("Fetching page {}: {}", page_index, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(page_index, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                "HTTP {} {} for page {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                page_index
            );
            return Err(FetchError::Status {
                page: page_index,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify(page_index, e))?;

        decode_page(page_index, &body, self.page_size)
    }
}

/// Decode a listing response body into a page.
///
/// `fallback_page_size` is used when the server omits `pagination.limit`.
pub fn decode_page(
    page_index: usize,
    body: &[u8],
    fallback_page_size: usize,
) -> Result<Page<Artwork>, FetchError> {
    let envelope: ApiResponse<Artwork> =
        serde_json::from_slice(body).map_err(|e| FetchError::Malformed {
            page: page_index,
            message: e.to_string(),
        })?;

    let pagination = envelope.pagination;
    if pagination.current_page != 0 && pagination.current_page != page_index {
        warn!(
            "Requested page {} but server reported current_page {}",
            page_index, pagination.current_page
        );
    }
    debug!(
        "Page {} decoded: {} records, total {}, {} pages",
        page_index,
        envelope.data.len(),
        pagination.total,
        pagination.total_pages
    );

    let page_size = if pagination.limit > 0 {
        pagination.limit
    } else {
        fallback_page_size
    };

    Ok(Page {
        index: page_index,
        page_size,
        total_records: pagination.total,
        records: envelope.data,
        fetched_at: Utc::now(),
    })
}

fn classify(page_index: usize, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout { page: page_index }
    } else if err.is_decode() {
        FetchError::Malformed {
            page: page_index,
            message: err.to_string(),
        }
    } else {
        FetchError::Network {
            page: page_index,
            message: err.to_string(),
        }
    }
}
