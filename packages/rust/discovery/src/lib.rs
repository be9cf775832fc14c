//! Web search and storefront discovery.
//!
//! This crate provides:
//! - [`SearchClient`], the [`WebSearch`] adapter: queries an HTML results page and
//!   returns filtered, deduplicated result URLs
//! - [`StoreDirectory`], the [`StoreLookup`](marketscope_shared::StoreLookup) adapter
//!   for App Store and Google Play listings

mod parser;
mod stores;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, info, instrument};
use url::Url;

use marketscope_shared::{CapabilityError, MarketScopeError, Result, SearchConfig, WebSearch};

pub use parser::parse_result_links;
pub use stores::{StoreDirectory, parse_google_play_results};

/// Maximum number of redirects to follow for search and store requests.
const MAX_REDIRECTS: usize = 3;

/// Timeout in seconds for search and store requests.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User-Agent string for discovery requests.
const USER_AGENT: &str = concat!("MarketScope/", env!("CARGO_PKG_VERSION"));

/// Body fragments of interstitial bot-check pages.
const BLOCK_MARKERS: &[&str] = &["unusual traffic", "anomaly-modal", "g-recaptcha"];

// ---------------------------------------------------------------------------
// SearchClient
// ---------------------------------------------------------------------------

/// HTML results-page search client.
pub struct SearchClient {
    client: Client,
    endpoint: Url,
    max_results: usize,
}

impl SearchClient {
    /// Create a client for the configured endpoint.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            MarketScopeError::config(format!("invalid search endpoint {}: {e}", config.endpoint))
        })?;

        Ok(Self {
            client: build_client()?,
            endpoint,
            max_results: config.max_results,
        })
    }
}

#[async_trait]
impl WebSearch for SearchClient {
    #[instrument(skip_all, fields(query = %query))]
    async fn search_web(&self, query: &str) -> std::result::Result<Vec<Url>, CapabilityError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("q", query);

        debug!(%url, "querying search endpoint");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| CapabilityError::from_transport(url.as_str(), &e))?;
        let response = check_status(&url, response)?;

        let html = response
            .text()
            .await
            .map_err(|e| CapabilityError::Unreachable(format!("{url}: body read failed: {e}")))?;

        let lowered = html.to_lowercase();
        if let Some(marker) = BLOCK_MARKERS.iter().find(|m| lowered.contains(*m)) {
            return Err(CapabilityError::Blocked(format!("{url}: bot check ({marker})")));
        }

        let results = parse_result_links(&html, &url, self.max_results);
        info!(results = results.len(), "search complete");
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
pub(crate) fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .map_err(|e| MarketScopeError::Network(format!("failed to build HTTP client: {e}")))
}

/// Map block and error statuses to capability errors.
pub(crate) fn check_status(
    url: &Url,
    response: Response,
) -> std::result::Result<Response, CapabilityError> {
    let status = response.status();
    if matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) {
        return Err(CapabilityError::Blocked(format!("{url}: HTTP {status}")));
    }
    if !status.is_success() {
        return Err(CapabilityError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}
