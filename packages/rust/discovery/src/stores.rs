//! Storefront listing lookup (App Store, Google Play).
//!
//! Each lookup returns the first listing whose title contains the competitor
//! name, or `None`. The pipeline re-validates the returned URL's domain, so
//! this module only ever proposes candidates.

use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use marketscope_shared::{
    CapabilityError, MarketScopeError, Result, StoreLookup, Storefront, StoresConfig,
};

use crate::{build_client, check_status};

/// Listing URLs must start with this to be accepted from the iTunes API.
const APP_STORE_PREFIX: &str = "https://apps.apple.com/";

/// Number of iTunes results inspected per lookup.
const APP_STORE_LIMIT: &str = "5";

// ---------------------------------------------------------------------------
// iTunes Search API payload
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ItunesResponse {
    #[serde(default)]
    results: Vec<ItunesResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItunesResult {
    track_view_url: Option<String>,
    track_name: Option<String>,
}

// ---------------------------------------------------------------------------
// StoreDirectory
// ---------------------------------------------------------------------------

/// HTTP-backed storefront lookup.
pub struct StoreDirectory {
    client: Client,
    app_store_endpoint: Url,
    google_play_endpoint: Url,
}

impl StoreDirectory {
    /// Create a directory against the configured endpoints.
    pub fn new(config: &StoresConfig) -> Result<Self> {
        let parse = |raw: &str| {
            Url::parse(raw).map_err(|e| MarketScopeError::config(format!("invalid store endpoint {raw}: {e}")))
        };
        Ok(Self {
            client: build_client()?,
            app_store_endpoint: parse(&config.app_store_endpoint)?,
            google_play_endpoint: parse(&config.google_play_endpoint)?,
        })
    }

    async fn find_app_store(&self, name: &str) -> std::result::Result<Option<String>, CapabilityError> {
        let mut url = self.app_store_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("term", name)
            .append_pair("entity", "software")
            .append_pair("limit", APP_STORE_LIMIT);

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| CapabilityError::from_transport(url.as_str(), &e))?;
        let response = check_status(&url, response)?;

        let payload: ItunesResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Malformed(format!("{url}: invalid iTunes payload: {e}")))?;

        debug!(results = payload.results.len(), "iTunes results received");
        Ok(best_app_store_match(&payload.results, name))
    }

    async fn find_google_play(&self, name: &str) -> std::result::Result<Option<String>, CapabilityError> {
        let mut url = self.google_play_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", name)
            .append_pair("c", "apps")
            .append_pair("hl", "en");

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

        Ok(parse_google_play_results(&html, name))
    }
}

#[async_trait]
impl StoreLookup for StoreDirectory {
    #[instrument(skip_all, fields(name = %name, store = store.label()))]
    async fn lookup_store_listing(
        &self,
        name: &str,
        store: Storefront,
    ) -> std::result::Result<Option<String>, CapabilityError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let found = match store {
            Storefront::AppStore => self.find_app_store(name).await?,
            Storefront::GooglePlay => self.find_google_play(name).await?,
        };

        debug!(found = found.is_some(), "store lookup finished");
        Ok(found)
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

fn best_app_store_match(results: &[ItunesResult], name: &str) -> Option<String> {
    let needle = name.to_lowercase();
    results
        .iter()
        .filter(|r| {
            r.track_view_url
                .as_deref()
                .is_some_and(|u| u.starts_with(APP_STORE_PREFIX))
        })
        .find(|r| {
            r.track_name
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(&needle))
        })
        .and_then(|r| r.track_view_url.clone())
}

/// First app card on a Play search page whose title contains `name`,
/// rendered as a canonical details URL.
pub fn parse_google_play_results(html: &str, name: &str) -> Option<String> {
    static APP_LINK_SEL: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(r#"a[href*="/store/apps/details?id="]"#).expect("valid selector")
    });
    static TITLED_DIV_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div[title]").expect("valid selector"));
    static DIV_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div").expect("valid selector"));
    static PLAY_BASE: LazyLock<Url> =
        LazyLock::new(|| Url::parse("https://play.google.com/").expect("valid url"));

    let needle = name.to_lowercase();
    let doc = Html::parse_document(html);

    for link in doc.select(&APP_LINK_SEL) {
        let title = link
            .select(&TITLED_DIV_SEL)
            .next()
            .and_then(|d| d.value().attr("title").map(str::to_string))
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                link.select(&DIV_SEL)
                    .map(|d| d.text().collect::<String>().trim().to_string())
                    .find(|t| !t.is_empty())
            })
            .unwrap_or_default();

        if !title.to_lowercase().contains(&needle) {
            continue;
        }

        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(package) = PLAY_BASE
            .join(href)
            .ok()
            .and_then(|u| u.query_pairs().find(|(k, _)| k == "id").map(|(_, v)| v.into_owned()))
            .filter(|p| !p.is_empty())
        else {
            continue;
        };

        let mut canonical = PLAY_BASE.join("/store/apps/details").ok()?;
        canonical
            .query_pairs_mut()
            .append_pair("id", &package)
            .append_pair("hl", "en");
        return Some(canonical.to_string());
    }

    None
}
