//! HTTP page fetcher behind the [`PageFetcher`] port.
//!
//! Fetches a single URL with a bounded timeout and body size, refuses
//! private/internal targets on every redirect hop, and turns provider-side
//! block signals (403/429, captcha and challenge interstitials) into
//! [`CapabilityError::Blocked`].

use std::net::IpAddr;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use marketscope_shared::{CapabilityError, FetchConfig, FetchedPage, MarketScopeError, PageFetcher, Result};

/// User-Agent string for page requests.
pub const USER_AGENT: &str = concat!("MarketScope/", env!("CARGO_PKG_VERSION"));

/// Maximum response size we accept (10 MB).
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Body fragments that identify captcha and challenge interstitials.
const BLOCK_MARKERS: &[&str] = &[
    "unusual traffic from your computer",
    "g-recaptcha",
    "cf-challenge",
    "cf_chl_",
    "/cdn-cgi/challenge-platform",
    "please verify you are a human",
];

/// `<title>` fragments used by challenge platforms.
const CHALLENGE_TITLES: &[&str] = &[
    "just a moment",
    "attention required",
    "are you a robot",
    "verify you are human",
];

/// Pages with more visible text than this are real content, whatever widgets they embed.
const INTERSTITIAL_MAX_TEXT: usize = 1500;

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// reqwest-backed page fetcher.
pub struct HttpFetcher {
    client: Client,
    /// Allow loopback hosts (for integration tests with mock servers).
    allow_loopback: bool,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Create a fetcher with the configured timeout and redirect limit.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Self::build(config, false)
    }

    /// Fetcher that may reach loopback mock servers. Private and link-local
    /// addresses stay refused.
    #[cfg(test)]
    pub fn for_local_tests(config: &FetchConfig) -> Result<Self> {
        Self::build(config, true)
    }

    /// Override the body size cap.
    #[cfg(test)]
    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    fn build(config: &FetchConfig, allow_loopback: bool) -> Result<Self> {
        let max_redirects = config.max_redirects;
        let policy = Policy::custom(move |attempt| {
            if attempt.previous().len() > max_redirects {
                attempt.error(format!("too many redirects (max {max_redirects})"))
            } else if refuses(attempt.url(), allow_loopback) {
                let target = attempt.url().to_string();
                attempt.error(format!("redirect to private address {target}"))
            } else {
                attempt.follow()
            }
        });

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(policy)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MarketScopeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_loopback,
            max_body_bytes: MAX_RESPONSE_SIZE,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch_page(&self, url: &Url) -> std::result::Result<FetchedPage, CapabilityError> {
        if refuses(url, self.allow_loopback) {
            warn!(%url, "SSRF protection: blocked");
            return Err(CapabilityError::Unavailable(format!(
                "{url}: refusing to fetch private or non-HTTP address"
            )));
        }

        debug!(%url, "fetching page");

        let mut response = self.client.get(url.as_str()).send().await.map_err(|e| {
            if e.is_redirect() {
                warn!(%url, error = %e, "redirect refused");
                CapabilityError::Unavailable(format!("{url}: {e}"))
            } else {
                CapabilityError::from_transport(url.as_str(), &e)
            }
        })?;

        let status = response.status();
        let final_url = response.url().clone();

        if matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) {
            return Err(CapabilityError::Blocked(format!("{url}: HTTP {status}")));
        }
        if !status.is_success() {
            return Err(CapabilityError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let too_large = || {
            CapabilityError::Malformed(format!(
                "{url}: response too large (max {} bytes)",
                self.max_body_bytes
            ))
        };

        if let Some(len) = response.content_length() {
            if len > self.max_body_bytes as u64 {
                return Err(too_large());
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| CapabilityError::Unreachable(format!("{url}: body read failed: {e}")))?
        {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        let content = String::from_utf8_lossy(&body).into_owned();

        if let Some(marker) = block_marker(&content) {
            return Err(CapabilityError::Blocked(format!(
                "{url}: challenge page detected ({marker})"
            )));
        }

        debug!(%url, status = status.as_u16(), bytes = content.len(), "page fetched");

        Ok(FetchedPage {
            url: final_url,
            status_code: status.as_u16(),
            content,
        })
    }
}

/// Block signal in `body`, if the page is a challenge interstitial.
///
/// A challenge `<title>` always counts. Body markers only count on short
/// pages without `<article>`/`<main>` content, so a captcha widget on a
/// comment form does not hide a readable article.
fn block_marker(body: &str) -> Option<&'static str> {
    static TITLE_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("title").expect("valid selector"));
    static CONTENT_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("article, main").expect("valid selector"));
    static BODY_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("body").expect("valid selector"));

    let doc = Html::parse_document(body);

    let title = doc
        .select(&TITLE_SEL)
        .next()
        .map(|t| t.text().collect::<String>().to_lowercase())
        .unwrap_or_default();
    if let Some(marker) = CHALLENGE_TITLES.iter().copied().find(|m| title.contains(m)) {
        return Some(marker);
    }

    if doc.select(&CONTENT_SEL).next().is_some() {
        return None;
    }
    let text_len: usize = doc
        .select(&BODY_SEL)
        .next()
        .map(|b| b.text().map(|t| t.trim().chars().count()).sum())
        .unwrap_or(0);
    if text_len > INTERSTITIAL_MAX_TEXT {
        return None;
    }

    let lowered = body.to_lowercase();
    BLOCK_MARKERS.iter().copied().find(|m| lowered.contains(m))
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Whether `url` must not be fetched, given the loopback allowance.
fn refuses(url: &Url, allow_loopback: bool) -> bool {
    is_ssrf_target(url) && !(allow_loopback && is_loopback_host(url))
}

fn is_loopback_host(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Ipv4(v4)) => v4.is_loopback(),
        Some(url::Host::Ipv6(v6)) => v6.is_loopback(),
        Some(url::Host::Domain(host)) => host == "localhost",
        None => false,
    }
}

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    // Block non-HTTP schemes
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
                // 192.0.0.0/24
                || (v4.octets()[0] == 192 && v4.octets()[1] == 0 && v4.octets()[2] == 0)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}
