//! Search result page parser.
//!
//! Pulls outbound result links from an HTML results page:
//! - Redirect wrappers (`/url?q=…`, `/l/?uddg=…`) are unwrapped to their target
//! - Only `http`/`https` links survive
//! - Search engines (including the one queried) and account/shop/utility paths are dropped
//! - Results are deduplicated in page order and capped

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

/// Hosts that never count as results (matched as the host or a parent domain).
const EXCLUDED_HOSTS: &[&str] = &[
    "google.com",
    "googleusercontent.com",
    "bing.com",
    "microsoft.com",
    "duckduckgo.com",
    "yahoo.com",
];

/// Path fragments of authentication, commerce, and search pages.
const EXCLUDED_PATHS: &[&str] = &["/signup", "/login", "/shop", "/product", "/cart", "/search"];

/// Extract up to `max_results` distinct result URLs from a results page.
///
/// Relative links are resolved against `page_url`; its host is treated as the
/// engine's own domain and excluded.
pub fn parse_result_links(html: &str, page_url: &Url, max_results: usize) -> Vec<Url> {
    static LINK_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

    let doc = Html::parse_document(html);
    let engine_host = page_url.host_str().map(str::to_lowercase);

    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for link in doc.select(&LINK_SEL) {
        if results.len() >= max_results {
            break;
        }
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = page_url.join(href.trim()) else {
            continue;
        };
        let Some(mut target) = unwrap_redirect(resolved) else {
            continue;
        };
        target.set_fragment(None);

        if !is_result_candidate(&target, engine_host.as_deref()) {
            continue;
        }
        if seen.insert(target.as_str().to_string()) {
            results.push(target);
        }
    }

    results
}

/// Replace a redirect wrapper with its target; other links pass through.
fn unwrap_redirect(url: Url) -> Option<Url> {
    let param = match url.path() {
        "/url" => "q",
        "/l/" | "/l" => "uddg",
        _ => return Some(url),
    };

    url.query_pairs()
        .find(|(k, _)| k == param)
        .and_then(|(_, v)| Url::parse(&v).ok())
}

fn is_result_candidate(url: &Url, engine_host: Option<&str>) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = url.host_str().map(str::to_lowercase) else {
        return false;
    };

    let on_domain = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));
    if engine_host.is_some_and(|engine| on_domain(engine)) {
        return false;
    }
    if EXCLUDED_HOSTS.iter().any(|d| on_domain(*d)) {
        return false;
    }

    let path = url.path().to_lowercase();
    !EXCLUDED_PATHS.iter().any(|p| path.contains(p))
}
