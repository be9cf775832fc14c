//! Competitor discovery: inference, search fallback, storefront resolution.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use marketscope_shared::drafts::{CompetitorDiscoveryDraft, DiscoveredCompetitors, listing_url};
use marketscope_shared::{
    COMPETITOR_COUNT, CapabilityError, Competitor, CompetitorSet, QueryKind, Storefront,
    Validated, validate, validate_json,
};

use crate::capabilities::Capabilities;
use crate::prompts;
use crate::steps::StepOutcome;

/// Result of competitor discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitorDiscovery {
    pub competitors: CompetitorSet,
    pub kind: QueryKind,
    /// Set when the competitors are placeholders standing in for a failure.
    pub error: Option<String>,
}

/// Leading phrases removed before searching for candidate names.
const SEARCH_PREFIXES: &[&str] = &["app for", "apps for", "restaurant for", "restaurants for"];

/// Classify a query without the model's help.
pub fn heuristic_kind(query: &str) -> QueryKind {
    static APP_WORD: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)\b(apps?|application)\b").expect("valid regex"));
    if APP_WORD.is_match(query) {
        QueryKind::StorefrontApp
    } else {
        QueryKind::LocalBusiness
    }
}

/// Discover exactly three competitors for `query`.
#[instrument(skip_all, fields(query = %query))]
pub async fn discover_competitors(caps: &Capabilities, query: &str) -> StepOutcome<CompetitorDiscovery> {
    let fallback_kind = heuristic_kind(query);

    let raw = match caps
        .inference
        .generate_structured(&prompts::competitor_request(query), &prompts::competitor_contract())
        .await
    {
        Ok(raw) => raw,
        Err(e) => return placeholders(fallback_kind, format!("Analysis failed: {e}")),
    };

    let DiscoveredCompetitors { kind, competitors } =
        match validate_json::<CompetitorDiscoveryDraft>(raw) {
            Validated::Valid(found) => found,
            Validated::Invalid(violations) => {
                let detail: Vec<String> = violations.iter().map(ToString::to_string).collect();
                return placeholders(
                    fallback_kind,
                    format!("Failed to construct valid response: {}", detail.join("; ")),
                );
            }
        };

    let kind = kind.unwrap_or(fallback_kind);
    let mut diagnostics = Vec::new();

    let set = if competitors.len() == COMPETITOR_COUNT {
        match validate(competitors) {
            Validated::Valid(set) => set,
            Validated::Invalid(_) => return placeholders(kind, "Failed to construct valid response"),
        }
    } else {
        warn!(
            found = competitors.len(),
            expected = COMPETITOR_COUNT,
            "unexpected competitor count, falling back to web search"
        );
        diagnostics.push(format!(
            "inference returned {} competitors, expected {COMPETITOR_COUNT}; used web search",
            competitors.len()
        ));
        search_fallback(caps, query, &mut diagnostics).await
    };

    let set = match kind {
        QueryKind::StorefrontApp => match resolve_listings(caps, set, &mut diagnostics).await {
            Ok(set) => set,
            Err(e) => return placeholders(kind, format!("Analysis failed: {e}")),
        },
        QueryKind::LocalBusiness => set.map(Competitor::without_listings),
    };

    info!(competitors = ?set.names(), ?kind, "competitor discovery complete");
    StepOutcome::from_diagnostics(
        CompetitorDiscovery {
            competitors: set,
            kind,
            error: None,
        },
        diagnostics,
    )
}

fn placeholders(kind: QueryKind, error: impl Into<String>) -> StepOutcome<CompetitorDiscovery> {
    let error = error.into();
    warn!(error = %error, "competitor discovery degraded to placeholders");
    StepOutcome::failed(
        CompetitorDiscovery {
            competitors: CompetitorSet::placeholders(),
            kind,
            error: Some(error.clone()),
        },
        error,
    )
}

// ---------------------------------------------------------------------------
// Search fallback
// ---------------------------------------------------------------------------

async fn search_fallback(caps: &Capabilities, query: &str, diagnostics: &mut Vec<String>) -> CompetitorSet {
    let search_query = strip_search_prefixes(query);
    match caps.search.search_web(&search_query).await {
        Ok(urls) => {
            let names = names_from_urls(&urls);
            debug!(?names, "candidate names from search");
            CompetitorSet::padded(names.into_iter().map(Competitor::named).collect())
        }
        Err(e) => {
            warn!(error = %e, "search fallback failed");
            diagnostics.push(format!("search fallback failed: {e}"));
            CompetitorSet::placeholders()
        }
    }
}

/// Lowercase the query and drop phrases like "app for".
pub fn strip_search_prefixes(query: &str) -> String {
    let mut text = query.to_lowercase();
    for prefix in SEARCH_PREFIXES {
        if let Some(pos) = text.find(prefix) {
            text.replace_range(pos..pos + prefix.len(), "");
            break;
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Candidate names from result hosts: `www.pocketcasts.com` becomes `Pocketcasts`.
pub fn names_from_urls(urls: &[Url]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for url in urls {
        let Some(host) = url.host_str() else {
            continue;
        };
        let host = host.strip_prefix("www.").unwrap_or(host);
        let Some(label) = host.split('.').next().filter(|l| !l.is_empty()) else {
            continue;
        };
        let name = capitalize(label);
        if !names.contains(&name) {
            names.push(name);
        }
        if names.len() == COMPETITOR_COUNT {
            break;
        }
    }
    names
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Storefront resolution
// ---------------------------------------------------------------------------

/// Look up both storefront listings for every competitor concurrently.
///
/// Lookup errors leave that listing empty. A panicked lookup task is an error.
async fn resolve_listings(
    caps: &Capabilities,
    set: CompetitorSet,
    diagnostics: &mut Vec<String>,
) -> Result<CompetitorSet, tokio::task::JoinError> {
    let mut handles = Vec::with_capacity(COMPETITOR_COUNT);
    for competitor in set.iter().cloned() {
        let stores = caps.stores.clone();
        handles.push(tokio::spawn(async move {
            if competitor.is_placeholder() {
                return (competitor, Vec::new());
            }
            let (app_store, google_play) = tokio::join!(
                stores.lookup_store_listing(&competitor.name, Storefront::AppStore),
                stores.lookup_store_listing(&competitor.name, Storefront::GooglePlay),
            );
            let mut notes = Vec::new();
            let resolved = Competitor {
                app_store_url: accept_listing(&competitor.name, Storefront::AppStore, app_store, &mut notes),
                google_play_url: accept_listing(
                    &competitor.name,
                    Storefront::GooglePlay,
                    google_play,
                    &mut notes,
                ),
                name: competitor.name,
            };
            (resolved, notes)
        }));
    }

    let mut resolved = Vec::with_capacity(COMPETITOR_COUNT);
    for result in futures::future::join_all(handles).await {
        let (competitor, notes) = result?;
        diagnostics.extend(notes);
        resolved.push(competitor);
    }
    Ok(CompetitorSet::padded(resolved))
}

fn accept_listing(
    name: &str,
    store: Storefront,
    found: Result<Option<String>, CapabilityError>,
    notes: &mut Vec<String>,
) -> Option<Url> {
    match found {
        Ok(raw) => listing_url(raw.as_deref(), store),
        Err(e) => {
            warn!(name, store = store.label(), error = %e, "store lookup failed");
            notes.push(format!("{} lookup for {name} failed: {e}", store.label()));
            None
        }
    }
}
