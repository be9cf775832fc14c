//! Core domain types for MarketScope research runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{MarketScopeError, Result};

/// Current schema version for the persisted report format.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Number of competitors every discovery run produces.
pub const COMPETITOR_COUNT: usize = 3;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Correlation identifier shared by every step of one run.
///
/// Callers may supply their own (any non-blank string); generated ids are
/// UUID v7 so they sort by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    /// Generate a new time-sortable thread identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Accept a caller-supplied identifier, rejecting blank input.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MarketScopeError::validation("thread id must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A UUID v7 wrapper for persisted report identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Generate a new time-sortable record identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// The natural-language request that starts a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Raw query text, trimmed.
    pub text: String,
    /// Correlation id used for tracing and persistence.
    pub thread_id: ThreadId,
    /// Optional owner of the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Query {
    /// Build a query, failing fast on blank text.
    pub fn new(text: &str, thread_id: ThreadId, user_id: Option<String>) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MarketScopeError::validation("query text must not be empty"));
        }
        let user_id = user_id
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        Ok(Self {
            text: text.to_string(),
            thread_id,
            user_id,
        })
    }
}

/// What kind of business a query is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Competitors are apps with storefront listings.
    StorefrontApp,
    /// Competitors are physical or local businesses.
    LocalBusiness,
}

impl QueryKind {
    /// Map a model-provided label onto a kind.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "app" | "apps" | "storefront_app" | "mobile_app" => Some(Self::StorefrontApp),
            "local_business" | "business" | "local" => Some(Self::LocalBusiness),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Storefronts & competitors
// ---------------------------------------------------------------------------

/// An app storefront a competitor may be listed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Storefront {
    AppStore,
    GooglePlay,
}

impl Storefront {
    pub const ALL: [Storefront; 2] = [Storefront::AppStore, Storefront::GooglePlay];

    /// Human-readable name used in prompts and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AppStore => "App Store",
            Self::GooglePlay => "Google Play",
        }
    }

    /// Whether `url` belongs to this storefront's domain.
    pub fn owns(&self, url: &Url) -> bool {
        if url.scheme() != "https" && url.scheme() != "http" {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        match self {
            Self::AppStore => host == "apple.com" || host.ends_with(".apple.com"),
            Self::GooglePlay => host == "play.google.com",
        }
    }
}

/// A competing product or business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    /// Display name, never empty.
    pub name: String,
    /// App Store listing, only when it is on an Apple domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_store_url: Option<Url>,
    /// Google Play listing, only when it is on play.google.com.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_play_url: Option<Url>,
}

impl Competitor {
    /// A competitor with no storefront listings.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            app_store_url: None,
            google_play_url: None,
        }
    }

    /// The `Unknown N` filler used when discovery comes up short.
    pub fn placeholder(n: usize) -> Self {
        Self::named(format!("Unknown {n}"))
    }

    /// Whether this is an `Unknown N` filler entry.
    pub fn is_placeholder(&self) -> bool {
        self.app_store_url.is_none()
            && self.google_play_url.is_none()
            && self
                .name
                .strip_prefix("Unknown ")
                .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    }

    /// Listing URL for the given storefront, if any.
    pub fn listing(&self, store: Storefront) -> Option<&Url> {
        match store {
            Storefront::AppStore => self.app_store_url.as_ref(),
            Storefront::GooglePlay => self.google_play_url.as_ref(),
        }
    }

    /// Storefronts this competitor is listed on.
    pub fn listed_on(&self) -> Vec<Storefront> {
        Storefront::ALL
            .into_iter()
            .filter(|s| self.listing(*s).is_some())
            .collect()
    }

    /// Drop both storefront links.
    pub fn without_listings(self) -> Self {
        Self::named(self.name)
    }
}

/// Exactly three competitors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompetitorSet([Competitor; COMPETITOR_COUNT]);

impl CompetitorSet {
    /// Take the first three entries and pad the rest with `Unknown N`.
    pub fn padded(found: Vec<Competitor>) -> Self {
        let mut iter = found.into_iter();
        let mut filler = 0;
        let mut next = || {
            iter.next().unwrap_or_else(|| {
                filler += 1;
                Competitor::placeholder(filler)
            })
        };
        Self([next(), next(), next()])
    }

    /// `Unknown 1`, `Unknown 2`, `Unknown 3`.
    pub fn placeholders() -> Self {
        Self::padded(Vec::new())
    }

    pub fn as_slice(&self) -> &[Competitor] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Competitor> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|c| c.name.as_str()).collect()
    }

    /// Apply `f` to each entry, keeping the count fixed.
    pub fn map(self, f: impl FnMut(Competitor) -> Competitor) -> Self {
        Self(self.0.map(f))
    }
}

impl From<[Competitor; COMPETITOR_COUNT]> for CompetitorSet {
    fn from(value: [Competitor; COMPETITOR_COUNT]) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

/// One synthesized storefront review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Star rating, 1 to 5.
    pub rating: u8,
    pub text: String,
}

/// Synthesized reviews for one competitor, split by storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewBundle {
    pub competitor_name: String,
    #[serde(default)]
    pub app_store: Vec<Review>,
    #[serde(default)]
    pub google_play: Vec<Review>,
}

impl ReviewBundle {
    pub fn reviews(&self, store: Storefront) -> &[Review] {
        match store {
            Storefront::AppStore => &self.app_store,
            Storefront::GooglePlay => &self.google_play,
        }
    }

    /// Mean rating across both storefronts.
    pub fn average_rating(&self) -> Option<f64> {
        let all: Vec<u8> = self
            .app_store
            .iter()
            .chain(self.google_play.iter())
            .map(|r| r.rating)
            .collect();
        if all.is_empty() {
            return None;
        }
        let sum: u32 = all.iter().map(|r| u32::from(*r)).sum();
        Some(f64::from(sum) / all.len() as f64)
    }

    pub fn review_count(&self) -> usize {
        self.app_store.len() + self.google_play.len()
    }
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

/// Related search queries for a keyword, plus a non-fatal diagnostic log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub keyword: String,
    pub country: String,
    #[serde(default)]
    pub top: Vec<String>,
    #[serde(default)]
    pub rising: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl TrendSnapshot {
    pub fn new(keyword: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            country: country.into(),
            top: Vec::new(),
            rising: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Add a top query unless an identical string is already present.
    pub fn add_top(&mut self, query: impl Into<String>) {
        push_unique(&mut self.top, query.into());
    }

    /// Add a rising query unless an identical string is already present.
    pub fn add_rising(&mut self, query: impl Into<String>) {
        push_unique(&mut self.rising, query.into());
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.rising.is_empty()
    }
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

// ---------------------------------------------------------------------------
// Page insights
// ---------------------------------------------------------------------------

/// Relevance of a page to the original query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relevance {
    #[serde(rename = "Highly relevant")]
    HighlyRelevant,
    #[serde(rename = "Partially relevant")]
    PartiallyRelevant,
    #[serde(rename = "Not relevant")]
    NotRelevant,
}

impl Relevance {
    pub fn label(&self) -> &'static str {
        match self {
            Self::HighlyRelevant => "Highly relevant",
            Self::PartiallyRelevant => "Partially relevant",
            Self::NotRelevant => "Not relevant",
        }
    }

    /// Read the classification at the start of a relevance field.
    pub fn classify(text: &str) -> Option<Self> {
        let lowered = text
            .trim_start_matches(|c: char| c.is_whitespace() || c == '*' || c == '"')
            .to_lowercase();
        [Self::HighlyRelevant, Self::PartiallyRelevant, Self::NotRelevant]
            .into_iter()
            .find(|r| lowered.starts_with(&r.label().to_lowercase()))
    }
}

/// Outcome of analyzing one discovered web page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInsight {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub success: bool,
    /// Leading excerpt of the extracted text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_level: Option<Relevance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageInsight {
    /// A failed insight carrying only the URL and a diagnostic.
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            success: false,
            content: None,
            summary: None,
            insight: None,
            relevance: None,
            relevance_level: None,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Chart data
// ---------------------------------------------------------------------------

/// How strongly the market lacks a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnmetNeed {
    High,
    Medium,
    Low,
}

/// Whether a competitor offers a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupportStatus {
    Yes,
    No,
    Unknown,
}

impl std::str::FromStr for UnmetNeed {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for SupportStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            "unknown" => Ok(Self::Unknown),
            _ => Err(()),
        }
    }
}

/// One bar in the competitor comparison chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChartRow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u32>,
    /// 0 to 5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Percentage, 0 to 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_share: Option<f64>,
}

/// One feature row of the gap matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapMatrixRow {
    pub feature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unmet_need: Option<UnmetNeed>,
    #[serde(default)]
    pub competitor_status: BTreeMap<String, SupportStatus>,
}

/// Chart-ready data derived from the gathered research.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    #[serde(default)]
    pub bar_chart: Vec<BarChartRow>,
    #[serde(default)]
    pub gap_matrix: Vec<GapMatrixRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_metric: Option<String>,
    /// Set when this dataset is the empty fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChartDataset {
    /// Empty but well-formed dataset explaining why it is empty.
    pub fn empty_with_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Step ledger
// ---------------------------------------------------------------------------

/// Every step the pipeline schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    CompetitorDiscovery,
    TrendDiscovery,
    UrlDiscovery,
    ReviewSynthesis,
    WebpageInsights,
    ChartData,
    Narrative,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompetitorDiscovery => "competitor_discovery",
            Self::TrendDiscovery => "trend_discovery",
            Self::UrlDiscovery => "url_discovery",
            Self::ReviewSynthesis => "review_synthesis",
            Self::WebpageInsights => "webpage_insights",
            Self::ChartData => "chart_data",
            Self::Narrative => "narrative",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of one step slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StepStatus {
    /// Produced its output without fallbacks.
    Succeeded,
    /// Produced output, but some of it is a fallback value.
    Degraded,
    /// Produced nothing usable; the slot holds the safe default.
    Failed { reason: String },
    /// Had no input to work on.
    Skipped { reason: String },
}

impl StepStatus {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Skipped { .. })
    }
}

/// Ledger entry for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: StepKind,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
    pub elapsed_ms: u64,
}

/// Per-step success/failure record of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepLedger(Vec<StepRecord>);

impl StepLedger {
    pub fn record(&mut self, record: StepRecord) {
        self.0.push(record);
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.0
    }

    pub fn get(&self, step: StepKind) -> Option<&StepRecord> {
        self.0.iter().find(|r| r.step == step)
    }

    /// Steps that ended degraded or failed.
    pub fn degraded_count(&self) -> usize {
        self.0.iter().filter(|r| !r.status.is_clean()).count()
    }
}

// ---------------------------------------------------------------------------
// MarketReport
// ---------------------------------------------------------------------------

/// The terminal aggregate of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketReport {
    pub schema_version: u32,
    pub query: Query,
    pub competitors: CompetitorSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor_error: Option<String>,
    #[serde(default)]
    pub reviews: Vec<ReviewBundle>,
    pub trends: TrendSnapshot,
    #[serde(default)]
    pub source_urls: Vec<Url>,
    #[serde(default)]
    pub insights: Vec<PageInsight>,
    pub chart: ChartDataset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub ledger: StepLedger,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_roundtrip() {
        let id = RecordId::new();
        let s = id.to_string();
        let parsed: RecordId = s.parse().expect("parse RecordId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn thread_id_rejects_blank() {
        assert!(ThreadId::parse("   ").is_err());
        assert_eq!(ThreadId::parse(" t-1 ").expect("parse").as_str(), "t-1");
    }

    #[test]
    fn query_rejects_blank_text() {
        let err = Query::new("  ", ThreadId::new(), None).unwrap_err();
        assert!(err.to_string().contains("query text"));

        let q = Query::new(" app for notes ", ThreadId::new(), Some(" ".into())).expect("query");
        assert_eq!(q.text, "app for notes");
        assert_eq!(q.user_id, None);
    }

    #[test]
    fn competitor_set_pads_with_numbered_placeholders() {
        let set = CompetitorSet::padded(vec![Competitor::named("A"), Competitor::named("B")]);
        assert_eq!(set.names(), vec!["A", "B", "Unknown 1"]);

        let set = CompetitorSet::placeholders();
        assert_eq!(set.names(), vec!["Unknown 1", "Unknown 2", "Unknown 3"]);
        assert!(set.iter().all(Competitor::is_placeholder));
        assert!(!Competitor::named("Unknown Mortal Orchestra").is_placeholder());
    }

    #[test]
    fn competitor_set_truncates_extra_entries() {
        let found = ["A", "B", "C", "D"].map(Competitor::named).to_vec();
        let set = CompetitorSet::padded(found);
        assert_eq!(set.names(), vec!["A", "B", "C"]);
    }

    #[test]
    fn competitor_set_serializes_as_array() {
        let json = serde_json::to_value(CompetitorSet::placeholders()).expect("serialize");
        assert_eq!(json.as_array().map(Vec::len), Some(3));
        let back: CompetitorSet = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, CompetitorSet::placeholders());
    }

    #[test]
    fn storefront_domains() {
        let apple = Url::parse("https://apps.apple.com/us/app/spotify/id324684580").unwrap();
        let play = Url::parse("https://play.google.com/store/apps/details?id=com.spotify.music")
            .unwrap();
        let fake = Url::parse("https://apple.com.evil.example/app").unwrap();

        assert!(Storefront::AppStore.owns(&apple));
        assert!(!Storefront::AppStore.owns(&play));
        assert!(!Storefront::AppStore.owns(&fake));
        assert!(Storefront::GooglePlay.owns(&play));
        assert!(!Storefront::GooglePlay.owns(&apple));
    }

    #[test]
    fn trend_snapshot_dedupes_exact_strings() {
        let mut snap = TrendSnapshot::new("music", "US");
        snap.add_top("spotify");
        snap.add_top("spotify");
        snap.add_top("Spotify");
        snap.add_rising("tidal");
        assert_eq!(snap.top, vec!["spotify", "Spotify"]);
        assert_eq!(snap.rising, vec!["tidal"]);
        assert!(!snap.is_empty());
    }

    #[test]
    fn relevance_classification() {
        assert_eq!(
            Relevance::classify("Highly relevant - covers pricing"),
            Some(Relevance::HighlyRelevant)
        );
        assert_eq!(
            Relevance::classify(" **not relevant** at all"),
            Some(Relevance::NotRelevant)
        );
        assert_eq!(Relevance::classify("somewhat"), None);
    }

    #[test]
    fn review_bundle_average() {
        let bundle = ReviewBundle {
            competitor_name: "A".into(),
            app_store: vec![Review { rating: 5, text: "great".into() }],
            google_play: vec![Review { rating: 2, text: "meh".into() }],
        };
        assert_eq!(bundle.average_rating(), Some(3.5));
        assert_eq!(bundle.review_count(), 2);
    }

    #[test]
    fn closed_enums_parse_case_insensitively() {
        assert_eq!("yes".parse::<SupportStatus>(), Ok(SupportStatus::Yes));
        assert_eq!(" Unknown ".parse::<SupportStatus>(), Ok(SupportStatus::Unknown));
        assert_eq!("HIGH".parse::<UnmetNeed>(), Ok(UnmetNeed::High));
        assert!("maybe".parse::<SupportStatus>().is_err());
    }

    #[test]
    fn query_kind_labels() {
        assert_eq!(QueryKind::from_label("App"), Some(QueryKind::StorefrontApp));
        assert_eq!(
            QueryKind::from_label("local business"),
            Some(QueryKind::LocalBusiness)
        );
        assert_eq!(QueryKind::from_label("other"), None);
    }
}
