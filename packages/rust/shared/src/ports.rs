//! Capability ports consumed by the research pipeline.
//!
//! Each port is an object-safe async trait so adapters can be swapped for
//! stubs in tests. The pipeline only ever holds `Arc<dyn Port>` handles.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::{CapabilityError, Result};
use crate::types::{MarketReport, RecordId, Storefront};

// ---------------------------------------------------------------------------
// Inference
// ---------------------------------------------------------------------------

/// Which pipeline task an inference call serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    DiscoverCompetitors,
    SynthesizeReviews,
    AnalyzePage,
    BuildChartData,
    Summarize,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DiscoverCompetitors => "discover_competitors",
            Self::SynthesizeReviews => "synthesize_reviews",
            Self::AnalyzePage => "analyze_page",
            Self::BuildChartData => "build_chart_data",
            Self::Summarize => "summarize",
        }
    }
}

/// One prompt pair plus generation limits.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub task: TaskKind,
    pub system_prompt: String,
    pub user_prompt: String,
    /// Hard cap on generated tokens.
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Shape the model is asked to produce for structured calls.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputContract {
    pub name: &'static str,
    /// JSON Schema describing the expected object.
    pub schema: Value,
}

/// LLM inference with structured or free-text output.
#[async_trait]
pub trait InferencePort: Send + Sync {
    /// Generate a JSON value intended to satisfy `contract`.
    ///
    /// The value is not validated here; callers run it through their own
    /// contract before use.
    async fn generate_structured(
        &self,
        request: &InferenceRequest,
        contract: &OutputContract,
    ) -> std::result::Result<Value, CapabilityError>;

    /// Generate free-form text.
    async fn generate_text(
        &self,
        request: &InferenceRequest,
    ) -> std::result::Result<String, CapabilityError>;

    /// Model identifier, for logs.
    fn model(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Fetch / search / lookup
// ---------------------------------------------------------------------------

/// Raw page content returned by a [`PageFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL after redirects.
    pub url: Url,
    pub status_code: u16,
    pub content: String,
}

/// Raw HTML/content retrieval with a bounded timeout.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &Url) -> std::result::Result<FetchedPage, CapabilityError>;
}

/// Candidate URL discovery for a free-text query.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Ordered, deduplicated result URLs (small, bounded count).
    async fn search_web(&self, query: &str) -> std::result::Result<Vec<Url>, CapabilityError>;
}

/// Storefront identity resolution.
#[async_trait]
pub trait StoreLookup: Send + Sync {
    /// Listing URL for `name` on `store`, if one is found.
    ///
    /// The returned URL is unvalidated; callers check domain membership.
    async fn lookup_store_listing(
        &self,
        name: &str,
        store: Storefront,
    ) -> std::result::Result<Option<String>, CapabilityError>;
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Terminal sink for finished reports, invoked once per run.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn persist(&self, report: &MarketReport) -> Result<RecordId>;
}

pub type SharedInference = Arc<dyn InferencePort>;
pub type SharedFetcher = Arc<dyn PageFetcher>;
pub type SharedSearch = Arc<dyn WebSearch>;
pub type SharedStores = Arc<dyn StoreLookup>;
pub type SharedSink = Arc<dyn ReportSink>;
