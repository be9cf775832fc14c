//! In-crate stub ports for step and pipeline tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scraper::Html;
use serde_json::Value;
use url::Url;

use marketscope_crawler::{BodyTextExtractor, ExtractedText, ExtractorChain, TextExtractor};
use marketscope_shared::{
    CapabilityError, FetchedPage, InferencePort, InferenceRequest, MarketReport, MarketScopeError,
    OutputContract, PageFetcher, RecordId, ReportSink, Result, StoreLookup, Storefront, TaskKind,
    WebSearch,
};

use crate::capabilities::Capabilities;

type Responder<T> = Box<dyn Fn(&InferenceRequest) -> std::result::Result<T, CapabilityError> + Send + Sync>;

// ---------------------------------------------------------------------------
// Inference
// ---------------------------------------------------------------------------

/// Inference port answering from per-task scripts. Unscripted tasks fail.
#[derive(Default)]
pub struct ScriptedInference {
    structured: HashMap<TaskKind, Responder<Value>>,
    text: HashMap<TaskKind, Responder<String>>,
    calls: Mutex<Vec<TaskKind>>,
}

impl ScriptedInference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn structured(self, task: TaskKind, value: Value) -> Self {
        self.structured_with(task, move |_| Ok(value.clone()))
    }

    pub fn structured_with(
        mut self,
        task: TaskKind,
        f: impl Fn(&InferenceRequest) -> std::result::Result<Value, CapabilityError> + Send + Sync + 'static,
    ) -> Self {
        self.structured.insert(task, Box::new(f));
        self
    }

    pub fn text(self, task: TaskKind, reply: &str) -> Self {
        let reply = reply.to_string();
        self.text_with(task, move |_| Ok(reply.clone()))
    }

    pub fn text_with(
        mut self,
        task: TaskKind,
        f: impl Fn(&InferenceRequest) -> std::result::Result<String, CapabilityError> + Send + Sync + 'static,
    ) -> Self {
        self.text.insert(task, Box::new(f));
        self
    }

    pub fn calls(&self, task: TaskKind) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|t| **t == task)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    fn unscripted(task: TaskKind) -> CapabilityError {
        CapabilityError::Unavailable(format!("no scripted reply for {}", task.as_str()))
    }
}

#[async_trait]
impl InferencePort for ScriptedInference {
    async fn generate_structured(
        &self,
        request: &InferenceRequest,
        _contract: &OutputContract,
    ) -> std::result::Result<Value, CapabilityError> {
        self.calls.lock().expect("calls lock").push(request.task);
        match self.structured.get(&request.task) {
            Some(f) => f(request),
            None => Err(Self::unscripted(request.task)),
        }
    }

    async fn generate_text(&self, request: &InferenceRequest) -> std::result::Result<String, CapabilityError> {
        self.calls.lock().expect("calls lock").push(request.task);
        match self.text.get(&request.task) {
            Some(f) => f(request),
            None => Err(Self::unscripted(request.task)),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// Fetch / search / stores
// ---------------------------------------------------------------------------

/// Fetcher serving pages from a URL-keyed map; unknown URLs are unreachable.
#[derive(Default)]
pub struct MapFetcher {
    pages: HashMap<String, std::result::Result<String, CapabilityError>>,
    calls: AtomicUsize,
}

#[async_trait]
impl PageFetcher for MapFetcher {
    async fn fetch_page(&self, url: &Url) -> std::result::Result<FetchedPage, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url.as_str()) {
            Some(Ok(content)) => Ok(FetchedPage {
                url: url.clone(),
                status_code: 200,
                content: content.clone(),
            }),
            Some(Err(e)) => Err(e.clone()),
            None => Err(CapabilityError::Unreachable(format!("{url}: no such page"))),
        }
    }
}

/// Search returning a fixed result list (or error) for every query.
pub struct FixedSearch {
    results: std::result::Result<Vec<Url>, CapabilityError>,
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl WebSearch for FixedSearch {
    async fn search_web(&self, query: &str) -> std::result::Result<Vec<Url>, CapabilityError> {
        self.queries.lock().expect("queries lock").push(query.to_string());
        self.results.clone()
    }
}

/// Store lookup backed by a `(name, store)` map.
#[derive(Default)]
pub struct FixedStores {
    listings: HashMap<(String, Storefront), String>,
    failing: Vec<Storefront>,
    panics: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl StoreLookup for FixedStores {
    async fn lookup_store_listing(
        &self,
        name: &str,
        store: Storefront,
    ) -> std::result::Result<Option<String>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("store lookup exploded");
        }
        if self.failing.contains(&store) {
            return Err(CapabilityError::Blocked(format!("{} rate limited", store.label())));
        }
        Ok(self.listings.get(&(name.to_string(), store)).cloned())
    }
}

/// Extractor returning the same text for every document.
pub struct FixedExtractor(pub &'static str);

impl TextExtractor for FixedExtractor {
    fn extract(&self, _doc: &Html) -> ExtractedText {
        ExtractedText {
            text: self.0.to_string(),
            title: None,
        }
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Sink keeping every persisted report in memory.
#[derive(Default)]
pub struct MemorySink {
    reports: Mutex<Vec<MarketReport>>,
}

impl MemorySink {
    pub fn reports(&self) -> Vec<MarketReport> {
        self.reports.lock().expect("reports lock").clone()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn persist(&self, report: &MarketReport) -> Result<RecordId> {
        self.reports.lock().expect("reports lock").push(report.clone());
        Ok(RecordId::new())
    }
}

/// Sink that always fails.
pub struct FailingSink;

#[async_trait]
impl ReportSink for FailingSink {
    async fn persist(&self, _report: &MarketReport) -> Result<RecordId> {
        Err(MarketScopeError::Storage("disk full".into()))
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder wiring stub ports into [`Capabilities`] while keeping handles
/// for assertions.
pub struct TestPorts {
    inference: Arc<ScriptedInference>,
    fetcher: Arc<MapFetcher>,
    search: Arc<FixedSearch>,
    stores: Arc<FixedStores>,
    primary_extractor: Option<&'static str>,
}

impl TestPorts {
    pub fn new(inference: ScriptedInference) -> Self {
        Self {
            inference: Arc::new(inference),
            fetcher: Arc::new(MapFetcher::default()),
            search: Arc::new(FixedSearch {
                results: Ok(Vec::new()),
                queries: Mutex::new(Vec::new()),
            }),
            stores: Arc::new(FixedStores::default()),
            primary_extractor: None,
        }
    }

    fn fetcher_mut(&mut self) -> &mut MapFetcher {
        Arc::get_mut(&mut self.fetcher).expect("builder owns fetcher")
    }

    fn stores_mut(&mut self) -> &mut FixedStores {
        Arc::get_mut(&mut self.stores).expect("builder owns stores")
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.fetcher_mut().pages.insert(url.to_string(), Ok(html.to_string()));
        self
    }

    pub fn broken_page(mut self, url: &str, error: CapabilityError) -> Self {
        self.fetcher_mut().pages.insert(url.to_string(), Err(error));
        self
    }

    pub fn search_results(mut self, urls: &[&str]) -> Self {
        let urls = urls.iter().map(|u| Url::parse(u).expect("test url")).collect();
        Arc::get_mut(&mut self.search).expect("builder owns search").results = Ok(urls);
        self
    }

    pub fn failing_search(mut self, error: CapabilityError) -> Self {
        Arc::get_mut(&mut self.search).expect("builder owns search").results = Err(error);
        self
    }

    pub fn listing(mut self, name: &str, store: Storefront, url: &str) -> Self {
        self.stores_mut()
            .listings
            .insert((name.to_string(), store), url.to_string());
        self
    }

    pub fn failing_store(mut self, store: Storefront) -> Self {
        self.stores_mut().failing.push(store);
        self
    }

    pub fn panicking_stores(mut self) -> Self {
        self.stores_mut().panics = true;
        self
    }

    /// Replace the readable extractor with one that always yields `text`.
    pub fn primary_extractor(mut self, text: &'static str) -> Self {
        self.primary_extractor = Some(text);
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        let caps = Capabilities::new(
            self.inference.clone(),
            self.fetcher.clone(),
            self.search.clone(),
            self.stores.clone(),
        );
        match self.primary_extractor {
            Some(text) => caps.with_extractors(ExtractorChain::new(
                Box::new(FixedExtractor(text)),
                Box::new(BodyTextExtractor),
            )),
            None => caps,
        }
    }

    pub fn inference(&self) -> &ScriptedInference {
        &self.inference
    }

    pub fn store_calls(&self) -> usize {
        self.stores.calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetcher.calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search.queries.lock().expect("queries lock").len()
    }

    pub fn last_search(&self) -> Option<String> {
        self.search.queries.lock().expect("queries lock").last().cloned()
    }
}
