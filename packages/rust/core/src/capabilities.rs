//! The bundle of ports a pipeline run depends on.

use std::sync::Arc;

use marketscope_crawler::ExtractorChain;
use marketscope_shared::{SharedFetcher, SharedInference, SharedSearch, SharedStores};

/// Injected external capabilities. Cheap to clone; every field is an `Arc`.
#[derive(Clone)]
pub struct Capabilities {
    pub inference: SharedInference,
    pub fetcher: SharedFetcher,
    pub search: SharedSearch,
    pub stores: SharedStores,
    pub extractors: Arc<ExtractorChain>,
}

impl Capabilities {
    /// Bundle ports with the default readable/body-text extractor chain.
    pub fn new(
        inference: SharedInference,
        fetcher: SharedFetcher,
        search: SharedSearch,
        stores: SharedStores,
    ) -> Self {
        Self {
            inference,
            fetcher,
            search,
            stores,
            extractors: Arc::new(ExtractorChain::default()),
        }
    }

    /// Replace the extractor chain.
    pub fn with_extractors(mut self, extractors: ExtractorChain) -> Self {
        self.extractors = Arc::new(extractors);
        self
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("model", &self.inference.model())
            .field("primary_extractor", &self.extractors.primary().name())
            .field("secondary_extractor", &self.extractors.secondary().name())
            .finish_non_exhaustive()
    }
}
