//! URL discovery for webpage analysis.

use tracing::{info, instrument, warn};
use url::Url;

use crate::capabilities::Capabilities;
use crate::steps::StepOutcome;

/// Search for pages worth analyzing. A search error yields no URLs.
#[instrument(skip_all, fields(query = %query))]
pub async fn discover_urls(caps: &Capabilities, query: &str) -> StepOutcome<Vec<Url>> {
    match caps.search.search_web(query).await {
        Ok(urls) => {
            info!(urls = urls.len(), "url discovery complete");
            StepOutcome::succeeded(urls)
        }
        Err(e) => {
            warn!(error = %e, "url discovery failed");
            StepOutcome::failed(Vec::new(), format!("web search failed: {e}"))
        }
    }
}
