//! Trend discovery from the related-queries widgets of a trends explore page.

use tracing::{info, instrument, warn};

use marketscope_crawler::{EXPLORE_ENDPOINT, explore_url, parse_related_queries};
use marketscope_shared::TrendSnapshot;

use crate::capabilities::Capabilities;
use crate::steps::StepOutcome;

/// Collect related queries for `keyword`. Always returns a snapshot; every
/// problem lands in its error log.
#[instrument(skip_all, fields(keyword = %keyword, country = %country))]
pub async fn discover_trends(caps: &Capabilities, keyword: &str, country: &str) -> StepOutcome<TrendSnapshot> {
    let mut snapshot = TrendSnapshot::new(keyword, country);

    let url = match explore_url(EXPLORE_ENDPOINT, keyword, country) {
        Ok(url) => url,
        Err(e) => {
            snapshot.record_error(format!("Could not build trends URL: {e}"));
            return finish(snapshot);
        }
    };

    let page = match caps.fetcher.fetch_page(&url).await {
        Ok(page) => page,
        Err(e) => {
            snapshot.record_error(format!("Trends page unreachable: {e}"));
            return finish(snapshot);
        }
    };

    let related = parse_related_queries(&page.content);

    if let Some(notice) = &related.no_data_notice {
        snapshot.record_error(format!("Trends reported no data: {notice}"));
    }

    if related.widgets.is_empty() {
        snapshot.record_error("Could not find 'Related queries' widgets");
        return finish(snapshot);
    }

    for (i, widget) in related.widgets.iter().enumerate() {
        if widget.is_empty() {
            snapshot.record_error(format!("Related queries widget {} had no items", i + 1));
            continue;
        }
        for query in &widget.top {
            snapshot.add_top(query.as_str());
        }
        for query in &widget.rising {
            snapshot.add_rising(query.as_str());
        }
    }

    finish(snapshot)
}

fn finish(snapshot: TrendSnapshot) -> StepOutcome<TrendSnapshot> {
    if !snapshot.errors.is_empty() {
        warn!(errors = ?snapshot.errors, "trend discovery degraded");
    }
    info!(top = snapshot.top.len(), rising = snapshot.rising.len(), "trend discovery complete");
    let diagnostics = snapshot.errors.clone();
    StepOutcome::from_diagnostics(snapshot, diagnostics)
}
