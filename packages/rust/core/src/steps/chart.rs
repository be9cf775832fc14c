//! Chart-data synthesis.

use tracing::{info, instrument, warn};

use marketscope_shared::drafts::ChartDraft;
use marketscope_shared::{
    ChartDataset, CompetitorSet, PageInsight, ReviewBundle, TrendSnapshot, Validated, validate_json,
};

use crate::capabilities::Capabilities;
use crate::prompts;
use crate::steps::StepOutcome;

/// Build the bar-chart rows and feature-gap matrix. On any failure the
/// dataset is empty and carries the error.
#[instrument(skip_all)]
pub async fn build_chart_data(
    caps: &Capabilities,
    query: &str,
    competitors: &CompetitorSet,
    reviews: &[ReviewBundle],
    trends: &TrendSnapshot,
    insights: &[PageInsight],
) -> StepOutcome<ChartDataset> {
    let request = prompts::chart_request(query, competitors, reviews, trends, insights);
    let raw = match caps
        .inference
        .generate_structured(&request, &prompts::chart_contract())
        .await
    {
        Ok(raw) => raw,
        Err(e) => return empty(format!("Chart data generation failed: {e}")),
    };

    match validate_json::<ChartDraft>(raw) {
        Validated::Valid(chart) => {
            info!(
                bars = chart.bar_chart.len(),
                features = chart.gap_matrix.len(),
                "chart data ready"
            );
            StepOutcome::succeeded(chart)
        }
        Validated::Invalid(violations) => {
            let detail: Vec<String> = violations.iter().map(ToString::to_string).collect();
            empty(format!("Chart data failed validation: {}", detail.join("; ")))
        }
    }
}

fn empty(error: String) -> StepOutcome<ChartDataset> {
    warn!(error = %error, "chart data degraded to empty dataset");
    StepOutcome::failed(ChartDataset::empty_with_error(error.clone()), error)
}
