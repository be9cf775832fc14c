//! Narrative summarization.

use tracing::{info, instrument, warn};

use marketscope_shared::{CompetitorSet, PageInsight, ReviewBundle, TrendSnapshot};

use crate::capabilities::Capabilities;
use crate::prompts;
use crate::steps::StepOutcome;

/// Write the market summary. Empty output fails the step.
#[instrument(skip_all)]
pub async fn summarize(
    caps: &Capabilities,
    query: &str,
    competitors: &CompetitorSet,
    reviews: &[ReviewBundle],
    trends: &TrendSnapshot,
    insights: &[PageInsight],
) -> StepOutcome<Option<String>> {
    let request = prompts::summary_request(query, competitors, reviews, trends, insights);
    match caps.inference.generate_text(&request).await {
        Ok(text) if !text.trim().is_empty() => {
            info!(chars = text.chars().count(), "narrative ready");
            StepOutcome::succeeded(Some(text.trim().to_string()))
        }
        Ok(_) => {
            warn!("narrative came back empty");
            StepOutcome::failed(None, "Summarization returned no text")
        }
        Err(e) => {
            warn!(error = %e, "narrative failed");
            StepOutcome::failed(None, format!("Summarization failed: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedInference, TestPorts};
    use marketscope_shared::{StepStatus, TaskKind};

    async fn run(inference: ScriptedInference) -> StepOutcome<Option<String>> {
        let ports = TestPorts::new(inference);
        summarize(
            &ports.capabilities(),
            "music streaming",
            &CompetitorSet::placeholders(),
            &[],
            &TrendSnapshot::new("music streaming", "US"),
            &[],
        )
        .await
    }

    #[tokio::test]
    async fn text_is_trimmed() {
        let outcome = run(ScriptedInference::new().text(TaskKind::Summarize, "\n## Overall Summary\nGrowing.\n")).await;
        assert_eq!(outcome.value.as_deref(), Some("## Overall Summary\nGrowing."));
        assert_eq!(outcome.status, StepStatus::Succeeded);
    }

    #[tokio::test]
    async fn blank_text_is_a_hard_failure() {
        let outcome = run(ScriptedInference::new().text(TaskKind::Summarize, "   ")).await;
        assert_eq!(outcome.value, None);
        assert_eq!(
            outcome.status,
            StepStatus::Failed {
                reason: "Summarization returned no text".into()
            }
        );
    }
}
