//! End-to-end research run: query → gather → derive → synthesize → report.
//!
//! The dependency graph is fixed:
//!
//! 1. Competitor, trend and URL discovery run concurrently
//! 2. Review synthesis (needs competitors) and webpage insights (need URLs)
//! 3. Chart data and narrative (need reviews, trends and insights)
//! 4. Aggregation and persistence
//!
//! Every step runs in its own task under a `step` span. A step that fails or
//! panics only fills its own slot with a safe default; the only error a run
//! returns is a persistence failure (or invalid input, before any port call).

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{Instrument, error, info, info_span, instrument};

use marketscope_shared::{
    ChartDataset, MarketReport, PageInsight, PipelineConfig, Query, RecordId, Result, SharedSink,
    StepKind, StepLedger, StepRecord, ThreadId, TrendSnapshot,
};

use crate::aggregator::{self, GatheredResearch};
use crate::capabilities::Capabilities;
use crate::steps::competitors::{self, CompetitorDiscovery};
use crate::steps::{StepOutcome, chart, insights, reviews, summary, trends, urls};

// ---------------------------------------------------------------------------
// Run state & progress
// ---------------------------------------------------------------------------

/// Phases of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Started,
    GatheringPrimary,
    GatheringDerived,
    Synthesizing,
    Aggregating,
    Completed,
}

impl RunPhase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Started => "Starting research run",
            Self::GatheringPrimary => "Discovering competitors, trends and sources",
            Self::GatheringDerived => "Synthesizing reviews and analyzing pages",
            Self::Synthesizing => "Building chart data and summary",
            Self::Aggregating => "Saving report",
            Self::Completed => "Done",
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Identifier assigned by the report sink.
    pub record_id: RecordId,
    pub report: MarketReport,
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, phase: RunPhase);
    /// Called as each step's ledger record is written.
    fn step_finished(&self, record: &StepRecord);
    /// Called when the run completes.
    fn done(&self, outcome: &RunOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _phase: RunPhase) {}
    fn step_finished(&self, _record: &StepRecord) {}
    fn done(&self, _outcome: &RunOutcome) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The research orchestrator.
pub struct Pipeline {
    caps: Capabilities,
    sink: SharedSink,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(caps: Capabilities, sink: SharedSink, config: PipelineConfig) -> Self {
        Self { caps, sink, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline for one query.
    ///
    /// `thread_id` defaults to a fresh UUID v7. Blank query text or a blank
    /// thread id fails before any capability is called.
    #[instrument(skip_all, fields(thread_id = tracing::field::Empty))]
    pub async fn run(
        &self,
        text: &str,
        thread_id: Option<&str>,
        user_id: Option<String>,
        progress: &dyn ProgressReporter,
    ) -> Result<RunOutcome> {
        let start = Instant::now();
        let thread_id = match thread_id {
            Some(raw) => ThreadId::parse(raw)?,
            None => ThreadId::new(),
        };
        let query = Query::new(text, thread_id, user_id)?;
        tracing::Span::current().record("thread_id", query.thread_id.as_str());

        info!(query = %query.text, "starting research run");
        progress.phase(RunPhase::Started);

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut ledger = StepLedger::default();
        let tid = &query.thread_id;

        // --- Phase 1: Primary gathering ---
        progress.phase(RunPhase::GatheringPrimary);
        let fallback_kind = competitors::heuristic_kind(&query.text);
        let country = self.config.trends_country.clone();
        let ((found, competitor_rec), (trend_snapshot, trend_rec), (source_urls, url_rec)) = tokio::join!(
            run_step(
                StepKind::CompetitorDiscovery,
                tid,
                progress,
                |reason| CompetitorDiscovery {
                    competitors: marketscope_shared::CompetitorSet::placeholders(),
                    kind: fallback_kind,
                    error: Some(format!("Analysis failed: {reason}")),
                },
                {
                    let caps = self.caps.clone();
                    let text = query.text.clone();
                    async move { competitors::discover_competitors(&caps, &text).await }
                },
            ),
            run_step(
                StepKind::TrendDiscovery,
                tid,
                progress,
                {
                    let keyword = query.text.clone();
                    let country = country.clone();
                    move |reason| {
                        let mut snapshot = TrendSnapshot::new(keyword, country);
                        snapshot.record_error(reason);
                        snapshot
                    }
                },
                {
                    let caps = self.caps.clone();
                    let keyword = query.text.clone();
                    async move { trends::discover_trends(&caps, &keyword, &country).await }
                },
            ),
            run_step(
                StepKind::UrlDiscovery,
                tid,
                progress,
                |_| Vec::new(),
                {
                    let caps = self.caps.clone();
                    let text = query.text.clone();
                    async move { urls::discover_urls(&caps, &text).await }
                },
            ),
        );
        ledger.record(competitor_rec);
        ledger.record(trend_rec);
        ledger.record(url_rec);

        // --- Phase 2: Derived gathering ---
        progress.phase(RunPhase::GatheringDerived);
        let ((review_bundles, review_rec), (page_insights, insight_rec)) = tokio::join!(
            run_step(
                StepKind::ReviewSynthesis,
                tid,
                progress,
                |_| Vec::new(),
                {
                    let caps = self.caps.clone();
                    let set = found.competitors.clone();
                    let sem = semaphore.clone();
                    async move { reviews::synthesize_all(&caps, &set, sem).await }
                },
            ),
            run_step(
                StepKind::WebpageInsights,
                tid,
                progress,
                |reason| {
                    source_urls
                        .iter()
                        .map(|u| PageInsight::failed(u.as_str(), reason))
                        .collect()
                },
                {
                    let caps = self.caps.clone();
                    let text = query.text.clone();
                    let list = source_urls.clone();
                    let config = self.config.clone();
                    let sem = semaphore.clone();
                    async move { insights::analyze_pages(&caps, &text, &list, &config, sem).await }
                },
            ),
        );
        ledger.record(review_rec);
        ledger.record(insight_rec);

        // --- Phase 3: Synthesis ---
        progress.phase(RunPhase::Synthesizing);
        let ((chart_data, chart_rec), (narrative, summary_rec)) = tokio::join!(
            run_step(
                StepKind::ChartData,
                tid,
                progress,
                |reason| ChartDataset::empty_with_error(reason),
                {
                    let caps = self.caps.clone();
                    let text = query.text.clone();
                    let set = found.competitors.clone();
                    let bundles = review_bundles.clone();
                    let snapshot = trend_snapshot.clone();
                    let pages = page_insights.clone();
                    async move {
                        chart::build_chart_data(&caps, &text, &set, &bundles, &snapshot, &pages).await
                    }
                },
            ),
            run_step(
                StepKind::Narrative,
                tid,
                progress,
                |_| None,
                {
                    let caps = self.caps.clone();
                    let text = query.text.clone();
                    let set = found.competitors.clone();
                    let bundles = review_bundles.clone();
                    let snapshot = trend_snapshot.clone();
                    let pages = page_insights.clone();
                    async move {
                        summary::summarize(&caps, &text, &set, &bundles, &snapshot, &pages).await
                    }
                },
            ),
        );
        ledger.record(chart_rec);
        ledger.record(summary_rec);

        // --- Phase 4: Aggregation ---
        progress.phase(RunPhase::Aggregating);
        let degraded = ledger.degraded_count();
        let report = aggregator::assemble(
            query,
            GatheredResearch {
                competitors: found,
                reviews: review_bundles,
                trends: trend_snapshot,
                source_urls,
                insights: page_insights,
                chart: chart_data,
                summary: narrative,
            },
            ledger,
        );

        let record_id = self
            .sink
            .persist(&report)
            .await
            .inspect_err(|e| error!(error = %e, "persisting report failed"))?;

        let outcome = RunOutcome {
            record_id,
            report,
            elapsed: start.elapsed(),
        };

        progress.phase(RunPhase::Completed);
        progress.done(&outcome);

        info!(
            %record_id,
            degraded_steps = degraded,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "research run complete"
        );

        Ok(outcome)
    }
}

/// Run one step in its own task, converting a panic into a failed record
/// holding `fallback(reason)`.
async fn run_step<T, F>(
    step: StepKind,
    thread_id: &ThreadId,
    progress: &dyn ProgressReporter,
    fallback: impl FnOnce(&str) -> T,
    work: F,
) -> (T, StepRecord)
where
    T: Send + 'static,
    F: Future<Output = StepOutcome<T>> + Send + 'static,
{
    let started = Instant::now();
    let span = info_span!("step", step = step.as_str(), thread_id = %thread_id);

    let outcome = match tokio::spawn(work.instrument(span)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(%step, error = %e, "step task panicked");
            let reason = format!("step task panicked: {e}");
            StepOutcome::failed(fallback(&reason), reason)
        }
    };

    let (value, record) = outcome.into_record(step, started.elapsed().as_millis() as u64);
    progress.step_finished(&record);
    (value, record)
}
