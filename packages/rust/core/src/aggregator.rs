//! Fan-in: assemble step outputs into the terminal [`MarketReport`].

use chrono::Utc;
use url::Url;

use marketscope_shared::{
    ChartDataset, MarketReport, PageInsight, Query, REPORT_SCHEMA_VERSION, ReviewBundle,
    StepLedger, TrendSnapshot,
};

use crate::steps::competitors::CompetitorDiscovery;

/// Everything the steps produced for one run.
#[derive(Debug, Clone)]
pub struct GatheredResearch {
    pub competitors: CompetitorDiscovery,
    pub reviews: Vec<ReviewBundle>,
    pub trends: TrendSnapshot,
    pub source_urls: Vec<Url>,
    pub insights: Vec<PageInsight>,
    pub chart: ChartDataset,
    pub summary: Option<String>,
}

/// Build the immutable report for a run.
pub fn assemble(query: Query, research: GatheredResearch, ledger: StepLedger) -> MarketReport {
    let GatheredResearch {
        competitors,
        reviews,
        trends,
        source_urls,
        insights,
        chart,
        summary,
    } = research;

    MarketReport {
        schema_version: REPORT_SCHEMA_VERSION,
        query,
        competitors: competitors.competitors,
        competitor_error: competitors.error,
        reviews,
        trends,
        source_urls,
        insights,
        chart,
        summary,
        ledger,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketscope_shared::{
        CompetitorSet, QueryKind, StepKind, StepRecord, StepStatus, ThreadId,
    };

    #[test]
    fn report_carries_every_slot() {
        let query = Query::new("app for notes", ThreadId::new(), Some("u1".into())).unwrap();
        let mut ledger = StepLedger::default();
        ledger.record(StepRecord {
            step: StepKind::Narrative,
            status: StepStatus::Failed {
                reason: "empty".into(),
            },
            diagnostics: vec!["empty".into()],
            elapsed_ms: 3,
        });

        let research = GatheredResearch {
            competitors: CompetitorDiscovery {
                competitors: CompetitorSet::placeholders(),
                kind: QueryKind::StorefrontApp,
                error: Some("Analysis failed: offline".into()),
            },
            reviews: Vec::new(),
            trends: TrendSnapshot::new("app for notes", "US"),
            source_urls: vec![Url::parse("https://notes.example/").unwrap()],
            insights: vec![PageInsight::failed("https://notes.example/", "Scraping failed: 503")],
            chart: ChartDataset::empty_with_error("offline"),
            summary: None,
        };

        let report = assemble(query.clone(), research, ledger);
        assert_eq!(report.schema_version, REPORT_SCHEMA_VERSION);
        assert_eq!(report.query, query);
        assert_eq!(report.competitor_error.as_deref(), Some("Analysis failed: offline"));
        assert_eq!(report.source_urls.len(), 1);
        assert_eq!(report.insights.len(), 1);
        assert_eq!(report.summary, None);
        assert_eq!(report.ledger.degraded_count(), 1);
    }
}
