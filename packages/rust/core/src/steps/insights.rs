//! Webpage insight extraction: fetch, extract text, analyze, parse.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use scraper::Html;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

use marketscope_crawler::{ExtractedText, ExtractorChain, page_title};
use marketscope_markdown::{collapse_whitespace, truncate_chars};
use marketscope_shared::{PageInsight, PipelineConfig, Relevance, StepStatus};

use crate::capabilities::Capabilities;
use crate::prompts;
use crate::steps::StepOutcome;

/// Placeholder for a labeled section missing from the model's reply.
pub const PARSING_FAILED: &str = "Parsing failed.";

/// Excerpt kept on an insight whose analysis call failed.
const FAILED_EXCERPT_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// Labeled-section parsing
// ---------------------------------------------------------------------------

/// Summary / insight / relevance sections of an analysis reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSections {
    pub summary: String,
    pub insight: String,
    pub relevance: String,
}

/// Parse `Summary:`, `Insight:` and `Relevance:` sections in any order and
/// case. A missing or empty section becomes [`PARSING_FAILED`].
pub fn parse_sections(reply: &str) -> LabeledSections {
    static SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)summary:(.*?)(?:insight:|relevance:|\z)").expect("valid regex")
    });
    static INSIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)insight:(.*?)(?:summary:|relevance:|\z)").expect("valid regex")
    });
    static RELEVANCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)relevance:(.*?)(?:summary:|insight:|\z)").expect("valid regex")
    });

    let section = |re: &Regex| {
        re.captures(reply)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim_matches(|c: char| c.is_whitespace() || c == '*').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| PARSING_FAILED.to_string())
    };

    LabeledSections {
        summary: section(&SUMMARY_RE),
        insight: section(&INSIGHT_RE),
        relevance: section(&RELEVANCE_RE),
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Run the primary extractor, falling through to the secondary one when the
/// primary yields fewer than `primary_min_chars` characters.
pub fn extract_text(chain: &ExtractorChain, html: &str, primary_min_chars: usize) -> ExtractedText {
    let doc = Html::parse_document(html);
    let primary = chain.primary().extract(&doc);
    let title = primary.title.clone().or_else(|| page_title(&doc));

    if primary.char_count() >= primary_min_chars {
        return ExtractedText {
            text: primary.text,
            title,
        };
    }

    debug!(
        extractor = chain.primary().name(),
        chars = primary.char_count(),
        fallback = chain.secondary().name(),
        "primary extraction too short"
    );
    let secondary = chain.secondary().extract(&doc);
    ExtractedText {
        text: collapse_whitespace(&secondary.text),
        title: title.or(secondary.title),
    }
}

// ---------------------------------------------------------------------------
// Per-page analysis
// ---------------------------------------------------------------------------

/// Analyze one page. Never fails; problems produce a failed insight.
#[instrument(skip_all, fields(url = %url))]
pub async fn analyze_page(caps: &Capabilities, query: &str, url: &Url, config: &PipelineConfig) -> PageInsight {
    let page = match caps.fetcher.fetch_page(url).await {
        Ok(page) => page,
        Err(e) => {
            warn!(error = %e, "page fetch failed");
            return PageInsight::failed(url.as_str(), format!("Scraping failed: {e}"));
        }
    };

    let extracted = extract_text(&caps.extractors, &page.content, config.primary_min_chars);
    let title = extracted.title.clone();

    if extracted.char_count() < config.final_min_chars {
        warn!(chars = extracted.char_count(), "no significant text extracted");
        return PageInsight {
            title,
            ..PageInsight::failed(url.as_str(), "Extraction failed: no significant text content found")
        };
    }

    let excerpt = truncate_chars(&extracted.text, config.excerpt_chars);
    let request = prompts::insight_request(query, url.as_str(), title.as_deref(), &excerpt);

    let reply = match caps.inference.generate_text(&request).await {
        Ok(reply) if !reply.trim().is_empty() => reply,
        Ok(_) => return analysis_failed(url, title, &excerpt, "no response content"),
        Err(e) => return analysis_failed(url, title, &excerpt, &e.to_string()),
    };

    let sections = parse_sections(&reply);
    let relevance_level = Relevance::classify(&sections.relevance);
    if relevance_level.is_none() {
        debug!(relevance = %sections.relevance, "relevance outside the known levels");
    }

    debug!(chars = extracted.char_count(), "page analyzed");
    PageInsight {
        url: url.to_string(),
        title,
        success: true,
        content: Some(truncate_chars(&excerpt, config.stored_excerpt_chars)),
        summary: Some(sections.summary),
        insight: Some(sections.insight),
        relevance: Some(sections.relevance),
        relevance_level,
        error: None,
    }
}

fn analysis_failed(url: &Url, title: Option<String>, excerpt: &str, reason: &str) -> PageInsight {
    warn!(%url, reason, "page analysis failed");
    PageInsight {
        title,
        content: Some(truncate_chars(excerpt, FAILED_EXCERPT_CHARS)),
        ..PageInsight::failed(url.as_str(), format!("LLM analysis failed: {reason}"))
    }
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

/// Analyze every URL concurrently, bounded by `semaphore`.
///
/// Returns exactly one insight per URL, in input order.
#[instrument(skip_all, fields(urls = urls.len()))]
pub async fn analyze_pages(
    caps: &Capabilities,
    query: &str,
    urls: &[Url],
    config: &PipelineConfig,
    semaphore: Arc<Semaphore>,
) -> StepOutcome<Vec<PageInsight>> {
    if urls.is_empty() {
        return StepOutcome::skipped(Vec::new(), "no URLs to analyze");
    }

    let mut handles = Vec::with_capacity(urls.len());
    for url in urls.iter().cloned() {
        let caps = caps.clone();
        let query = query.to_string();
        let config = config.clone();
        let sem = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await;
            analyze_page(&caps, &query, &url, &config).await
        }));
    }

    let mut insights = Vec::with_capacity(urls.len());
    for (url, result) in urls.iter().zip(futures::future::join_all(handles).await) {
        insights.push(result.unwrap_or_else(|e| {
            PageInsight::failed(url.as_str(), format!("Analysis task panicked: {e}"))
        }));
    }

    let diagnostics: Vec<String> = insights
        .iter()
        .filter_map(|i| i.error.as_ref().map(|e| format!("{}: {e}", i.url)))
        .collect();
    let succeeded = insights.len() - diagnostics.len();
    info!(succeeded, failed = diagnostics.len(), "webpage analysis complete");

    if succeeded == 0 {
        return StepOutcome {
            value: insights,
            status: StepStatus::Failed {
                reason: format!("all {} pages failed", urls.len()),
            },
            diagnostics,
        };
    }
    StepOutcome::from_diagnostics(insights, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedInference, TestPorts};
    use marketscope_shared::{CapabilityError, TaskKind};

    const REPLY: &str = "Summary: Streaming revenue grew 12% last year.\n\
                         Insight: Bundled podcasts drive retention.\n\
                         Relevance: Highly relevant - covers market size.";

    fn long_article(title: &str) -> String {
        let body = "Music streaming keeps growing as listeners move from downloads to subscriptions. ".repeat(4);
        format!("<html><head><title>{title}</title></head><body><article><p>{body}</p></article></body></html>")
    }

    fn urls(raw: &[&str]) -> Vec<Url> {
        raw.iter().map(|u| Url::parse(u).unwrap()).collect()
    }

    #[test]
    fn parses_sections_in_any_case_and_order() {
        let sections = parse_sections(
            "**relevance:** Partially relevant, mostly about pricing.\n\
             **SUMMARY:** A pricing comparison.\n\
             **Insight:** Family plans are underpriced.",
        );
        assert_eq!(sections.summary, "A pricing comparison.");
        assert_eq!(sections.insight, "Family plans are underpriced.");
        assert_eq!(sections.relevance, "Partially relevant, mostly about pricing.");
    }

    #[test]
    fn missing_section_defaults_per_field() {
        let sections = parse_sections("Summary: Only a summary here.\nInsight:   ");
        assert_eq!(sections.summary, "Only a summary here.");
        assert_eq!(sections.insight, PARSING_FAILED);
        assert_eq!(sections.relevance, PARSING_FAILED);
    }

    #[tokio::test]
    async fn successful_page_keeps_short_excerpt() {
        let url = "https://news.example/streaming";
        let inference = ScriptedInference::new().text(TaskKind::AnalyzePage, REPLY);
        let ports = TestPorts::new(inference).page(url, &long_article("Streaming report"));

        let insight = analyze_page(
            &ports.capabilities(),
            "music streaming",
            &Url::parse(url).unwrap(),
            &PipelineConfig::default(),
        )
        .await;

        assert!(insight.success, "{:?}", insight.error);
        assert_eq!(insight.title.as_deref(), Some("Streaming report"));
        assert_eq!(insight.summary.as_deref(), Some("Streaming revenue grew 12% last year."));
        assert_eq!(insight.relevance_level, Some(Relevance::HighlyRelevant));
        let content = insight.content.expect("excerpt");
        assert!(content.contains("Music streaming keeps growing"));
        assert!(content.chars().count() <= 500);
    }

    #[tokio::test]
    async fn short_extraction_fails_but_other_pages_continue() {
        let good = "https://good.example/";
        let thin = "https://thin.example/";
        let inference = ScriptedInference::new().text(TaskKind::AnalyzePage, REPLY);
        let ports = TestPorts::new(inference)
            .page(good, &long_article("Good"))
            .page(thin, "<html><body><p>forty characters of text, still not enough</p></body></html>")
            .primary_extractor("ten chars.");

        let outcome = analyze_pages(
            &ports.capabilities(),
            "music streaming",
            &urls(&[thin, good]),
            &PipelineConfig::default(),
            Arc::new(Semaphore::new(2)),
        )
        .await;

        assert_eq!(outcome.value.len(), 2);
        let failed = &outcome.value[0];
        assert!(!failed.success);
        assert_eq!(
            failed.error.as_deref(),
            Some("Extraction failed: no significant text content found")
        );
        assert!(outcome.value[1].success, "{:?}", outcome.value[1].error);
        assert_eq!(ports.inference().calls(TaskKind::AnalyzePage), 1);
        assert_eq!(outcome.status, StepStatus::Degraded);
    }

    #[tokio::test]
    async fn failures_stay_isolated_and_ordered() {
        let ok_a = "https://a.example/";
        let thin = "https://thin.example/";
        let down = "https://down.example/";
        let ok_b = "https://b.example/";
        let inference = ScriptedInference::new().text(TaskKind::AnalyzePage, REPLY);
        let ports = TestPorts::new(inference)
            .page(ok_a, &long_article("A"))
            .page(thin, "<html><body><p>tiny</p></body></html>")
            .broken_page(down, CapabilityError::HttpStatus { url: down.into(), status: 503 })
            .page(ok_b, &long_article("B"));

        let outcome = analyze_pages(
            &ports.capabilities(),
            "music streaming",
            &urls(&[ok_a, thin, down, ok_b]),
            &PipelineConfig::default(),
            Arc::new(Semaphore::new(3)),
        )
        .await;

        let got: Vec<(&str, bool)> = outcome
            .value
            .iter()
            .map(|i| (i.url.as_str(), i.success))
            .collect();
        assert_eq!(got, vec![(ok_a, true), (thin, false), (down, false), (ok_b, true)]);
        assert!(outcome.value[1].error.as_deref().is_some_and(|e| e.starts_with("Extraction failed")));
        assert!(outcome.value[2].error.as_deref().is_some_and(|e| e.starts_with("Scraping failed")));
        assert_eq!(outcome.status, StepStatus::Degraded);
        assert_eq!(outcome.diagnostics.len(), 2);
    }

    #[tokio::test]
    async fn analysis_is_idempotent_under_stubs() {
        let url = "https://a.example/";
        let inference = ScriptedInference::new().text(TaskKind::AnalyzePage, REPLY);
        let ports = TestPorts::new(inference).page(url, &long_article("A"));
        let caps = ports.capabilities();
        let config = PipelineConfig::default();
        let list = urls(&[url]);

        let first = analyze_pages(&caps, "q", &list, &config, Arc::new(Semaphore::new(1))).await;
        let second = analyze_pages(&caps, "q", &list, &config, Arc::new(Semaphore::new(1))).await;
        assert_eq!(first.value, second.value);
        assert_eq!(ports.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn inference_failure_keeps_hundred_char_excerpt() {
        let url = "https://a.example/";
        let inference = ScriptedInference::new().text_with(TaskKind::AnalyzePage, |_| {
            Err(CapabilityError::Timeout("model busy".into()))
        });
        let ports = TestPorts::new(inference).page(url, &long_article("A"));

        let insight = analyze_page(
            &ports.capabilities(),
            "q",
            &Url::parse(url).unwrap(),
            &PipelineConfig::default(),
        )
        .await;

        assert!(!insight.success);
        assert_eq!(insight.content.as_ref().map(|c| c.chars().count()), Some(100));
        assert!(insight.error.as_deref().is_some_and(|e| e.starts_with("LLM analysis failed:")));
        assert_eq!(insight.title.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn no_urls_is_a_skip() {
        let ports = TestPorts::new(ScriptedInference::new());
        let outcome = analyze_pages(
            &ports.capabilities(),
            "q",
            &[],
            &PipelineConfig::default(),
            Arc::new(Semaphore::new(1)),
        )
        .await;
        assert!(outcome.value.is_empty());
        assert!(matches!(outcome.status, StepStatus::Skipped { .. }));
    }
}
