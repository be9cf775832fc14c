//! Prompt builders and output contracts for every inference task.
//!
//! Prompts are assembled deterministically from their inputs: the same
//! reviews, trends and insights always produce byte-identical prompts.

use std::fmt::Write as _;

use serde_json::json;

use marketscope_shared::{
    CompetitorSet, InferenceRequest, OutputContract, PageInsight, ReviewBundle, Storefront,
    TaskKind, TrendSnapshot,
};

// ---------------------------------------------------------------------------
// Competitor discovery
// ---------------------------------------------------------------------------

const COMPETITOR_SYSTEM: &str = "\
You identify the top competitors for a market research query.
1. Classify the query: \"app\" when it is about a mobile or desktop app, \"local_business\" when it is about a physical business such as a restaurant or shop.
2. Name exactly 3 real, well-known competitors. Do not invent names.
3. For apps, include your best guess of each competitor's App Store and Google Play listing URLs; they are checked later.
4. For local businesses, give names only and no URLs.";

pub fn competitor_request(query: &str) -> InferenceRequest {
    InferenceRequest {
        task: TaskKind::DiscoverCompetitors,
        system_prompt: COMPETITOR_SYSTEM.to_string(),
        user_prompt: query.to_string(),
        max_tokens: 800,
        temperature: 0.2,
    }
}

pub fn competitor_contract() -> OutputContract {
    OutputContract {
        name: "competitor_discovery",
        schema: json!({
            "type": "object",
            "required": ["query_kind", "competitors"],
            "properties": {
                "query_kind": {"type": "string", "enum": ["app", "local_business"]},
                "competitors": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {
                            "name": {"type": "string"},
                            "app_store_url": {"type": ["string", "null"]},
                            "google_play_url": {"type": ["string", "null"]}
                        }
                    }
                }
            }
        }),
    }
}

// ---------------------------------------------------------------------------
// Review synthesis
// ---------------------------------------------------------------------------

const REVIEW_SYSTEM: &str = "\
You write realistic, plausible app store reviews.
For every requested platform write exactly 3 distinct reviews. Each review has an integer \"rating\" from 1 to 5 and a \"text\" of 1 to 3 sentences.
Vary tone and content: praise, complaints, bugs, usability and performance.
Leave the array empty for any platform that was not requested.";

pub fn review_request(name: &str, platforms: &[Storefront]) -> InferenceRequest {
    let labels: Vec<&str> = platforms.iter().map(Storefront::label).collect();
    InferenceRequest {
        task: TaskKind::SynthesizeReviews,
        system_prompt: REVIEW_SYSTEM.to_string(),
        user_prompt: format!(
            "Write 3 reviews of the app '{name}' for each of: {}.",
            labels.join(" and ")
        ),
        max_tokens: 1000,
        temperature: 0.7,
    }
}

pub fn review_contract() -> OutputContract {
    let list = json!({
        "type": "array",
        "items": {
            "type": "object",
            "required": ["rating", "text"],
            "properties": {
                "rating": {"type": "integer", "minimum": 1, "maximum": 5},
                "text": {"type": "string"}
            }
        }
    });
    OutputContract {
        name: "review_synthesis",
        schema: json!({
            "type": "object",
            "properties": {
                "app_store_reviews": list,
                "google_play_reviews": list
            }
        }),
    }
}

// ---------------------------------------------------------------------------
// Page analysis
// ---------------------------------------------------------------------------

/// Labeled-section analysis of one page excerpt, answered as plain text.
pub fn insight_request(query: &str, url: &str, title: Option<&str>, excerpt: &str) -> InferenceRequest {
    let user_prompt = format!(
        "Analyze the following text scraped from \"{url}\" (Title: \"{title}\").\n\
         Focus on information useful for market research on: {query}\n\
         \n\
         Content:\n\
         ---\n\
         {excerpt}\n\
         ---\n\
         \n\
         Based only on the content above:\n\
         1. Summary: 3 to 5 sentences on the key points for this research. Say so if the content is irrelevant.\n\
         2. Insight: one specific, actionable insight, or \"No specific insight found.\"\n\
         3. Relevance: exactly one of Highly relevant, Partially relevant, Not relevant, then a short justification.\n\
         \n\
         Answer exactly in this format:\n\
         Summary: ...\n\
         Insight: ...\n\
         Relevance: ...",
        title = title.unwrap_or("N/A"),
    );
    InferenceRequest {
        task: TaskKind::AnalyzePage,
        system_prompt: String::new(),
        user_prompt,
        max_tokens: 500,
        temperature: 0.2,
    }
}

// ---------------------------------------------------------------------------
// Chart data
// ---------------------------------------------------------------------------

const CHART_SYSTEM: &str = "\
You turn market research into chart-ready JSON.
1. bar_chart_data: one row per competitor with name, review_count, rating (0 to 5) and market_share (0 to 100). Use null for anything the research does not support.
2. gap_matrix_data: features users ask for, each with unmet_need (High, Medium or Low) and competitor_status mapping every competitor name to Yes, No or Unknown.
3. suggested_bar_chart_metric: the field best suited to the bar chart, usually review_count, otherwise rating.";

pub fn chart_request(
    query: &str,
    competitors: &CompetitorSet,
    reviews: &[ReviewBundle],
    trends: &TrendSnapshot,
    insights: &[PageInsight],
) -> InferenceRequest {
    let mut user_prompt = format!("Research topic: {query}\n");
    user_prompt.push_str(&research_digest(competitors, reviews, trends, insights));
    InferenceRequest {
        task: TaskKind::BuildChartData,
        system_prompt: CHART_SYSTEM.to_string(),
        user_prompt,
        max_tokens: 1500,
        temperature: 0.2,
    }
}

pub fn chart_contract() -> OutputContract {
    OutputContract {
        name: "chart_data",
        schema: json!({
            "type": "object",
            "required": ["bar_chart_data", "gap_matrix_data"],
            "properties": {
                "bar_chart_data": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {
                            "name": {"type": "string"},
                            "review_count": {"type": ["integer", "null"], "minimum": 0},
                            "rating": {"type": ["number", "null"], "minimum": 0, "maximum": 5},
                            "market_share": {"type": ["number", "null"], "minimum": 0, "maximum": 100}
                        }
                    }
                },
                "gap_matrix_data": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["feature", "competitor_status"],
                        "properties": {
                            "feature": {"type": "string"},
                            "unmet_need": {"type": ["string", "null"], "enum": ["High", "Medium", "Low", null]},
                            "competitor_status": {
                                "type": "object",
                                "additionalProperties": {"type": "string", "enum": ["Yes", "No", "Unknown"]}
                            }
                        }
                    }
                },
                "suggested_bar_chart_metric": {"type": ["string", "null"]}
            }
        }),
    }
}

// ---------------------------------------------------------------------------
// Narrative
// ---------------------------------------------------------------------------

const SUMMARY_SYSTEM: &str = "\
You are a market analyst. Using only the research provided, write a concise market summary report with these headed sections:
Overall Summary, Key Trends, Competitor Positioning, Unmet Needs, Strategic Opportunities.";

pub fn summary_request(
    query: &str,
    competitors: &CompetitorSet,
    reviews: &[ReviewBundle],
    trends: &TrendSnapshot,
    insights: &[PageInsight],
) -> InferenceRequest {
    let mut user_prompt = format!("Research topic: {query}\n");
    user_prompt.push_str(&research_digest(competitors, reviews, trends, insights));
    InferenceRequest {
        task: TaskKind::Summarize,
        system_prompt: SUMMARY_SYSTEM.to_string(),
        user_prompt,
        max_tokens: 1500,
        temperature: 0.4,
    }
}

/// Plain-text rendering of everything gathered so far.
///
/// Failed insights are left out; their errors are not research.
fn research_digest(
    competitors: &CompetitorSet,
    reviews: &[ReviewBundle],
    trends: &TrendSnapshot,
    insights: &[PageInsight],
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n## Competitors\n{}", competitors.names().join(", "));

    out.push_str("\n## User reviews\n");
    if reviews.is_empty() {
        out.push_str("No reviews available.\n");
    }
    for bundle in reviews {
        let average = bundle
            .average_rating()
            .map_or_else(|| "n/a".to_string(), |r| format!("{r:.1}"));
        let _ = writeln!(
            out,
            "### {} ({} reviews, average rating {average})",
            bundle.competitor_name,
            bundle.review_count()
        );
        for store in Storefront::ALL {
            for review in bundle.reviews(store) {
                let _ = writeln!(out, "- [{}] {}/5: {}", store.label(), review.rating, review.text);
            }
        }
    }

    let _ = writeln!(
        out,
        "\n## Search trends for \"{}\" ({})",
        trends.keyword, trends.country
    );
    if trends.is_empty() {
        out.push_str("No related queries available.\n");
    } else {
        let _ = writeln!(out, "Top related queries: {}", trends.top.join("; "));
        let _ = writeln!(out, "Rising related queries: {}", trends.rising.join("; "));
    }

    out.push_str("\n## Web sources\n");
    let analyzed: Vec<&PageInsight> = insights.iter().filter(|i| i.success).collect();
    if analyzed.is_empty() {
        out.push_str("No web sources analyzed.\n");
    }
    for insight in analyzed {
        let _ = writeln!(out, "### {}", insight.title.as_deref().unwrap_or(&insight.url));
        let _ = writeln!(out, "Source: {}", insight.url);
        for (label, field) in [
            ("Summary", &insight.summary),
            ("Insight", &insight.insight),
            ("Relevance", &insight.relevance),
        ] {
            if let Some(text) = field {
                let _ = writeln!(out, "{label}: {text}");
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketscope_shared::{Competitor, Review};

    fn inputs() -> (CompetitorSet, Vec<ReviewBundle>, TrendSnapshot, Vec<PageInsight>) {
        let competitors = CompetitorSet::padded(vec![Competitor::named("Spotify")]);
        let reviews = vec![ReviewBundle {
            competitor_name: "Spotify".into(),
            app_store: vec![Review { rating: 4, text: "Great playlists".into() }],
            google_play: Vec::new(),
        }];
        let mut trends = TrendSnapshot::new("music streaming", "US");
        trends.add_top("spotify premium");
        let mut ok = PageInsight::failed("https://a.example/", "unused");
        ok.success = true;
        ok.error = None;
        ok.summary = Some("Streaming keeps growing.".into());
        let failed = PageInsight::failed("https://b.example/", "Scraping failed: timeout");
        (competitors, reviews, trends, vec![ok, failed])
    }

    #[test]
    fn summary_prompt_is_deterministic() {
        let (c, r, t, i) = inputs();
        let a = summary_request("music streaming", &c, &r, &t, &i);
        let b = summary_request("music streaming", &c, &r, &t, &i);
        assert_eq!(a, b);
        assert_eq!(a.task, TaskKind::Summarize);
    }

    #[test]
    fn digest_covers_all_sources_and_skips_failed_pages() {
        let (c, r, t, i) = inputs();
        let digest = research_digest(&c, &r, &t, &i);
        assert!(digest.contains("Spotify, Unknown 1, Unknown 2"));
        assert!(digest.contains("- [App Store] 4/5: Great playlists"));
        assert!(digest.contains("average rating 4.0"));
        assert!(digest.contains("Top related queries: spotify premium"));
        assert!(digest.contains("Summary: Streaming keeps growing."));
        assert!(digest.contains("https://a.example/"));
        assert!(!digest.contains("https://b.example/"));
    }

    #[test]
    fn review_prompt_names_requested_platforms_only() {
        let req = review_request("Tidal", &[Storefront::GooglePlay]);
        assert!(req.user_prompt.contains("Google Play"));
        assert!(!req.user_prompt.contains("App Store"));
    }

    #[test]
    fn insight_prompt_embeds_excerpt_and_limits() {
        let req = insight_request("betting apps", "https://x.example/", None, "BODY TEXT");
        assert!(req.user_prompt.contains("BODY TEXT"));
        assert!(req.user_prompt.contains("(Title: \"N/A\")"));
        assert_eq!(req.max_tokens, 500);
        assert!((req.temperature - 0.2).abs() < f32::EPSILON);
    }
}
