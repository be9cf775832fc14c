//! HTML-to-readable-text conversion and cleanup passes.
//!
//! Converts an extracted content fragment to Markdown using the `htmd` crate,
//! then applies a series of cleanup passes that leave compact prose suitable
//! for a model prompt. Also hosts the small text helpers the extractors and
//! pipeline share (whitespace collapsing, char-safe truncation).

mod cleanup;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use marketscope_shared::{MarketScopeError, Result};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of converting an HTML fragment to readable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadableText {
    /// Cleaned text (Markdown headings and lists survive, links do not).
    pub text: String,
    /// First heading found in the text, if any.
    pub heading: Option<String>,
    /// Length of `text` in characters.
    pub char_count: usize,
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert a content HTML fragment to readable text.
///
/// 1. Pre-processes HTML tables into pipe rows
/// 2. Converts HTML → Markdown via `htmd`
/// 3. Runs the cleanup pipeline
#[instrument(skip_all, fields(html_len = content_html.len()))]
pub fn to_readable_text(content_html: &str) -> Result<ReadableText> {
    let content_html = preprocess_tables(content_html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec![
            "script", "style", "nav", "iframe", "noscript", "svg", "form", "button",
        ])
        .build();

    let raw_markdown = converter
        .convert(&content_html)
        .map_err(|e| MarketScopeError::Conversion(format!("htmd conversion failed: {e}")))?;

    let text = cleanup::run_pipeline(&raw_markdown);
    let heading = first_heading(&text);
    let char_count = text.chars().count();

    debug!(
        raw_len = raw_markdown.len(),
        char_count, "readable text conversion complete"
    );

    Ok(ReadableText {
        text,
        heading,
        char_count,
    })
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Collapse every whitespace run (including newlines) to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Extract the first Markdown heading's text.
fn first_heading(md: &str) -> Option<String> {
    static HEADING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+(.+)$").expect("valid regex"));

    HEADING_RE
        .captures(md)
        .map(|c| c[1].trim().to_string())
        .filter(|h| !h.is_empty())
}

// ---------------------------------------------------------------------------
// Table pre-processing
// ---------------------------------------------------------------------------

/// Convert HTML `<table>` elements to pipe-delimited rows before htmd conversion.
///
/// `htmd` 0.1 doesn't support table conversion, so we handle it manually.
fn preprocess_tables(html: &str) -> String {
    static TABLE_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("table").expect("valid selector"));

    let doc = Html::parse_fragment(html);
    if doc.select(&TABLE_SEL).next().is_none() {
        return html.to_string();
    }

    let mut result = html.to_string();
    for table in doc.select(&TABLE_SEL) {
        let rows = table_rows(&table);
        let replacement = if rows.is_empty() {
            String::new()
        } else {
            format!("<p>{}</p>", rows.join("<br>"))
        };
        result = result.replacen(&table.html(), &replacement, 1);
    }
    result
}

/// Render each table row as `cell | cell | cell`.
fn table_rows(table: &scraper::ElementRef) -> Vec<String> {
    static TR_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
    static CELL_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("th, td").expect("valid selector"));

    table
        .select(&TR_SEL)
        .map(|tr| {
            tr.select(&CELL_SEL)
                .map(|cell| collapse_whitespace(&cell.text().collect::<String>()))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .filter(|row| !row.trim().is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_simple_fragment() {
        let html = "<h1>Pricing</h1><p>Plans start at <a href=\"/p\">five dollars</a> a month.</p>";
        let result = to_readable_text(html).unwrap();

        assert!(result.text.contains("Pricing"));
        assert!(result.text.contains("Plans start at five dollars a month."));
        assert!(!result.text.contains("](/p)"));
        assert_eq!(result.heading.as_deref(), Some("Pricing"));
        assert_eq!(result.char_count, result.text.chars().count());
    }

    #[test]
    fn skips_scripts_and_styles() {
        let html = "<p>Visible</p><script>var tracking = 1;</script><style>p{}</style>";
        let result = to_readable_text(html).unwrap();
        assert!(result.text.contains("Visible"));
        assert!(!result.text.contains("tracking"));
    }

    #[test]
    fn tables_become_pipe_rows() {
        let html = "<table><tbody><tr><th>Plan</th><th>Price</th></tr><tr><td>Pro</td><td>9 USD</td></tr></tbody></table>";
        let result = to_readable_text(html).unwrap();
        assert!(result.text.contains("Plan | Price"));
        assert!(result.text.contains("Pro | 9 USD"));
    }

    #[test]
    fn empty_fragment_yields_empty_text() {
        let result = to_readable_text("<div>   </div>").unwrap();
        assert_eq!(result.char_count, 0);
        assert_eq!(result.heading, None);
    }

    #[test]
    fn collapse_whitespace_joins_lines() {
        assert_eq!(collapse_whitespace("  a \n\n b\tc  "), "a b c");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(truncate_chars("", 3), "");
    }
}
