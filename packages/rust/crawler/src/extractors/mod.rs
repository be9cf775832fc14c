//! Text extractors for fetched pages.
//!
//! Two extractors ship with the crate: [`ReadableExtractor`] (content-area
//! detection + Markdown cleanup) and [`BodyTextExtractor`] (plain visible
//! text). [`ExtractorChain`] holds them as primary/secondary; the insight
//! step decides when to fall through.

mod fallback;
mod readable;

use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

pub use fallback::BodyTextExtractor;
pub use readable::ReadableExtractor;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Text pulled out of a page by an extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    /// Extracted text; empty when the extractor found nothing usable.
    pub text: String,
    /// Page title, if the extractor found one.
    pub title: Option<String>,
}

impl ExtractedText {
    /// Length of the text in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Strategy for turning a parsed HTML document into analyzable text.
pub trait TextExtractor: Send + Sync {
    /// Extract text from the document. Never fails; returns empty text instead.
    fn extract(&self, doc: &Html) -> ExtractedText;

    /// Human-readable extractor name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Primary and secondary extractors, tried in that order.
pub struct ExtractorChain {
    primary: Box<dyn TextExtractor>,
    secondary: Box<dyn TextExtractor>,
}

impl ExtractorChain {
    /// Build a chain from explicit extractors.
    pub fn new(primary: Box<dyn TextExtractor>, secondary: Box<dyn TextExtractor>) -> Self {
        Self { primary, secondary }
    }

    /// The readable-content extractor.
    pub fn primary(&self) -> &dyn TextExtractor {
        self.primary.as_ref()
    }

    /// The generic-text extractor.
    pub fn secondary(&self) -> &dyn TextExtractor {
        self.secondary.as_ref()
    }
}

impl Default for ExtractorChain {
    fn default() -> Self {
        Self::new(Box::new(ReadableExtractor), Box::new(BodyTextExtractor))
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by extractors
// ---------------------------------------------------------------------------

/// Page title from `<title>`, falling back to the first `<h1>`.
pub fn page_title(doc: &Html) -> Option<String> {
    static TITLE_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("title").expect("valid selector"));
    static H1_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("h1").expect("valid selector"));

    [&*TITLE_SEL, &*H1_SEL].into_iter().find_map(|sel| {
        doc.select(sel)
            .next()
            .map(|el| marketscope_markdown::collapse_whitespace(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    })
}

/// Visible text under `el`, skipping script/style/noscript/template content.
pub(crate) fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value().as_element().is_some_and(|e| {
                matches!(e.name(), "script" | "style" | "noscript" | "template")
            })
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    marketscope_markdown::collapse_whitespace(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefers_title_tag() {
        let doc = Html::parse_document(
            "<html><head><title> Pricing | Acme </title></head><body><h1>Plans</h1></body></html>",
        );
        assert_eq!(page_title(&doc).as_deref(), Some("Pricing | Acme"));
    }

    #[test]
    fn title_falls_back_to_h1() {
        let doc = Html::parse_document("<html><body><h1>Plans</h1></body></html>");
        assert_eq!(page_title(&doc).as_deref(), Some("Plans"));
    }

    #[test]
    fn visible_text_skips_scripts() {
        let doc = Html::parse_document(
            "<html><body><p>Hello</p><script>track()</script><p>world</p></body></html>",
        );
        let text = visible_text(doc.root_element());
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn default_chain_order() {
        let chain = ExtractorChain::default();
        assert_eq!(chain.primary().name(), "readable");
        assert_eq!(chain.secondary().name(), "body-text");
    }
}
