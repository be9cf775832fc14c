//! Generic visible-text extractor, used when readable extraction comes up short.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::{ExtractedText, TextExtractor, page_title, visible_text};

/// A container shorter than this loses to the whole body.
const MIN_CONTAINER_CHARS: usize = 100;

/// Secondary extractor: container text if substantial, else all body text.
pub struct BodyTextExtractor;

impl TextExtractor for BodyTextExtractor {
    fn extract(&self, doc: &Html) -> ExtractedText {
        static CONTAINER_SEL: LazyLock<Selector> = LazyLock::new(|| {
            Selector::parse("main, article, #content, .content").expect("valid selector")
        });
        static BODY_SEL: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse("body").expect("valid selector"));

        let title = page_title(doc);

        let container_text = doc
            .select(&CONTAINER_SEL)
            .next()
            .map(visible_text)
            .unwrap_or_default();

        let text = if container_text.chars().count() >= MIN_CONTAINER_CHARS {
            container_text
        } else {
            doc.select(&BODY_SEL)
                .next()
                .map(visible_text)
                .unwrap_or(container_text)
        };

        ExtractedText { text, title }
    }

    fn name(&self) -> &str {
        "body-text"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_container_falls_back_to_body() {
        let doc = Html::parse_document(
            "<html><body><div>Intro words outside.</div><main>Tiny</main><script>x()</script></body></html>",
        );
        let result = BodyTextExtractor.extract(&doc);
        assert_eq!(result.text, "Intro words outside. Tiny");
    }

    #[test]
    fn long_container_wins() {
        let long = "Budget travel apps compare fares across airlines. ".repeat(4);
        let html = format!(
            "<html><body><div>Header junk</div><article>{long}</article></body></html>"
        );
        let doc = Html::parse_document(&html);
        let result = BodyTextExtractor.extract(&doc);
        assert!(result.text.starts_with("Budget travel apps"));
        assert!(!result.text.contains("Header junk"));
    }
}
