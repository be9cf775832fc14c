//! Readable-content extractor.
//!
//! Finds the main content area using readability-style heuristics (landmark
//! elements first, then the block with the most paragraph text), strips page
//! chrome, and converts the remainder to compact Markdown prose.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use super::{ExtractedText, TextExtractor, page_title};

/// Landmark selectors, tried in order.
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    r#"[role="main"]"#,
    "#content",
    ".content",
    ".post-content",
    ".entry-content",
];

/// Elements that never carry article content.
static CHROME_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "nav, header, footer, aside, script, style, noscript, form, iframe, \
         .sidebar, .nav, .menu, .cookie-banner, [role=\"navigation\"], [aria-hidden=\"true\"]",
    )
    .expect("valid selector")
});

/// Void elements: rendered without a closing tag.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "meta", "link", "wbr", "source"];

/// Primary extractor: landmark detection + Markdown cleanup.
pub struct ReadableExtractor;

impl TextExtractor for ReadableExtractor {
    fn extract(&self, doc: &Html) -> ExtractedText {
        let title = page_title(doc);

        let Some(content) = find_content_root(doc) else {
            debug!("no readable content root found");
            return ExtractedText { text: String::new(), title };
        };

        let mut html = String::new();
        render_without_chrome(content, &mut html);

        match marketscope_markdown::to_readable_text(&html) {
            Ok(readable) => ExtractedText {
                text: readable.text,
                title: title.or(readable.heading),
            },
            Err(e) => {
                debug!(error = %e, "readable conversion failed");
                ExtractedText { text: String::new(), title }
            }
        }
    }

    fn name(&self) -> &str {
        "readable"
    }
}

/// First landmark element, else the block with the most direct paragraph text.
fn find_content_root(doc: &Html) -> Option<ElementRef<'_>> {
    for sel_str in CONTENT_SELECTORS {
        let Ok(sel) = Selector::parse(sel_str) else {
            continue;
        };
        if let Some(el) = doc.select(&sel).next() {
            return Some(el);
        }
    }

    densest_block(doc)
}

/// Score `div`/`section` blocks by the text length of their direct `<p>` children.
fn densest_block(doc: &Html) -> Option<ElementRef<'_>> {
    static BLOCK_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div, section").expect("valid selector"));

    doc.select(&BLOCK_SEL)
        .filter(|block| !CHROME_SEL.matches(block))
        .map(|block| {
            let score: usize = block
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|child| child.value().name() == "p")
                .map(|p| p.text().map(str::len).sum::<usize>())
                .sum();
            (score, block)
        })
        .filter(|(score, _)| *score > 0)
        .max_by_key(|(score, _)| *score)
        .map(|(_, block)| block)
}

/// Serialize the children of `el` as HTML, omitting chrome subtrees.
///
/// Attributes are dropped; only structure and text matter for conversion.
fn render_without_chrome(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&escape_text(text)),
            Node::Element(element) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if CHROME_SEL.matches(&child_el) {
                    continue;
                }
                let name = element.name();
                out.push('<');
                out.push_str(name);
                out.push('>');
                if VOID_ELEMENTS.contains(&name) {
                    continue;
                }
                render_without_chrome(child_el, out);
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            _ => {}
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_main_and_strips_chrome() {
        let doc = Html::parse_document(
            r#"<html><head><title>Acme Music</title></head><body>
            <nav><a href="/">Home</a><a href="/login">Login</a></nav>
            <main>
              <h1>Streaming for everyone</h1>
              <aside>Subscribe to our newsletter</aside>
              <p>Acme streams lossless audio to every device in your home.</p>
            </main>
            <footer>Copyright Acme</footer>
            </body></html>"#,
        );

        let result = ReadableExtractor.extract(&doc);
        assert!(result.text.contains("Streaming for everyone"));
        assert!(result.text.contains("lossless audio"));
        assert!(!result.text.contains("newsletter"));
        assert!(!result.text.contains("Login"));
        assert!(!result.text.contains("Copyright"));
        assert_eq!(result.title.as_deref(), Some("Acme Music"));
    }

    #[test]
    fn falls_back_to_densest_block() {
        let doc = Html::parse_document(
            r#"<html><body>
            <div class="promo"><p>Short promo.</p></div>
            <div class="story">
              <p>The first paragraph of a long story about mobile payments.</p>
              <p>The second paragraph keeps going with more detail about fees.</p>
            </div>
            </body></html>"#,
        );

        let result = ReadableExtractor.extract(&doc);
        assert!(result.text.contains("mobile payments"));
        assert!(result.text.contains("fees"));
        assert!(!result.text.contains("Short promo"));
    }

    #[test]
    fn empty_when_no_content() {
        let doc = Html::parse_document("<html><body><span>hi</span></body></html>");
        let result = ReadableExtractor.extract(&doc);
        assert!(result.text.is_empty());
    }

    #[test]
    fn escapes_text_when_reserializing() {
        let doc = Html::parse_document("<html><body><main><p>a &lt; b &amp; c</p></main></body></html>");
        let mut html = String::new();
        let main = doc
            .select(&Selector::parse("main").unwrap())
            .next()
            .unwrap();
        render_without_chrome(main, &mut html);
        assert_eq!(html, "<p>a &lt; b &amp; c</p>");
    }
}
