//! Post-conversion cleanup pipeline for readable page text.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! The result is compact prose meant for a model prompt, not for rendering,
//! so links and images are flattened away.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on converted Markdown.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = md.to_string();

    result = drop_images(&result);
    result = flatten_links(&result);
    result = strip_leftover_html(&result);
    result = normalize_whitespace(&result);
    result = clean_blank_lines(&result);

    result.trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 1: Drop images
// ---------------------------------------------------------------------------

/// Remove `![alt](src)` image references entirely.
fn drop_images(md: &str) -> String {
    static IMG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid regex"));

    IMG_RE.replace_all(md, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: Flatten links
// ---------------------------------------------------------------------------

/// Replace `[text](href)` with `text`; the target adds nothing to analysis.
fn flatten_links(md: &str) -> String {
    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid regex"));

    LINK_RE.replace_all(md, "$1").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: Strip leftover HTML tags
// ---------------------------------------------------------------------------

/// Remove stray HTML tags that survived the conversion, keeping inner text.
fn strip_leftover_html(md: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"</?[a-zA-Z][a-zA-Z0-9-]*(?:\s[^>]*)?/?>").expect("valid regex"));

    HTML_TAG_RE.replace_all(md, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: Normalize whitespace
// ---------------------------------------------------------------------------

/// Collapse runs of spaces/tabs inside lines and trim line ends.
fn normalize_whitespace(md: &str) -> String {
    static INLINE_WS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[ \t\u{a0}]{2,}").expect("valid regex"));

    md.lines()
        .map(|line| INLINE_WS_RE.replace_all(line.trim_end(), " ").to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 5: Clean up excessive blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of blank lines into a single paragraph break.
fn clean_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_images_removes_references() {
        let input = "Intro ![logo](/logo.png) text";
        assert_eq!(drop_images(input), "Intro  text");
    }

    #[test]
    fn flatten_links_keeps_text() {
        let input = "See [pricing](https://example.com/pricing) for details";
        assert_eq!(flatten_links(input), "See pricing for details");
    }

    #[test]
    fn strip_leftover_html_removes_tags() {
        let input = "<div class=\"note\">Important</div> <span>info</span><br/>";
        assert_eq!(strip_leftover_html(input), "Important info");
    }

    #[test]
    fn normalize_whitespace_collapses_runs() {
        let input = "Line   one \t\nLine\t\ttwo   ";
        assert_eq!(normalize_whitespace(input), "Line one\nLine two");
    }

    #[test]
    fn clean_blank_lines_collapses_excess() {
        let input = "Para 1\n\n\n\n\nPara 2\n\nPara 3";
        assert_eq!(clean_blank_lines(input), "Para 1\n\nPara 2\n\nPara 3");
    }

    #[test]
    fn full_pipeline_produces_compact_prose() {
        let input = "# Title\n\n\n\n![hero](/a.png)\n\nRead [the guide](/guide).   <div>Extra</div>\n\n\n";
        let result = run_pipeline(input);
        assert_eq!(result, "# Title\n\nRead the guide. Extra");
    }
}
