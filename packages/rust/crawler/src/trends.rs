//! Related-queries widget parser for trends explore pages.
//!
//! The page groups related searches into widgets, each with a "Top" and a
//! "Rising" list. Parsing never fails: missing widgets or empty lists are
//! reported through the returned structure so callers can log diagnostics.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use marketscope_markdown::collapse_whitespace;

static WIDGET_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.details-widgets-container, div.widget.concepts-widget, div.fe-related-queries")
        .expect("valid selector")
});
static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.widget-header-title, h2.LTR-title, .fe-atoms-generic-title")
        .expect("valid selector")
});
static TOP_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".widget-top-entities").expect("valid selector"));
static RISING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".widget-rising-entities").expect("valid selector"));
static ITEM_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".item .label-text, .entity-info-container .label").expect("valid selector")
});
static NO_DATA_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".widget-error-title, .feed-item.no-data").expect("valid selector")
});

/// Trends explore page; the keyword and country are sent as query params.
pub const EXPLORE_ENDPOINT: &str = "https://trends.google.com/trends/explore";

/// Widget heading that identifies related-query widgets.
const RELATED_QUERIES_TITLE: &str = "related queries";

/// Items parsed from one related-queries widget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetQueries {
    pub top: Vec<String>,
    pub rising: Vec<String>,
}

impl WidgetQueries {
    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.rising.is_empty()
    }
}

/// Everything the trends step needs from one explore page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelatedQueries {
    /// One entry per related-queries widget, in document order.
    pub widgets: Vec<WidgetQueries>,
    /// Text of the page's "no data" notice, if it shows one.
    pub no_data_notice: Option<String>,
}

/// Build the explore URL for `keyword` in `country`.
pub fn explore_url(base: &str, keyword: &str, country: &str) -> Result<Url, url::ParseError> {
    Url::parse_with_params(base, [("q", keyword), ("geo", country), ("hl", "en")])
}

/// Parse every related-queries widget on the page.
pub fn parse_related_queries(html: &str) -> RelatedQueries {
    let doc = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut widgets = Vec::new();

    for title in doc.select(&TITLE_SEL) {
        let heading = title.text().collect::<String>().to_lowercase();
        if !heading.contains(RELATED_QUERIES_TITLE) {
            continue;
        }
        let Some(widget) = title
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|a| WIDGET_SEL.matches(a))
        else {
            continue;
        };
        if !seen.insert(widget.id()) {
            continue;
        }
        widgets.push(parse_widget(widget));
    }

    let no_data_notice = doc
        .select(&NO_DATA_SEL)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|t| !t.is_empty());

    RelatedQueries {
        widgets,
        no_data_notice,
    }
}

/// Split a widget into top/rising lists. A widget without explicit sections
/// contributes all of its items to `top`.
fn parse_widget(widget: ElementRef<'_>) -> WidgetQueries {
    let top_section = widget.select(&TOP_SEL).next();
    let rising_section = widget.select(&RISING_SEL).next();

    if top_section.is_none() && rising_section.is_none() {
        return WidgetQueries {
            top: items(widget),
            rising: Vec::new(),
        };
    }

    WidgetQueries {
        top: top_section.map(items).unwrap_or_default(),
        rising: rising_section.map(items).unwrap_or_default(),
    }
}

fn items(section: ElementRef<'_>) -> Vec<String> {
    section
        .select(&ITEM_SEL)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
      <div class="widget concepts-widget">
        <div class="widget-header-title">Related topics</div>
        <div class="item"><span class="label-text">ignored topic</span></div>
      </div>
      <div class="widget concepts-widget">
        <div class="widget-header-title">Related queries</div>
        <div class="widget-top-entities">
          <div class="item"><span class="label-text">spotify</span></div>
          <div class="item"><span class="label-text">music app</span></div>
        </div>
        <div class="widget-rising-entities">
          <div class="item"><span class="label-text">lossless streaming</span></div>
        </div>
      </div>
    </body></html>"#;

    #[test]
    fn parses_top_and_rising() {
        let parsed = parse_related_queries(PAGE);
        assert_eq!(parsed.widgets.len(), 1);
        assert_eq!(parsed.widgets[0].top, vec!["spotify", "music app"]);
        assert_eq!(parsed.widgets[0].rising, vec!["lossless streaming"]);
        assert_eq!(parsed.no_data_notice, None);
    }

    #[test]
    fn widget_without_sections_goes_to_top() {
        let html = r#"<div class="widget concepts-widget">
            <h2 class="LTR-title">Related Queries</h2>
            <div class="entity-info-container"><span class="label">budget app</span></div>
        </div>"#;
        let parsed = parse_related_queries(html);
        assert_eq!(parsed.widgets.len(), 1);
        assert_eq!(parsed.widgets[0].top, vec!["budget app"]);
        assert!(parsed.widgets[0].rising.is_empty());
    }

    #[test]
    fn no_widgets_and_no_data_notice() {
        let html = r#"<div class="feed-item no-data">Hmm, your search doesn't have enough data to show here.</div>"#;
        let parsed = parse_related_queries(html);
        assert!(parsed.widgets.is_empty());
        assert!(parsed.no_data_notice.unwrap().contains("enough data"));
    }

    #[test]
    fn empty_widget_reported() {
        let html = r#"<div class="widget concepts-widget">
            <div class="widget-header-title">Related queries</div>
            <div class="widget-top-entities"></div>
        </div>"#;
        let parsed = parse_related_queries(html);
        assert_eq!(parsed.widgets.len(), 1);
        assert!(parsed.widgets[0].is_empty());
    }

    #[test]
    fn builds_explore_url() {
        let url = explore_url(EXPLORE_ENDPOINT, "music app", "US").unwrap();
        assert_eq!(
            url.as_str(),
            "https://trends.google.com/trends/explore?q=music+app&geo=US&hl=en"
        );
    }
}
