//! Page fetching, text extraction, and trends page parsing.
//!
//! This crate provides:
//! - [`HttpFetcher`]: the reqwest-backed [`PageFetcher`](marketscope_shared::PageFetcher)
//! - [`extractors`]: readable-content and body-text extractors behind [`TextExtractor`]
//! - [`trends`]: related-queries widget parser for trends explore pages

pub mod extractors;
pub mod fetcher;
pub mod trends;

pub use extractors::{
    BodyTextExtractor, ExtractedText, ExtractorChain, ReadableExtractor, TextExtractor, page_title,
};
pub use fetcher::{HttpFetcher, USER_AGENT};
pub use trends::{
    EXPLORE_ENDPOINT, RelatedQueries, WidgetQueries, explore_url, parse_related_queries,
};
