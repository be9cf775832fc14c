//! Core research pipeline for MarketScope.
//!
//! This crate ties the capability ports (inference, page fetching, web search,
//! storefront lookup) into one end-to-end run: competitor, trend and source
//! discovery, review synthesis, webpage insights, chart data and a narrative
//! summary, aggregated into a [`MarketReport`](marketscope_shared::MarketReport)
//! and handed to a report sink.

pub mod aggregator;
pub mod capabilities;
pub mod pipeline;
pub mod prompts;
pub mod steps;

#[cfg(test)]
mod testing;

pub use capabilities::Capabilities;
pub use pipeline::{Pipeline, ProgressReporter, RunOutcome, RunPhase, SilentProgress};
pub use steps::StepOutcome;
