//! Shared types, error model, contracts, ports, and configuration for MarketScope.
//!
//! This crate is the foundation depended on by all other MarketScope crates.
//! It provides:
//! - [`MarketScopeError`] / [`CapabilityError`], the error types
//! - Domain types ([`Query`], [`CompetitorSet`], [`MarketReport`], ...)
//! - Validation contracts ([`Validated`], [`Contract`]) and model-output drafts
//! - Capability ports ([`InferencePort`], [`PageFetcher`], [`WebSearch`], [`StoreLookup`], [`ReportSink`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod contract;
pub mod drafts;
pub mod error;
pub mod ports;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FetchConfig, OpenRouterConfig, PipelineConfig, PipelineSection, SearchConfig,
    StorageConfig, StoresConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, validate_api_key,
};
pub use contract::{Checker, Contract, Validated, Violation, validate, validate_json};
pub use error::{CapabilityError, MarketScopeError, Result};
pub use ports::{
    FetchedPage, InferencePort, InferenceRequest, OutputContract, PageFetcher, ReportSink,
    SharedFetcher, SharedInference, SharedSearch, SharedSink, SharedStores, StoreLookup, TaskKind,
    WebSearch,
};
pub use types::{
    BarChartRow, COMPETITOR_COUNT, ChartDataset, Competitor, CompetitorSet, GapMatrixRow,
    MarketReport, PageInsight, Query, QueryKind, REPORT_SCHEMA_VERSION, RecordId, Relevance,
    Review, ReviewBundle, StepKind, StepLedger, StepRecord, StepStatus, Storefront, SupportStatus,
    ThreadId, TrendSnapshot, UnmetNeed,
};
