//! Error types for MarketScope.
//!
//! Library crates use [`MarketScopeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! [`CapabilityError`] is the narrower failure type returned by capability
//! ports. Step executors convert it into fallback values at their boundary,
//! so it never reaches the pipeline caller.

use std::path::PathBuf;

/// Top-level error type for all MarketScope operations.
#[derive(Debug, thiserror::Error)]
pub enum MarketScopeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error outside of a capability port.
    #[error("network error: {0}")]
    Network(String),

    /// HTML or model-output parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Inference client error (API, transport, or response decoding).
    #[error("inference error: {0}")]
    Inference(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Caller input or data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// HTML-to-text conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MarketScopeError>;

impl MarketScopeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// CapabilityError
// ---------------------------------------------------------------------------

/// Failure of an external capability port (inference, fetch, search, lookup).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    /// The remote could not be reached at all.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The remote answered with a non-success status.
    #[error("{url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The provider signalled a block (captcha, 403, rate limiting).
    #[error("blocked: {0}")]
    Blocked(String),

    /// The call exceeded its time budget.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The remote answered, but the payload could not be used.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The capability is not configured or refused the request locally.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl CapabilityError {
    /// Classify a reqwest transport error.
    pub fn from_transport(url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("{url}: {err}"))
        } else {
            Self::Unreachable(format!("{url}: {err}"))
        }
    }
}
