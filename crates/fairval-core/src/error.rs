//! Error taxonomy for valuation operations

use thiserror::Error;

/// Result type alias for valuation operations
pub type Result<T> = std::result::Result<T, ValuationError>;

/// Error taxonomy shared by providers, engine and pipeline.
///
/// Transport-status mapping (404/429/500) belongs to whatever serves these
/// errors, not here.
#[derive(Debug, Error)]
pub enum ValuationError {
    /// Upstream has no record for the ticker
    #[error("ticker not found: {ticker}")]
    NotFound { ticker: String },

    /// Upstream signalled throttling; callers may back off and retry
    #[error("rate limit exceeded for {provider}")]
    RateLimited { provider: String },

    /// Network failure, malformed response or unexpected upstream schema
    #[error("upstream error: {0}")]
    Upstream(String),

    /// DCF input invariants violated; a caller bug, never retried
    #[error("invalid assumptions: {0}")]
    InvalidAssumptions(String),

    /// Degenerate arithmetic guard (e.g. zero current price)
    #[error("calculation error: {0}")]
    Calculation(String),

    /// Ticker fails the shape check before any upstream call
    #[error("invalid ticker: {0}")]
    InvalidTicker(String),

    /// Cache backend failure; swallowed and logged by the caching layer
    #[error("cache error: {0}")]
    Cache(String),

    /// Missing API key or invalid settings
    #[error("configuration error: {0}")]
    Config(String),
}

/// Rate-limit indicators commonly seen in upstream error text.
const RATE_LIMIT_INDICATORS: &[&str] = &["rate limit", "429", "too many requests"];

impl ValuationError {
    /// Classify an upstream failure from its error text.
    ///
    /// Upstreams rarely report throttling in a structured way, so the text is
    /// sniffed for the usual indicators (HTTP 429, "rate limit", "too many
    /// requests") and mapped to [`ValuationError::RateLimited`]; everything
    /// else is a generic [`ValuationError::Upstream`].
    pub fn from_upstream(provider: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if RATE_LIMIT_INDICATORS.iter().any(|i| lowered.contains(i)) {
            return Self::RateLimited {
                provider: provider.to_string(),
            };
        }
        Self::Upstream(format!("{provider}: {message}"))
    }

    /// Whether a retry could ever succeed without operator intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Upstream(_))
    }
}
