//! Financial data providers and the caching layer around them
//!
//! One trait, [`FinancialDataProvider`], with two interchangeable upstreams:
//!
//! - [`AlphaVantageProvider`] (API key, client-side rate limiting)
//! - [`YahooProvider`] (no key required, the default)
//!
//! Both normalize upstream schemas and errors into the shared taxonomy.
//! [`CachedProvider`] composes a [`ValuationCache`] around any provider so
//! repeated requests for the same ticker stop at the cache instead of a
//! rate-limited API.

pub mod alpha_vantage;
pub mod cache;
pub mod cached_provider;
pub mod provider;
pub mod yahoo;

// Re-export main types for convenience
pub use alpha_vantage::AlphaVantageProvider;
pub use cache::{MemoryCache, ValuationCache, cache_key};
pub use cached_provider::CachedProvider;
pub use provider::FinancialDataProvider;
pub use yahoo::YahooProvider;
