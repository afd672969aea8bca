//! Price quote providers.
//!
//! Defines the `QuoteGateway` trait and the DexScreener implementation.

pub mod dexscreener;

use anyhow::Result;
use async_trait::async_trait;

/// Abstraction over token price lookups.
///
/// `Ok(None)` means the provider answered but has no price for the
/// address. Callers treat both `Ok(None)` and `Err(_)` as "unavailable".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteGateway: Send + Sync {
    /// Current USD price for `address`.
    async fn fetch_price(&self, address: &str) -> Result<Option<f64>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}
