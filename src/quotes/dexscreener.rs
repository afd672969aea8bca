//! DexScreener price lookups.
//!
//! API docs: https://docs.dexscreener.com/api/reference
//! Endpoint: `GET /latest/dex/search?q={address}`
//! Auth: none. The first returned pair's `priceUsd` is taken as the quote.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::QuoteGateway;
use crate::config::QuotesConfig;

const PROVIDER_NAME: &str = "dexscreener";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// `null` when nothing matches.
    #[serde(default)]
    pairs: Option<Vec<Pair>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pair {
    /// Decimal string, e.g. `"0.0001234"`. Absent for some pairs.
    #[serde(default)]
    price_usd: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// DexScreener quote client.
pub struct DexScreenerClient {
    http: Client,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(config: &QuotesConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("CALLWATCH/0.1.0 (token-call-tracker)")
            .build()
            .context("Failed to build HTTP client for DexScreener")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, address: &str) -> String {
        format!("{}?q={}", self.base_url, urlencoding::encode(address))
    }

    /// Pull the first pair's USD price out of a search response body.
    fn parse_price(body: &str) -> Result<Option<f64>> {
        let resp: SearchResponse =
            serde_json::from_str(body).context("Failed to parse DexScreener search response")?;

        let Some(raw) = resp
            .pairs
            .and_then(|pairs| pairs.into_iter().next())
            .and_then(|pair| pair.price_usd)
        else {
            return Ok(None);
        };

        let price: f64 = raw
            .trim()
            .parse()
            .with_context(|| format!("DexScreener returned a non-numeric price: {raw}"))?;
        Ok(Some(price))
    }
}

#[async_trait]
impl QuoteGateway for DexScreenerClient {
    async fn fetch_price(&self, address: &str) -> Result<Option<f64>> {
        let url = self.search_url(address);
        debug!(url = %url, "Fetching DexScreener quote");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("DexScreener request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("DexScreener API error {status}: {body}");
        }

        let body = resp
            .text()
            .await
            .context("Failed to read DexScreener response body")?;

        Self::parse_price(&body)
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_first_pair_price() {
        let body = r#"{"schemaVersion":"1.0.0","pairs":[
            {"chainId":"solana","priceUsd":"0.001234"},
            {"chainId":"solana","priceUsd":"9.99"}
        ]}"#;
        let price = DexScreenerClient::parse_price(body).unwrap();
        assert_eq!(price, Some(0.001234));
    }

    #[test]
    fn test_parse_null_pairs() {
        let body = r#"{"schemaVersion":"1.0.0","pairs":null}"#;
        assert_eq!(DexScreenerClient::parse_price(body).unwrap(), None);
    }

    #[test]
    fn test_parse_missing_pairs() {
        assert_eq!(DexScreenerClient::parse_price("{}").unwrap(), None);
    }

    #[test]
    fn test_parse_empty_pairs() {
        let body = r#"{"pairs":[]}"#;
        assert_eq!(DexScreenerClient::parse_price(body).unwrap(), None);
    }

    #[test]
    fn test_parse_pair_without_price() {
        let body = r#"{"pairs":[{"chainId":"solana"}]}"#;
        assert_eq!(DexScreenerClient::parse_price(body).unwrap(), None);
    }

    #[test]
    fn test_parse_non_numeric_price_errors() {
        let body = r#"{"pairs":[{"priceUsd":"n/a"}]}"#;
        assert!(DexScreenerClient::parse_price(body).is_err());
    }

    #[test]
    fn test_parse_invalid_json_errors() {
        assert!(DexScreenerClient::parse_price("<html>rate limited</html>").is_err());
    }

    #[test]
    fn test_search_url_encodes_address() {
        let client = DexScreenerClient::new(&QuotesConfig {
            base_url: "https://example.test/search/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(
            client.search_url("abc def"),
            "https://example.test/search?q=abc%20def"
        );
        assert_eq!(client.name(), "dexscreener");
    }
}
