use std::time::Duration;

/// Public CoinGecko v3 endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Configuration for the CoinGecko client.
#[derive(Debug, Clone)]
pub struct GeckoConfig {
    /// Base URL of the API (e.g. `https://api.coingecko.com/api/v3`).
    pub base_url: String,
    /// Optional demo API key, sent as `x-cg-demo-api-key`.
    pub api_key: Option<String>,
    /// Quote currency for prices and market caps.
    pub vs_currency: String,
    /// Instruments per page of `/coins/markets`.
    pub per_page: u32,
    /// Page of `/coins/markets` to request.
    pub page: u32,
    /// History window for `/coins/{id}/market_chart`, in days.
    pub chart_days: u32,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for GeckoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: None,
            vs_currency: "usd".into(),
            per_page: 100,
            page: 1,
            chart_days: 1,
            request_timeout: Duration::from_secs(10),
        }
    }
}
