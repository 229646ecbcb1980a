use crate::error::Result;
use crate::rest::GeckoHttpClient;
use crate::types::*;

impl GeckoHttpClient {
    // --- Markets ---

    /// GET /coins/markets - Current instruments ordered by market cap.
    pub async fn get_markets(&self) -> Result<Vec<Instrument>> {
        let config = self.config();
        let per_page = config.per_page.to_string();
        let page = config.page.to_string();
        self.get(
            &["coins", "markets"],
            &[
                ("vs_currency", config.vs_currency.as_str()),
                ("order", "market_cap_desc"),
                ("per_page", per_page.as_str()),
                ("page", page.as_str()),
                ("sparkline", "false"),
            ],
        )
        .await
    }

    // --- Charts ---

    /// GET /coins/{id}/market_chart - Price, market cap and volume series.
    pub async fn get_market_chart(&self, id: &str) -> Result<MarketChart> {
        let config = self.config();
        let days = config.chart_days.to_string();
        self.get(
            &["coins", id, "market_chart"],
            &[
                ("vs_currency", config.vs_currency.as_str()),
                ("days", days.as_str()),
            ],
        )
        .await
    }
}
