use serde::{Deserialize, Deserializer, Serialize};

/// One tracked market asset as returned by `/coins/markets`.
///
/// Every descriptive field the API may omit or null out is an `Option`;
/// `current_price` is normalized to `0.0` when the source has no price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub current_price: f64,
    #[serde(default)]
    pub price_change_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub high_24h: Option<f64>,
    #[serde(default)]
    pub low_24h: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub total_supply: Option<f64>,
    #[serde(default)]
    pub max_supply: Option<f64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl Instrument {
    /// Bare instrument with only identity and price set.
    pub fn new(id: &str, symbol: &str, name: &str, current_price: f64) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            current_price,
            price_change_24h: None,
            price_change_percentage_24h: None,
            high_24h: None,
            low_24h: None,
            market_cap: None,
            total_volume: None,
            market_cap_rank: None,
            circulating_supply: None,
            total_supply: None,
            max_supply: None,
            image: None,
            last_updated: None,
        }
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let price = Option::<f64>::deserialize(deserializer)?;
    Ok(price.filter(|p| p.is_finite() && *p >= 0.0).unwrap_or(0.0))
}
