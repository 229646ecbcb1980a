pub mod endpoints;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::GeckoConfig;
use crate::error::{GeckoError, Result};

/// Header carrying the CoinGecko demo API key.
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Object keys listed when describing a payload's shape.
const MAX_SHAPE_KEYS: usize = 6;

/// HTTP client wrapper for the CoinGecko REST API.
#[derive(Debug, Clone)]
pub struct GeckoHttpClient {
    client: Client,
    base_url: Url,
    config: GeckoConfig,
}

impl GeckoHttpClient {
    pub fn new(config: GeckoConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("coinwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// GET a JSON resource below the base URL.
    ///
    /// `segments` are appended as individually escaped path segments.
    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!(url = %url, "GET");
        let mut request = self.client.get(url).query(query);
        if let Some(key) = &self.config.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        let resp = request.send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(GeckoError::Http {
                status,
                message: body,
            });
        }

        let body = resp.text().await?;
        decode(&body)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Get the client configuration.
    pub fn config(&self) -> &GeckoConfig {
        &self.config
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Decode a response body, reporting the payload shape when it does not fit.
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    if body.trim().is_empty() {
        return Err(GeckoError::Malformed {
            detail: "empty body".into(),
            shape: "empty".into(),
        });
    }
    let value: Value = serde_json::from_str(body).map_err(|e| GeckoError::Malformed {
        detail: e.to_string(),
        shape: "not JSON".into(),
    })?;
    <T as Deserialize>::deserialize(&value).map_err(|e| GeckoError::Malformed {
        detail: e.to_string(),
        shape: describe_shape(&value),
    })
}

/// One-line summary of a JSON value's structure, e.g. `array[3] of object{id, symbol}`.
pub fn describe_shape(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(_) => "bool".into(),
        Value::Number(_) => "number".into(),
        Value::String(_) => "string".into(),
        Value::Array(items) => match items.first() {
            Some(first) => format!("array[{}] of {}", items.len(), describe_shape(first)),
            None => "array[0]".into(),
        },
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).take(MAX_SHAPE_KEYS).collect();
            let more = if map.len() > MAX_SHAPE_KEYS { ", .." } else { "" };
            format!("object{{{}{more}}}", keys.join(", "))
        }
    }
}
