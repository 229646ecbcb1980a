pub mod config;
pub mod error;
pub mod rest;
pub mod types;

// ---- Top-level re-exports for ergonomic usage ----

pub use config::GeckoConfig;
pub use error::{GeckoError, Result};

// REST client
pub use rest::GeckoHttpClient;

// Instruments + charts
pub use types::{ChartSample, Instrument, MarketChart};
