mod chart;
mod instrument;

pub use chart::{ChartSample, MarketChart};
pub use instrument::Instrument;
