use async_trait::async_trait;

use crate::{OhlcSeries, Result};

/// End-of-day periods: daily, weekly, monthly.
pub const EOD_INTERVALS: [&str; 3] = ["d", "w", "m"];
/// Intraday bar sizes.
pub const INTRADAY_INTERVALS: [&str; 3] = ["1m", "5m", "1h"];

/// Whether `interval` is one of the supported candle intervals.
pub fn is_supported_interval(interval: &str) -> bool {
    EOD_INTERVALS.contains(&interval) || INTRADAY_INTERVALS.contains(&interval)
}

/// Abstraction over the market-data provider.
///
/// `EodhdClient` implements this against the EODHD REST API. Tests use
/// in-memory fakes. Implementations drop rows with missing prices and hand
/// back series in ascending time order.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Fetch the recent OHLC history of `symbol` at the given candle interval.
    async fn fetch_ohlc(&self, symbol: &str, interval: &str) -> Result<OhlcSeries>;

    /// Latest traded price, or `None` when the provider has no quote.
    async fn latest_price(&self, symbol: &str) -> Result<Option<f64>>;
}

/// Outbound delivery of plain-text messages (Telegram in production).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}
