use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use common::{Candle, Error, MarketData, OhlcSeries, Result};

pub use common::market::{is_supported_interval, EOD_INTERVALS, INTRADAY_INTERVALS};

const BASE_URL: &str = "https://eodhd.com";

const EOD_LOOKBACK_DAYS: i64 = 365;
const INTRADAY_LOOKBACK_DAYS: i64 = 14;

/// REST client for the EODHD market-data API.
pub struct EodhdClient {
    api_token: String,
    base_url: String,
    http: Client,
}

impl EodhdClient {
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            api_token: api_token.into(),
            base_url: BASE_URL.to_string(),
            http,
        })
    }

    /// Point the client at another host (a proxy, or a mock server in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("api_token", self.api_token.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Provider(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }

    async fn fetch_eod(&self, symbol: &str, period: &str) -> Result<Vec<Candle>> {
        let to = Utc::now();
        let from = to - Duration::days(EOD_LOOKBACK_DAYS);
        let query = [
            ("period", period.to_string()),
            ("from", from.format("%Y-%m-%d").to_string()),
            ("to", to.format("%Y-%m-%d").to_string()),
            ("order", "a".to_string()),
            ("fmt", "json".to_string()),
        ];
        let body = self.get(&format!("/api/eod/{symbol}"), &query).await?;
        let bars: Vec<EodBar> = serde_json::from_str(&body)?;
        Ok(bars.into_iter().filter_map(EodBar::into_candle).collect())
    }

    async fn fetch_intraday(&self, symbol: &str, interval: &str) -> Result<Vec<Candle>> {
        let to = Utc::now();
        let from = to - Duration::days(INTRADAY_LOOKBACK_DAYS);
        let query = [
            ("interval", interval.to_string()),
            ("from", from.timestamp().to_string()),
            ("to", to.timestamp().to_string()),
            ("fmt", "json".to_string()),
        ];
        let body = self.get(&format!("/api/intraday/{symbol}"), &query).await?;
        let bars: Vec<IntradayBar> = serde_json::from_str(&body)?;
        Ok(bars.into_iter().filter_map(IntradayBar::into_candle).collect())
    }
}

#[async_trait]
impl MarketData for EodhdClient {
    async fn fetch_ohlc(&self, symbol: &str, interval: &str) -> Result<OhlcSeries> {
        let raw = if EOD_INTERVALS.contains(&interval) {
            self.fetch_eod(symbol, interval).await?
        } else if INTRADAY_INTERVALS.contains(&interval) {
            self.fetch_intraday(symbol, interval).await?
        } else {
            return Err(Error::InvalidInterval(interval.to_string()));
        };

        let fetched = raw.len();
        let series = OhlcSeries::new(ascending(raw))?;
        debug!(symbol, interval, fetched, kept = series.len(), "Fetched OHLC history");
        Ok(series)
    }

    async fn latest_price(&self, symbol: &str) -> Result<Option<f64>> {
        let query = [("fmt", "json".to_string())];
        let body = self.get(&format!("/api/real-time/{symbol}"), &query).await?;
        let quote: Quote = serde_json::from_str(&body)?;
        if quote.close.is_none() {
            warn!(symbol, "Real-time quote has no close price");
        }
        Ok(quote.close)
    }
}

/// Keep only rows later than every row before them.
fn ascending(candles: Vec<Candle>) -> Vec<Candle> {
    let mut out: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        if out.last().map_or(true, |prev| candle.timestamp > prev.timestamp) {
            out.push(candle);
        } else {
            debug!(timestamp = %candle.timestamp, "Dropping duplicate or out-of-order bar");
        }
    }
    out
}

// ─── Response types ───────────────────────────────────────────────────────────

/// The API reports missing values as `null` or `"NA"`; both read as `None`,
/// and so does any non-finite number.
fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    let number = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(number.filter(|v: &f64| v.is_finite()))
}

#[derive(Deserialize)]
struct EodBar {
    date: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    open: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    high: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    low: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    close: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    adjusted_close: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    volume: Option<f64>,
}

impl EodBar {
    fn into_candle(self) -> Option<Candle> {
        let timestamp = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?
            .and_utc();
        Some(Candle {
            timestamp,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
            adjusted_close: self.adjusted_close,
            volume: self.volume,
        })
    }
}

#[derive(Deserialize)]
struct IntradayBar {
    timestamp: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    open: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    high: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    low: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    close: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    volume: Option<f64>,
}

impl IntradayBar {
    fn into_candle(self) -> Option<Candle> {
        Some(Candle {
            timestamp: DateTime::from_timestamp(self.timestamp, 0)?,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
            adjusted_close: None,
            volume: self.volume,
        })
    }
}

#[derive(Deserialize)]
struct Quote {
    #[serde(default, deserialize_with = "lenient_f64")]
    close: Option<f64>,
}
