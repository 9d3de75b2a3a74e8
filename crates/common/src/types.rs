use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Display format for candle timestamps in messages and trade logs.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One open/high/low/close observation for a fixed time bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Split/dividend adjusted close, only reported for end-of-day data.
    #[serde(default)]
    pub adjusted_close: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl Candle {
    /// The price strategies read: `adjusted_close` when present, else `close`.
    pub fn price(&self) -> f64 {
        self.adjusted_close.unwrap_or(self.close)
    }
}

/// Ascending, duplicate-free sequence of candles.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OhlcSeries {
    candles: Vec<Candle>,
}

impl OhlcSeries {
    /// Wrap `candles`, rejecting duplicate or out-of-order timestamps.
    /// The series is never reordered.
    pub fn new(candles: Vec<Candle>) -> Result<Self> {
        if let Some(w) = candles.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(Error::InvalidSeries(format!(
                "timestamp {} does not follow {}",
                w[1].timestamp.format(TIME_FORMAT),
                w[0].timestamp.format(TIME_FORMAT)
            )));
        }
        Ok(Self { candles })
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Strategy input prices, oldest first.
    pub fn prices(&self) -> Vec<f64> {
        self.candles.iter().map(Candle::price).collect()
    }
}

/// Directional stance of a strategy at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Stance {
    Short,
    #[default]
    Flat,
    Long,
}

impl Stance {
    pub fn value(self) -> i8 {
        match self {
            Stance::Short => -1,
            Stance::Flat => 0,
            Stance::Long => 1,
        }
    }

    /// `Long` when `a > b`, `Short` when `a < b`, `Flat` on a tie.
    pub fn compare(a: f64, b: f64) -> Self {
        if a > b {
            Stance::Long
        } else if a < b {
            Stance::Short
        } else {
            Stance::Flat
        }
    }
}

impl std::fmt::Display for Stance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// A candle annotated with the strategy's stance and its edge trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRow {
    pub candle: Candle,
    pub signal: Stance,
    /// `signal[i] - signal[i-1]`, zero on the first row.
    pub position: i8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalSeries {
    rows: Vec<SignalRow>,
}

impl SignalSeries {
    /// Zip `series` with one stance per candle and derive the `position` column.
    ///
    /// Panics if the lengths differ; strategies always emit one stance per row.
    pub fn from_stances(series: &OhlcSeries, stances: Vec<Stance>) -> Self {
        assert_eq!(
            series.len(),
            stances.len(),
            "strategy must emit exactly one stance per candle"
        );
        let mut prev: Option<Stance> = None;
        let rows = series
            .candles()
            .iter()
            .zip(stances)
            .map(|(candle, signal)| {
                let position = match prev.replace(signal) {
                    Some(p) => signal.value() - p.value(),
                    None => 0,
                };
                SignalRow {
                    candle: candle.clone(),
                    signal,
                    position,
                }
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[SignalRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&SignalRow> {
        self.rows.last()
    }

    pub fn signals(&self) -> Vec<i8> {
        self.rows.iter().map(|r| r.signal.value()).collect()
    }
}

/// Action reported to the operator when a new candle carries a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    pub fn from_stance(stance: Stance) -> Option<Self> {
        match stance {
            Stance::Long => Some(Action::Buy),
            Stance::Short => Some(Action::Sell),
            Stance::Flat => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Buy => write!(f, "Buy"),
            Action::Sell => write!(f, "Sell"),
        }
    }
}

/// A buy/sell notification for one symbol at one candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub symbol: String,
    pub action: Action,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl std::fmt::Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} signal for {} at {:.2} (timestamp: {})",
            self.action,
            self.symbol,
            self.price,
            self.timestamp.format(TIME_FORMAT)
        )
    }
}

/// Identifies one live evaluation context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextKey {
    pub symbol: String,
    pub interval: String,
}

impl ContextKey {
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
        }
    }
}

impl std::fmt::Display for ContextKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.symbol, self.interval)
    }
}
