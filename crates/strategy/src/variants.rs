use common::Stance;

use crate::indicators::{ema_expanding, sma, BollingerBands, MacdIndicator, RsiIndicator};
use crate::{Strategy, StrategyParams};

fn params<const N: usize>(pairs: [(&str, f64); N]) -> StrategyParams {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Long while the short SMA is above the long SMA, short while below.
#[derive(Debug, Clone)]
pub struct SmaCrossoverStrategy {
    pub short_window: usize,
    pub long_window: usize,
}

impl Strategy for SmaCrossoverStrategy {
    fn name(&self) -> &str {
        "sma"
    }

    fn params(&self) -> StrategyParams {
        params([
            ("short_window", self.short_window as f64),
            ("long_window", self.long_window as f64),
        ])
    }

    fn stances(&self, prices: &[f64]) -> Vec<Stance> {
        let short = sma(prices, self.short_window);
        let long = sma(prices, self.long_window);
        short.iter().zip(&long).map(|(&s, &l)| Stance::compare(s, l)).collect()
    }
}

/// Same rule as [`SmaCrossoverStrategy`] over exponential averages.
#[derive(Debug, Clone)]
pub struct EmaCrossoverStrategy {
    pub short_span: usize,
    pub long_span: usize,
}

impl Strategy for EmaCrossoverStrategy {
    fn name(&self) -> &str {
        "ema"
    }

    fn params(&self) -> StrategyParams {
        params([
            ("short_span", self.short_span as f64),
            ("long_span", self.long_span as f64),
        ])
    }

    fn stances(&self, prices: &[f64]) -> Vec<Stance> {
        let short = ema_expanding(prices, self.short_span);
        let long = ema_expanding(prices, self.long_span);
        short.iter().zip(&long).map(|(&s, &l)| Stance::compare(s, l)).collect()
    }
}

/// Long when oversold, short when overbought.
#[derive(Debug, Clone)]
pub struct RsiStrategy {
    pub indicator: RsiIndicator,
    pub overbought: f64,
    pub oversold: f64,
}

impl RsiStrategy {
    pub fn new(period: usize, overbought: f64, oversold: f64) -> Self {
        Self {
            indicator: RsiIndicator::new(period),
            overbought,
            oversold,
        }
    }
}

impl Strategy for RsiStrategy {
    fn name(&self) -> &str {
        "rsi"
    }

    fn params(&self) -> StrategyParams {
        params([
            ("period", self.indicator.period as f64),
            ("overbought", self.overbought),
            ("oversold", self.oversold),
        ])
    }

    fn stances(&self, prices: &[f64]) -> Vec<Stance> {
        self.indicator
            .compute(prices)
            .into_iter()
            .map(|rsi| match rsi {
                Some(v) if v < self.oversold => Stance::Long,
                Some(v) if v > self.overbought => Stance::Short,
                _ => Stance::Flat,
            })
            .collect()
    }
}

/// Long while the MACD line is above its signal line, short otherwise.
#[derive(Debug, Clone)]
pub struct MacdStrategy {
    pub indicator: MacdIndicator,
}

impl MacdStrategy {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            indicator: MacdIndicator::new(fast, slow, signal),
        }
    }
}

impl Strategy for MacdStrategy {
    fn name(&self) -> &str {
        "macd"
    }

    fn params(&self) -> StrategyParams {
        params([
            ("fast", self.indicator.fast as f64),
            ("slow", self.indicator.slow as f64),
            ("signal", self.indicator.signal as f64),
        ])
    }

    fn stances(&self, prices: &[f64]) -> Vec<Stance> {
        self.indicator
            .compute(prices)
            .into_iter()
            .map(|point| match point {
                Some(p) if p.macd > p.signal => Stance::Long,
                Some(_) => Stance::Short,
                None => Stance::Flat,
            })
            .collect()
    }
}

/// Long on a close above the upper band, short below the lower band.
#[derive(Debug, Clone)]
pub struct BollingerBreakoutStrategy {
    pub bands: BollingerBands,
}

impl BollingerBreakoutStrategy {
    pub fn new(length: usize, std: f64) -> Self {
        Self {
            bands: BollingerBands::new(length, std),
        }
    }
}

impl Strategy for BollingerBreakoutStrategy {
    fn name(&self) -> &str {
        "bbands"
    }

    fn params(&self) -> StrategyParams {
        params([
            ("length", self.bands.length as f64),
            ("std", self.bands.multiplier),
        ])
    }

    fn stances(&self, prices: &[f64]) -> Vec<Stance> {
        self.bands
            .compute(prices)
            .into_iter()
            .zip(prices)
            .map(|(band, &price)| match band {
                Some(b) if price > b.upper => Stance::Long,
                Some(b) if price < b.lower => Stance::Short,
                _ => Stance::Flat,
            })
            .collect()
    }
}
