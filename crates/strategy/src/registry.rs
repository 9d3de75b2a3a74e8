use tracing::debug;

use common::{Error, Result};

use crate::config::{StrategyConfig, StrategyParams};
use crate::variants::{
    BollingerBreakoutStrategy, EmaCrossoverStrategy, MacdStrategy, RsiStrategy,
    SmaCrossoverStrategy,
};
use crate::Strategy;

type Builder = fn(&Resolved) -> Result<Box<dyn Strategy>>;

/// Largest accepted window or period.
pub const MAX_WINDOW: usize = u32::MAX as usize;

/// One constructible strategy variant.
pub struct StrategyEntry {
    pub name: &'static str,
    pub description: &'static str,
    /// Accepted parameter names with their defaults, in display order.
    pub defaults: &'static [(&'static str, f64)],
    build: Builder,
}

impl StrategyEntry {
    /// One-line summary, e.g. `sma: SMA crossover (short_window=20, long_window=50)`.
    pub fn summary(&self) -> String {
        let params: Vec<String> = self
            .defaults
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("{}: {} ({})", self.name, self.description, params.join(", "))
    }
}

/// Fixed table of every strategy variant. Order is the listing order.
static ENTRIES: &[StrategyEntry] = &[
    StrategyEntry {
        name: "sma",
        description: "SMA crossover",
        defaults: &[("short_window", 20.0), ("long_window", 50.0)],
        build: build_sma,
    },
    StrategyEntry {
        name: "ema",
        description: "EMA crossover",
        defaults: &[("short_span", 12.0), ("long_span", 26.0)],
        build: build_ema,
    },
    StrategyEntry {
        name: "rsi",
        description: "RSI overbought/oversold",
        defaults: &[("period", 14.0), ("overbought", 70.0), ("oversold", 30.0)],
        build: build_rsi,
    },
    StrategyEntry {
        name: "macd",
        description: "MACD vs signal line",
        defaults: &[("fast", 12.0), ("slow", 26.0), ("signal", 9.0)],
        build: build_macd,
    },
    StrategyEntry {
        name: "bbands",
        description: "Bollinger Bands breakout",
        defaults: &[("length", 20.0), ("std", 2.0)],
        build: build_bbands,
    },
];

/// Maps strategy names to constructible variants.
///
/// The table is compiled in; there is no runtime registration.
pub struct StrategyRegistry;

impl StrategyRegistry {
    /// Available strategy names, in registry order.
    pub fn list() -> Vec<&'static str> {
        ENTRIES.iter().map(|e| e.name).collect()
    }

    pub fn entries() -> &'static [StrategyEntry] {
        ENTRIES
    }

    /// One summary line per entry, in registry order.
    pub fn describe() -> Vec<String> {
        ENTRIES.iter().map(StrategyEntry::summary).collect()
    }

    /// Look up an entry by name, case-insensitively.
    pub fn entry(name: &str) -> Result<&'static StrategyEntry> {
        let key = name.trim().to_lowercase();
        ENTRIES
            .iter()
            .find(|e| e.name == key)
            .ok_or_else(|| Error::UnknownStrategy(name.trim().to_string()))
    }

    /// Build a new strategy instance. Omitted parameters take the variant's
    /// defaults; unrecognised ones fail with `InvalidParameter`.
    pub fn create(name: &str, params: &StrategyParams) -> Result<Box<dyn Strategy>> {
        let entry = Self::entry(name)?;

        if let Some(unknown) = params
            .keys()
            .find(|k| !entry.defaults.iter().any(|(accepted, _)| *accepted == k.as_str()))
        {
            let accepted: Vec<&str> = entry.defaults.iter().map(|(k, _)| *k).collect();
            return Err(Error::invalid_param(
                entry.name,
                unknown,
                format!("unsupported parameter (accepted: {})", accepted.join(", ")),
            ));
        }

        let resolved = Resolved { entry, params };
        let strategy = (entry.build)(&resolved)?;
        debug!(strategy = entry.name, params = ?strategy.params(), "Constructed strategy");
        Ok(strategy)
    }

    pub fn from_config(cfg: &StrategyConfig) -> Result<Box<dyn Strategy>> {
        Self::create(&cfg.strategy_type, &cfg.params)
    }
}

// ─── Parameter resolution ─────────────────────────────────────────────────────

/// Caller overrides layered over an entry's defaults.
struct Resolved<'a> {
    entry: &'static StrategyEntry,
    params: &'a StrategyParams,
}

impl Resolved<'_> {
    fn param_f64(&self, key: &str) -> Result<f64> {
        let value = match self.params.get(key) {
            Some(v) => *v,
            None => self
                .entry
                .defaults
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| *v)
                .ok_or_else(|| Error::invalid_param(self.entry.name, key, "no default"))?,
        };
        if !value.is_finite() {
            return Err(self.invalid(key, format!("{value} is not a finite number")));
        }
        Ok(value)
    }

    fn param_usize(&self, key: &str) -> Result<usize> {
        let value = self.param_f64(key)?;
        if value < 1.0 || value.fract() != 0.0 {
            return Err(self.invalid(key, format!("{value} is not a positive integer")));
        }
        if value > MAX_WINDOW as f64 {
            return Err(self.invalid(key, format!("{value} exceeds the maximum of {MAX_WINDOW}")));
        }
        Ok(value as usize)
    }

    fn invalid(&self, key: &str, reason: impl Into<String>) -> Error {
        Error::invalid_param(self.entry.name, key, reason)
    }
}

// ─── Strategy builders ────────────────────────────────────────────────────────

fn build_sma(p: &Resolved) -> Result<Box<dyn Strategy>> {
    Ok(Box::new(SmaCrossoverStrategy {
        short_window: p.param_usize("short_window")?,
        long_window: p.param_usize("long_window")?,
    }))
}

fn build_ema(p: &Resolved) -> Result<Box<dyn Strategy>> {
    Ok(Box::new(EmaCrossoverStrategy {
        short_span: p.param_usize("short_span")?,
        long_span: p.param_usize("long_span")?,
    }))
}

fn build_rsi(p: &Resolved) -> Result<Box<dyn Strategy>> {
    let period = p.param_usize("period")?;
    let overbought = p.param_f64("overbought")?;
    let oversold = p.param_f64("oversold")?;
    if oversold > overbought {
        return Err(p.invalid(
            "oversold",
            format!("oversold ({oversold}) must not exceed overbought ({overbought})"),
        ));
    }
    Ok(Box::new(RsiStrategy::new(period, overbought, oversold)))
}

fn build_macd(p: &Resolved) -> Result<Box<dyn Strategy>> {
    let fast = p.param_usize("fast")?;
    let slow = p.param_usize("slow")?;
    let signal = p.param_usize("signal")?;
    if fast >= slow {
        return Err(p.invalid(
            "fast",
            format!("fast period ({fast}) must be less than slow period ({slow})"),
        ));
    }
    Ok(Box::new(MacdStrategy::new(fast, slow, signal)))
}

fn build_bbands(p: &Resolved) -> Result<Box<dyn Strategy>> {
    let length = p.param_usize("length")?;
    let std = p.param_f64("std")?;
    if std < 0.0 {
        return Err(p.invalid("std", "multiplier must not be negative"));
    }
    Ok(Box::new(BollingerBreakoutStrategy::new(length, std)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_params;

    #[test]
    fn lists_every_variant_in_order() {
        assert_eq!(
            StrategyRegistry::list(),
            vec!["sma", "ema", "rsi", "macd", "bbands"]
        );
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = StrategyRegistry::create("foo", &StrategyParams::new()).err().unwrap();
        assert!(matches!(err, Error::UnknownStrategy(name) if name == "foo"));
    }

    #[test]
    fn names_are_case_insensitive() {
        let strategy = StrategyRegistry::create("  MACD ", &StrategyParams::new()).unwrap();
        assert_eq!(strategy.name(), "macd");
    }

    #[test]
    fn omitted_params_take_defaults() {
        let strategy = StrategyRegistry::create("rsi", &StrategyParams::new()).unwrap();
        let params = strategy.params();
        assert_eq!(params["period"], 14.0);
        assert_eq!(params["overbought"], 70.0);
        assert_eq!(params["oversold"], 30.0);
    }

    #[test]
    fn overrides_are_applied() {
        let params = parse_params("sma", ["short_window=5"]).unwrap();
        let strategy = StrategyRegistry::create("sma", &params).unwrap();
        assert_eq!(strategy.params()["short_window"], 5.0);
        assert_eq!(strategy.params()["long_window"], 50.0);
    }

    #[test]
    fn unrecognised_param_is_rejected() {
        let params = parse_params("sma", ["period=5"]).unwrap();
        let err = StrategyRegistry::create("sma", &params).err().unwrap();
        assert!(matches!(
            err,
            Error::InvalidParameter { strategy, param, .. } if strategy == "sma" && param == "period"
        ));
    }

    #[test]
    fn fractional_window_is_rejected() {
        let params = parse_params("bbands", ["length=2.5"]).unwrap();
        assert!(matches!(
            StrategyRegistry::create("bbands", &params),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn zero_window_is_rejected() {
        let params = parse_params("ema", ["long_span=0"]).unwrap();
        assert!(StrategyRegistry::create("ema", &params).is_err());
    }

    #[test]
    fn huge_window_is_rejected() {
        let params = parse_params("rsi", ["period=1e30"]).unwrap();
        assert!(matches!(
            StrategyRegistry::create("rsi", &params),
            Err(Error::InvalidParameter { param, .. }) if param == "period"
        ));
    }

    #[test]
    fn largest_windows_never_panic_on_short_input() {
        let max = MAX_WINDOW.to_string();
        let cases: [(&str, Vec<String>); 5] = [
            ("sma", vec![format!("short_window={max}"), format!("long_window={max}")]),
            ("ema", vec![format!("short_span={max}"), format!("long_span={max}")]),
            ("rsi", vec![format!("period={max}")]),
            ("macd", vec![format!("slow={max}"), format!("signal={max}")]),
            ("bbands", vec![format!("length={max}")]),
        ];
        for (name, args) in &cases {
            let params = parse_params(name, args.iter().map(String::as_str)).unwrap();
            let strategy = StrategyRegistry::create(name, &params).unwrap();
            assert_eq!(strategy.stances(&[1.0, 2.0, 3.0]).len(), 3, "{name}");
        }
    }

    #[test]
    fn macd_requires_fast_below_slow() {
        let params = parse_params("macd", ["fast=30"]).unwrap();
        assert!(matches!(
            StrategyRegistry::create("macd", &params),
            Err(Error::InvalidParameter { param, .. }) if param == "fast"
        ));
    }

    #[test]
    fn rsi_thresholds_must_be_ordered() {
        let params = parse_params("rsi", ["oversold=80"]).unwrap();
        assert!(StrategyRegistry::create("rsi", &params).is_err());
    }

    #[test]
    fn from_config_builds_named_variant() {
        let cfg = StrategyConfig::new("BBANDS", StrategyParams::new());
        let strategy = StrategyRegistry::from_config(&cfg).unwrap();
        assert_eq!(strategy.name(), "bbands");
    }

    #[test]
    fn summary_shows_defaults() {
        let entry = StrategyRegistry::entry("sma").unwrap();
        assert_eq!(
            entry.summary(),
            "sma: SMA crossover (short_window=20, long_window=50)"
        );
    }
}
