pub mod config;
pub mod indicators;
pub mod registry;
pub mod variants;

pub use config::{parse_params, StrategyConfig, StrategyFileConfig, StrategyParams};
pub use registry::{StrategyEntry, StrategyRegistry};
pub use variants::{
    BollingerBreakoutStrategy, EmaCrossoverStrategy, MacdStrategy, RsiStrategy,
    SmaCrossoverStrategy,
};

use common::{Error, OhlcSeries, Result, SignalSeries, Stance};

/// All strategy implementations must satisfy this trait.
pub trait Strategy: Send + Sync {
    /// Registry name of this strategy (e.g. "sma").
    fn name(&self) -> &str;

    /// The fully resolved parameters this instance was built with.
    fn params(&self) -> StrategyParams;

    /// One stance per price, oldest first. Must return `prices.len()` items
    /// and must not panic on short input.
    fn stances(&self, prices: &[f64]) -> Vec<Stance>;

    /// Annotate `series` with `signal` and `position`.
    ///
    /// Reads `adjusted_close` when present, else `close`. Fails with
    /// `InsufficientData` on an empty series.
    fn generate_signals(&self, series: &OhlcSeries) -> Result<SignalSeries> {
        if series.is_empty() {
            return Err(Error::InsufficientData);
        }
        let stances = self.stances(&series.prices());
        Ok(SignalSeries::from_stances(series, stances))
    }
}
