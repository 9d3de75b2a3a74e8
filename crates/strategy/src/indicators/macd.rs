use super::moving_average::ema;

/// MACD (Moving Average Convergence/Divergence) indicator.
///
/// Computes: MACD line = EMA(fast) − EMA(slow), Signal = EMA(macd_line, signal_period).
/// The MACD line is defined from row `slow - 1`, the signal line from row
/// `slow + signal - 2`.
#[derive(Debug, Clone)]
pub struct MacdIndicator {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

/// MACD and signal line values on one row where both are defined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
}

impl MacdPoint {
    pub fn histogram(&self) -> f64 {
        self.macd - self.signal
    }
}

impl MacdIndicator {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast > 0 && signal > 0, "MACD periods must be positive");
        assert!(fast < slow, "MACD fast period must be less than slow period");
        Self { fast, slow, signal }
    }

    /// Compute the MACD series from close prices (oldest first).
    pub fn compute(&self, closes: &[f64]) -> Vec<Option<MacdPoint>> {
        let fast = ema(closes, self.fast);
        let slow = ema(closes, self.slow);

        let macd_line: Vec<Option<f64>> = fast
            .iter()
            .zip(&slow)
            .map(|(f, s)| Some((*f)? - (*s)?))
            .collect();

        // Signal line runs over the defined part of the MACD line only
        let first_defined = self.slow - 1;
        let mut out = vec![None; closes.len()];
        if closes.len() <= first_defined {
            return out;
        }

        let defined: Vec<f64> = macd_line[first_defined..].iter().flatten().copied().collect();
        let signal_line = ema(&defined, self.signal);

        for (offset, sig) in signal_line.into_iter().enumerate() {
            let row = first_defined + offset;
            if let (Some(macd), Some(signal)) = (macd_line[row], sig) {
                out[row] = Some(MacdPoint { macd, signal });
            }
        }
        out
    }
}
