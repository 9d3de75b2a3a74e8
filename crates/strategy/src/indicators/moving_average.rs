/// Rolling mean over `window` values, expanding until `window` values exist.
///
/// Every row is defined: row `i` averages `values[i + 1 - n..=i]` with
/// `n = min(i + 1, window)`.
pub fn sma(values: &[f64], window: usize) -> Vec<f64> {
    assert!(window > 0, "SMA window must be positive");
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Exponential moving average, `None` for the first `period - 1` rows.
///
/// Seeded with the SMA of the first `period` values, then
/// `ema = price * k + ema * (1 - k)` with `k = 2 / (period + 1)`.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    assert!(period > 0, "EMA period must be positive");
    let mut out = vec![None; values.len()];
    if values.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema_val = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(ema_val);

    for (i, &price) in values.iter().enumerate().skip(period) {
        ema_val = price * k + ema_val * (1.0 - k);
        out[i] = Some(ema_val);
    }
    out
}

/// [`ema`] with the warm-up rows filled by the expanding mean.
pub fn ema_expanding(values: &[f64], period: usize) -> Vec<f64> {
    let mut running = 0.0;
    ema(values, period)
        .into_iter()
        .zip(values)
        .enumerate()
        .map(|(i, (ema_val, &price))| {
            running += price;
            ema_val.unwrap_or(running / (i + 1) as f64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_expands_then_rolls() {
        let prices = vec![10.0, 11.0, 12.0, 9.0, 8.0, 13.0];
        let out = sma(&prices, 3);
        let expected = [10.0, 10.5, 11.0, 32.0 / 3.0, 29.0 / 3.0, 10.0];
        for (got, want) in out.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "got {got}, want {want}");
        }
    }

    #[test]
    fn sma_window_one_is_identity() {
        let prices = vec![3.0, 1.0, 4.0];
        assert_eq!(sma(&prices, 1), prices);
    }

    #[test]
    fn ema_undefined_until_seed() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0, 110.0];
        let out = ema(&prices, 5);
        assert!(out[..4].iter().all(Option::is_none));
        assert_eq!(out[4], Some(104.0));
        // Rising prices pull the EMA above its SMA seed
        assert!(out[5].unwrap() > 104.0);
    }

    #[test]
    fn ema_short_input_is_all_none() {
        assert!(ema(&[1.0, 2.0], 5).iter().all(Option::is_none));
    }

    #[test]
    fn ema_expanding_fills_warm_up() {
        let prices = vec![2.0, 4.0, 6.0, 8.0];
        let out = ema_expanding(&prices, 3);
        assert_eq!(out[0], 2.0);
        assert_eq!(out[1], 3.0);
        assert_eq!(out[2], 4.0);
        assert!((out[3] - (8.0 * 0.5 + 4.0 * 0.5)).abs() < 1e-12);
    }
}
