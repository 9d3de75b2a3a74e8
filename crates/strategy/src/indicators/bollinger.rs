/// Bollinger Bands: rolling mean ± `multiplier` population standard deviations.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub length: usize,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub lower: f64,
    pub middle: f64,
    pub upper: f64,
}

impl BollingerBands {
    pub fn new(length: usize, multiplier: f64) -> Self {
        assert!(length > 0, "Bollinger length must be positive");
        Self { length, multiplier }
    }

    /// Bands per row; `None` until `length` values are available.
    pub fn compute(&self, closes: &[f64]) -> Vec<Option<Band>> {
        let n = self.length as f64;
        (0..closes.len())
            .map(|i| {
                if i + 1 < self.length {
                    return None;
                }
                let window = &closes[i + 1 - self.length..=i];
                let mean = window.iter().sum::<f64>() / n;
                let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
                let width = self.multiplier * variance.sqrt();
                Some(Band {
                    lower: mean - width,
                    middle: mean,
                    upper: mean + width,
                })
            })
            .collect()
    }
}
