use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use common::{Error, Result};

/// Keyword overrides for a strategy's constructor parameters.
pub type StrategyParams = BTreeMap<String, f64>;

/// Top-level strategy config file (TOML).
///
/// Example `config/strategy.toml`:
/// ```toml
/// [strategy]
/// type = "rsi"
///
/// [strategy.params]
/// period = 14
/// overbought = 70.0
/// oversold = 30.0
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    pub strategy: StrategyConfig,
}

/// A named strategy variant plus its parameter overrides.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Registry name: "sma", "ema", "rsi", "macd" or "bbands".
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Indicator-specific parameters; omitted ones take the variant's defaults.
    #[serde(default)]
    pub params: StrategyParams,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::new("sma", StrategyParams::new())
    }
}

impl StrategyConfig {
    pub fn new(strategy_type: impl Into<String>, params: StrategyParams) -> Self {
        Self {
            strategy_type: strategy_type.into(),
            params,
        }
    }
}

impl std::fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.strategy_type)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, " ({})", params.join(", "))?;
        }
        Ok(())
    }
}

impl StrategyFileConfig {
    /// Load from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read strategy config at '{path}': {e}"))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse strategy config at '{path}': {e}")))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Parse `key=value` arguments (as typed in chat or on the command line).
pub fn parse_params<'a, I>(strategy: &str, args: I) -> Result<StrategyParams>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut params = StrategyParams::new();
    for arg in args {
        let (key, raw) = arg
            .split_once('=')
            .ok_or_else(|| Error::invalid_param(strategy, arg, "expected key=value"))?;
        let key = key.trim();
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| Error::invalid_param(strategy, key, format!("'{raw}' is not a number")))?;
        params.insert(key.to_string(), value);
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml_with_integer_params() {
        let cfg = StrategyFileConfig::from_toml_str(
            r#"
            [strategy]
            type = "sma"

            [strategy.params]
            short_window = 10
            long_window = 30
            "#,
        )
        .unwrap();
        assert_eq!(cfg.strategy.strategy_type, "sma");
        assert_eq!(cfg.strategy.params["short_window"], 10.0);
        assert_eq!(cfg.strategy.params["long_window"], 30.0);
    }

    #[test]
    fn params_table_is_optional() {
        let cfg = StrategyFileConfig::from_toml_str("[strategy]\ntype = \"macd\"\n").unwrap();
        assert!(cfg.strategy.params.is_empty());
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = StrategyFileConfig::from_toml_str("[strategy\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn parse_params_accepts_key_value_pairs() {
        let params = parse_params("rsi", ["period=7", "oversold = 25.5"]).unwrap();
        assert_eq!(params["period"], 7.0);
        assert_eq!(params["oversold"], 25.5);
    }

    #[test]
    fn parse_params_rejects_bare_words() {
        let err = parse_params("rsi", ["period"]).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn parse_params_rejects_non_numbers() {
        let err = parse_params("rsi", ["period=abc"]).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { param, .. } if param == "period"));
    }

    #[test]
    fn display_lists_params() {
        let cfg = StrategyConfig::new("sma", parse_params("sma", ["short_window=5"]).unwrap());
        assert_eq!(cfg.to_string(), "sma (short_window=5)");
    }
}
