use std::sync::Arc;

use teloxide::{dispatching::UpdateHandler, prelude::*, utils::command::BotCommands};
use tracing::{info, warn};

use engine::SignalService;
use strategy::{parse_params, StrategyRegistry};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Dependencies injected into every handler via `dptree`.
#[derive(Clone)]
pub struct BotDeps {
    pub service: Arc<SignalService>,
    pub allowed_user_ids: Arc<Vec<i64>>,
}

/// Telegram bot commands exposed to the operator.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "snake_case", description = "Signal bot commands:")]
pub enum Command {
    #[command(description = "Welcome message")]
    Start,
    #[command(description = "Show this help")]
    Help,
    #[command(description = "List available strategies and their defaults")]
    Strategies,
    #[command(description = "Show the active strategy")]
    Strategy,
    #[command(description = "Switch strategy: /set_strategy <name> [key=value ...]")]
    SetStrategy(String),
    #[command(description = "Track another symbol, e.g. /set_symbol MSFT.US")]
    SetSymbol(String),
    #[command(description = "Candle interval: 1m, 5m, 1h, d, w or m")]
    SetInterval(String),
    #[command(rename = "get_price", description = "Latest price of the tracked symbol")]
    Price,
    #[command(description = "Backtest: /backtest [strategy] [fee]")]
    Backtest(String),
    #[command(description = "Signal on the latest candle")]
    Analyse,
}

/// Start the Telegram bot in long-polling mode.
pub async fn start_bot(bot: Bot, deps: BotDeps) {
    let deps = Arc::new(deps);

    info!("Telegram bot starting (long-polling)");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    let command_handler = teloxide::filter_command::<Command, _>().endpoint(handle_command);

    Update::filter_message()
        .filter_map(|msg: Message| msg.from().map(|u| u.id))
        .filter_async(auth_filter)
        .branch(command_handler)
}

/// Silently drop messages from users not in the allowed list.
async fn auth_filter(user_id: UserId, deps: Arc<BotDeps>) -> bool {
    let uid = user_id.0 as i64;
    let allowed = deps.allowed_user_ids.contains(&uid);
    if !allowed {
        warn!(user_id = uid, "Unauthorized Telegram access attempt");
    }
    allowed
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command, deps: Arc<BotDeps>) -> HandlerResult {
    let text = reply(&deps.service, cmd).await;
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Reply text for `cmd`. Failures become their error message.
pub async fn reply(service: &SignalService, cmd: Command) -> String {
    match cmd {
        Command::Start => {
            "Welcome to the Trading Bot! Send /help to see what I can do.".to_string()
        }
        Command::Help => Command::descriptions().to_string(),
        Command::Strategies => {
            let mut text = String::from("Available strategies:");
            for line in StrategyRegistry::describe() {
                text.push('\n');
                text.push_str(&line);
            }
            text
        }
        Command::Strategy => format!("Current strategy: {}", service.current_strategy().await),
        Command::SetStrategy(args) => set_strategy(service, &args).await,
        Command::SetSymbol(arg) => match arg.split_whitespace().next() {
            Some(symbol) => {
                let cfg = service.set_symbol(symbol).await;
                format!("Symbol set to {}", cfg.symbol)
            }
            None => "Please provide a symbol.".to_string(),
        },
        Command::SetInterval(arg) => match arg.split_whitespace().next() {
            Some(interval) => match service.set_interval(interval).await {
                Ok(cfg) => format!("Interval set to {}", cfg.interval),
                Err(e) => e.to_string(),
            },
            None => "Please provide an interval.".to_string(),
        },
        Command::Price => match service.price().await {
            Ok((symbol, Some(price))) => format!("Current price of {symbol}: {price}"),
            Ok((symbol, None)) => {
                warn!(symbol = %symbol, "No price available");
                "Failed to fetch data.".to_string()
            }
            Err(e) => {
                warn!(error = %e, "Price lookup failed");
                "Failed to fetch data.".to_string()
            }
        },
        Command::Backtest(args) => backtest(service, &args).await,
        Command::Analyse => match service.latest_signal().await {
            Ok(Some(alert)) => alert.to_string(),
            Ok(None) => "No buy or sell signal on the latest candle.".to_string(),
            Err(e) => e.to_string(),
        },
    }
}

async fn set_strategy(service: &SignalService, args: &str) -> String {
    let mut words = args.split_whitespace();
    let Some(name) = words.next() else {
        return format!(
            "Usage: /set_strategy <name> [key=value ...]\nAvailable: {}",
            service.list_strategies().join(", ")
        );
    };
    let result = match parse_params(name, words) {
        Ok(params) => service.set_strategy(name, params).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(cfg) => format!("Strategy set to {cfg}"),
        Err(e) => e.to_string(),
    }
}

/// `/backtest`, `/backtest <strategy>`, `/backtest <fee>` or
/// `/backtest <strategy> <fee>`.
async fn backtest(service: &SignalService, args: &str) -> String {
    let words: Vec<&str> = args.split_whitespace().collect();
    let (strategy, fee) = match words.as_slice() {
        [] => (None, None),
        [one] => match one.parse::<f64>() {
            Ok(fee) => (None, Some(fee)),
            Err(_) => (Some(*one), None),
        },
        [name, fee, ..] => match fee.parse::<f64>() {
            Ok(fee) => (Some(*name), Some(fee)),
            Err(_) => return format!("Invalid fee '{fee}': expected a fraction such as 0.001"),
        },
    };
    match service.backtest_summary(strategy, fee).await {
        Ok(summary) => summary,
        Err(e) => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use common::{Candle, Error, MarketData, Notifier, OhlcSeries, Result};
    use engine::{Session, SessionConfig};
    use strategy::StrategyConfig;

    struct FixedMarket {
        closes: Vec<f64>,
        price: Option<f64>,
    }

    #[async_trait]
    impl MarketData for FixedMarket {
        async fn fetch_ohlc(&self, _symbol: &str, _interval: &str) -> Result<OhlcSeries> {
            let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
            let candles = self
                .closes
                .iter()
                .enumerate()
                .map(|(i, &close)| Candle {
                    timestamp: start + Duration::days(i as i64),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    adjusted_close: None,
                    volume: None,
                })
                .collect();
            OhlcSeries::new(candles)
        }

        async fn latest_price(&self, _symbol: &str) -> Result<Option<f64>> {
            self.price
                .map(Some)
                .ok_or_else(|| Error::Provider("quote unavailable".into()))
        }
    }

    #[derive(Default)]
    struct NullNotifier {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for NullNotifier {
        async fn notify(&self, message: &str) -> Result<()> {
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    fn service(closes: &[f64], price: Option<f64>) -> SignalService {
        let session = Session::new(SessionConfig {
            symbol: "AAPL.US".into(),
            interval: "d".into(),
            strategy: StrategyConfig::default(),
            fee_rate: 0.001,
            mark_to_market: false,
        });
        let market = Arc::new(FixedMarket {
            closes: closes.to_vec(),
            price,
        });
        SignalService::new(session, market, Arc::new(NullNotifier::default()))
    }

    #[test]
    fn commands_parse_with_arguments() {
        let cmd = Command::parse("/set_strategy rsi period=7", "bot").unwrap();
        assert_eq!(cmd, Command::SetStrategy("rsi period=7".into()));
        assert_eq!(Command::parse("/analyse", "bot").unwrap(), Command::Analyse);
    }

    #[test]
    fn session_commands_use_snake_case_names() {
        assert_eq!(
            Command::parse("/set_symbol MSFT.US", "bot").unwrap(),
            Command::SetSymbol("MSFT.US".into())
        );
        assert_eq!(
            Command::parse("/set_interval 1h", "bot").unwrap(),
            Command::SetInterval("1h".into())
        );
        assert_eq!(Command::parse("/get_price", "bot").unwrap(), Command::Price);
        assert!(Command::parse("/setsymbol MSFT.US", "bot").is_err());
        assert!(Command::parse("/price", "bot").is_err());
    }

    #[tokio::test]
    async fn strategies_lists_registry_in_order() {
        let text = reply(&service(&[], None), Command::Strategies).await;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Available strategies:");
        assert!(lines[1].starts_with("sma:"));
        assert!(lines[5].starts_with("bbands:"));
    }

    #[tokio::test]
    async fn set_strategy_round_trip() {
        let svc = service(&[], None);
        let text = reply(&svc, Command::SetStrategy("macd fast=5 slow=10".into())).await;
        assert_eq!(text, "Strategy set to macd (fast=5, slow=10)");
        assert_eq!(
            reply(&svc, Command::Strategy).await,
            "Current strategy: macd (fast=5, slow=10)"
        );
    }

    #[tokio::test]
    async fn unknown_strategy_is_reported_as_text() {
        let text = reply(&service(&[], None), Command::SetStrategy("foo".into())).await;
        assert_eq!(text, "Unknown strategy: foo");
    }

    #[tokio::test]
    async fn missing_arguments_prompt_the_user() {
        let svc = service(&[], None);
        assert_eq!(
            reply(&svc, Command::SetSymbol("".into())).await,
            "Please provide a symbol."
        );
        assert_eq!(
            reply(&svc, Command::SetInterval(" ".into())).await,
            "Please provide an interval."
        );
    }

    #[tokio::test]
    async fn price_failure_is_generic() {
        assert_eq!(
            reply(&service(&[], Some(187.5)), Command::Price).await,
            "Current price of AAPL.US: 187.5"
        );
        assert_eq!(
            reply(&service(&[], None), Command::Price).await,
            "Failed to fetch data."
        );
    }

    #[tokio::test]
    async fn backtest_on_empty_history_reports_error() {
        let text = reply(&service(&[], None), Command::Backtest(String::new())).await;
        assert_eq!(text, Error::InsufficientData.to_string());
    }

    #[tokio::test]
    async fn backtest_accepts_strategy_and_fee() {
        let closes = [10.0, 11.0, 12.0, 9.0, 8.0, 13.0];
        let text = reply(&service(&closes, None), Command::Backtest("sma 0".into())).await;
        assert!(text.starts_with("Backtest results for AAPL.US (d, sma)"));
        assert!(text.contains("Data points: 6"));

        let bad = reply(&service(&closes, None), Command::Backtest("sma lots".into())).await;
        assert!(bad.starts_with("Invalid fee 'lots'"));
    }
}
