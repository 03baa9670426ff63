//! Layered application configuration.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults (`#[serde(default)]` on every section).
//! 2. An optional TOML file passed with `--config`.
//! 3. Environment variables prefixed `TRADING_LAB_`, nested with `__`
//!    (e.g. `TRADING_LAB_FEES__FIXED_FEE=19`, `TRADING_LAB_UNIVERSE=EQNR,NHY`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use trading::{FeeSchedule, InstrumentId, RiskLimits, StrategyParams, WeeklySchedule};

pub const ENV_PREFIX: &str = "TRADING_LAB";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn default_market_data_secs() -> u64 {
    30
}

fn default_execution_secs() -> u64 {
    60
}

/// Caller-supplied limits for the two blocking external calls of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default = "default_market_data_secs")]
    pub market_data_secs: u64,
    #[serde(default = "default_execution_secs")]
    pub execution_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            market_data_secs: default_market_data_secs(),
            execution_secs: default_execution_secs(),
        }
    }
}

impl Timeouts {
    pub fn market_data(&self) -> Duration {
        Duration::from_secs(self.market_data_secs)
    }

    pub fn execution(&self) -> Duration {
        Duration::from_secs(self.execution_secs)
    }
}

/// Complete configuration of one trader deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Instruments considered for purchase. Held instruments are always scored too.
    pub universe: Vec<InstrumentId>,
    /// Cash the ledger starts from when no ledger exists yet.
    pub opening_cash: f64,
    pub data_dir: PathBuf,
    pub weekly: WeeklySchedule,
    pub strategy: StrategyParams,
    pub limits: RiskLimits,
    pub fees: FeeSchedule,
    pub timeouts: Timeouts,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            universe: Vec::new(),
            opening_cash: 0.0,
            data_dir: PathBuf::from("data"),
            weekly: WeeklySchedule::default(),
            strategy: StrategyParams::default(),
            limits: RiskLimits::default(),
            fees: FeeSchedule::default(),
            timeouts: Timeouts::default(),
        }
    }
}

impl AppConfig {
    /// Loads defaults, then `file` (if any), then the environment, and validates the result.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("universe")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the decision engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn check(ok: bool, msg: impl Into<String>) -> Result<(), ConfigError> {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::Invalid(msg.into()))
            }
        }

        let growth = self.weekly.growth_target;
        check(
            growth.is_finite() && growth > 0.0 && growth <= 1.0,
            format!("weekly.growth_target must be in (0, 1], got {}", growth),
        )?;
        check(
            self.opening_cash.is_finite() && self.opening_cash >= 0.0,
            format!("opening_cash must be non-negative, got {}", self.opening_cash),
        )?;

        let limits = &self.limits;
        check(
            limits.max_single_exposure > 0.0 && limits.max_single_exposure <= 1.0,
            format!(
                "limits.max_single_exposure must be in (0, 1], got {}",
                limits.max_single_exposure
            ),
        )?;
        check(
            limits.max_volatility.is_finite() && limits.max_volatility >= 0.0,
            format!("limits.max_volatility must be non-negative, got {}", limits.max_volatility),
        )?;
        check(
            limits.min_distinct_holdings >= 1,
            "limits.min_distinct_holdings must be at least 1",
        )?;
        check(limits.min_volume >= 0.0, "limits.min_volume must be non-negative")?;
        check(
            limits.max_per_sector != Some(0),
            "limits.max_per_sector must be at least 1 when set",
        )?;

        let strategy = &self.strategy;
        check(
            strategy.min_history >= 3,
            format!("strategy.min_history must be at least 3, got {}", strategy.min_history),
        )?;
        check(
            strategy.lookback_window >= strategy.min_history,
            format!(
                "strategy.lookback_window ({}) must be >= strategy.min_history ({})",
                strategy.lookback_window, strategy.min_history
            ),
        )?;
        check(strategy.weekly_horizon >= 1, "strategy.weekly_horizon must be at least 1")?;
        check(
            strategy.decay_threshold.is_finite() && strategy.decay_threshold >= 0.0,
            "strategy.decay_threshold must be non-negative",
        )?;
        check(strategy.min_buy_score.is_finite(), "strategy.min_buy_score must be finite")?;

        let fees = &self.fees;
        check(
            fees.fixed_fee.is_finite() && fees.fixed_fee >= 0.0,
            "fees.fixed_fee must be non-negative",
        )?;
        check(
            fees.variable_rate >= 0.0 && fees.variable_rate < 1.0,
            "fees.variable_rate must be in [0, 1)",
        )?;
        check(
            fees.max_commission_ratio > 0.0,
            "fees.max_commission_ratio must be positive",
        )?;

        check(
            self.timeouts.market_data_secs > 0 && self.timeouts.execution_secs > 0,
            "timeouts must be positive",
        )?;
        Ok(())
    }

    /// Applies a `--data-dir` override from the command line.
    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }
}
