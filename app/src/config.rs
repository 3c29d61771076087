use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use log::*;
use r2d2::Pool;
use serde::{Deserialize, Serialize};

use infra::persistence::DocumentConnectionManager;

use crate::pricing::{FeeRules, Money};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub fees: Fees,
    #[serde(default = "Config::default_currency")]
    pub currency: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Fees {
    #[serde(default = "Fees::default_tax_rate")]
    pub tax_rate: f64,
    #[serde(default = "Fees::default_delivery_fee")]
    pub delivery_fee: u64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Overrides applied on top of the config file, named with a
/// `FOODHUB_` prefix: `FOODHUB_TAX_RATE`, `FOODHUB_DELIVERY_FEE`,
/// `FOODHUB_CURRENCY`.
#[derive(Deserialize, Debug, Default)]
struct EnvOverrides {
    tax_rate: Option<f64>,
    delivery_fee: Option<u64>,
    currency: Option<String>,
}

impl Config {
    fn default_currency() -> String {
        "R".to_string()
    }

    pub(crate) fn build(&self) -> Result<Pool<DocumentConnectionManager>> {
        debug!("Build pool from {:?}", self);

        let manager = DocumentConnectionManager::new();

        let builder = r2d2::Pool::builder();

        debug!("Pool builder: {:?}", builder);
        let pool = builder.build(manager).context("build pool")?;

        Ok(pool)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        let overrides = envy::prefixed("FOODHUB_")
            .from_env::<EnvOverrides>()
            .context("read FOODHUB_* overrides")?;
        if let Some(tax_rate) = overrides.tax_rate {
            self.fees.tax_rate = tax_rate;
        }
        if let Some(delivery_fee) = overrides.delivery_fee {
            self.fees.delivery_fee = delivery_fee;
        }
        if let Some(currency) = overrides.currency {
            self.currency = currency;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fees: Fees::default(),
            currency: Config::default_currency(),
        }
    }
}

impl Fees {
    // The checkout screen's constants: 5% tax, flat 500 delivery.
    fn default_tax_rate() -> f64 {
        0.05
    }

    fn default_delivery_fee() -> u64 {
        500
    }

    pub fn rules(&self) -> Result<FeeRules> {
        FeeRules::from_fraction(self.tax_rate, Money::in_minor(self.delivery_fee))
            .ok_or_else(|| anyhow!("tax rate out of range: {}", self.tax_rate))
    }
}

impl Default for Fees {
    fn default() -> Self {
        Fees {
            tax_rate: Fees::default_tax_rate(),
            delivery_fee: Fees::default_delivery_fee(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct EnvLogger {
    level: Option<LogLevel>,
    #[serde(default)]
    modules: HashMap<String, LogLevel>,
    #[serde(default)]
    timestamp_nanos: bool,
}

impl LogLevel {
    fn to_filter(&self) -> log::LevelFilter {
        match self {
            &LogLevel::Off => log::LevelFilter::Off,
            &LogLevel::Error => log::LevelFilter::Error,
            &LogLevel::Warn => log::LevelFilter::Warn,
            &LogLevel::Info => log::LevelFilter::Info,
            &LogLevel::Debug => log::LevelFilter::Debug,
            &LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl EnvLogger {
    pub fn builder(&self) -> env_logger::Builder {
        let mut b = env_logger::Builder::from_default_env();
        if let Some(level) = self.level.as_ref() {
            b.filter_level(level.to_filter());
        }

        for (module, level) in self.modules.iter() {
            b.filter_module(&module, level.to_filter());
        }

        if self.timestamp_nanos {
            b.format_timestamp_nanos();
        }

        return b;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use infra::persistence::Storage;

    #[test]
    fn an_empty_file_yields_the_stock_fees() -> Result<()> {
        let config: Config = toml::from_str("")?;

        assert_eq!(config, Config::default());
        let rules = config.fees.rules()?;
        assert_eq!(rules, FeeRules::default());
        Ok(())
    }

    #[test]
    fn fees_can_be_partially_overridden() -> Result<()> {
        let config: Config = toml::from_str(
            r#"
            [fees]
            tax_rate = 0.15
            "#,
        )?;

        assert_eq!(config.fees.tax_rate, 0.15);
        assert_eq!(config.fees.delivery_fee, 500);
        Ok(())
    }

    #[test]
    fn the_currency_symbol_is_configurable() -> Result<()> {
        let config: Config = toml::from_str(r#"currency = "$""#)?;

        assert_eq!(config.currency, "$");
        Ok(())
    }

    #[test]
    fn a_nonsense_tax_rate_is_refused() -> Result<()> {
        let config: Config = toml::from_str(
            r#"
            [fees]
            tax_rate = 2.5
            "#,
        )?;

        assert!(config.fees.rules().is_err());
        Ok(())
    }

    #[test]
    fn built_pools_start_from_an_empty_store() -> Result<()> {
        env_logger::try_init().unwrap_or_default();
        let config = Config::default();

        let pool = config.build()?;
        let conn = pool.get()?;
        let missing: Option<crate::orders::Cart> =
            conn.load(&crate::orders::Cart::session_id())?;

        assert!(missing.is_none());
        Ok(())
    }
}
