//! Runtime configuration from environment variables

use crate::error::OptimizerError;
use crate::optimizer::OptimizerConfig;
use crate::products::ProductKind;
use crate::tiers::TierTable;
use crate::Result;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Rate sheet to load instead of the built-in one
    pub tier_table_path: Option<PathBuf>,
    pub optimizer: OptimizerConfig,
    /// Deadline for one optimizer request
    pub optimize_timeout: Duration,
    /// Largest total the HTTP API will optimize
    pub max_optimize_amount: u64,
    /// Finest increment an HTTP request may ask for
    pub min_increment: u64,
    /// Largest estimated search an HTTP request may start
    pub max_scenarios: u64,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tier_table_path: None,
            optimizer: OptimizerConfig::default(),
            optimize_timeout: Duration::from_secs(30),
            max_optimize_amount: 500_000,
            min_increment: 1_000,
            max_scenarios: 50_000_000_000,
            port: 8080,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get("TIER_TABLE_PATH") {
            config.tier_table_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = get("OPTIMIZER_INCREMENT") {
            config.optimizer.increment = parse_var("OPTIMIZER_INCREMENT", &raw)?;
        }
        if let Some(raw) = get("OPTIMIZER_TOP_K") {
            config.optimizer.top_k = parse_var("OPTIMIZER_TOP_K", &raw)?;
        }
        if let Some(raw) = get("OPTIMIZER_REPORT_EVERY") {
            config.optimizer.report_every = parse_var("OPTIMIZER_REPORT_EVERY", &raw)?;
        }
        if let Some(raw) = get("OPTIMIZER_INCLUDE_DBS") {
            let include: bool = parse_var("OPTIMIZER_INCLUDE_DBS", &raw)?;
            if include && !config.optimizer.products.contains(&ProductKind::DbsMultiplier) {
                config.optimizer.products.push(ProductKind::DbsMultiplier);
                config.optimizer.salary_products.push(ProductKind::DbsMultiplier);
            }
        }
        if let Some(raw) = get("OPTIMIZE_TIMEOUT_SECS") {
            config.optimize_timeout =
                Duration::from_secs(parse_var("OPTIMIZE_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = get("MAX_OPTIMIZE_AMOUNT") {
            config.max_optimize_amount = parse_var("MAX_OPTIMIZE_AMOUNT", &raw)?;
        }
        if let Some(raw) = get("OPTIMIZER_MIN_INCREMENT") {
            config.min_increment = parse_var("OPTIMIZER_MIN_INCREMENT", &raw)?;
        }
        if let Some(raw) = get("OPTIMIZER_MAX_SCENARIOS") {
            config.max_scenarios = parse_var("OPTIMIZER_MAX_SCENARIOS", &raw)?;
        }
        if let Some(raw) = get("PORT").or_else(|| get("API_PORT")) {
            config.port = parse_var("PORT", &raw)?;
        }

        config
            .optimizer
            .validate()
            .map_err(|e| OptimizerError::Config(e.to_string()))?;
        if config.optimizer.increment < config.min_increment {
            return Err(OptimizerError::Config(format!(
                "OPTIMIZER_INCREMENT {} is below OPTIMIZER_MIN_INCREMENT {}",
                config.optimizer.increment, config.min_increment
            )));
        }

        Ok(config)
    }

    /// Load the configured rate sheet, or the built-in one
    pub fn load_tiers(&self) -> Result<TierTable> {
        let Some(path) = &self.tier_table_path else {
            return TierTable::builtin();
        };

        let outcome = TierTable::from_json_file(path)?;
        if !outcome.skipped.is_empty() {
            warn!(
                path = %path.display(),
                skipped = outcome.skipped.len(),
                "Rate sheet loaded with skipped rows"
            );
        }
        info!(
            path = %path.display(),
            products = outcome.table.products().count(),
            "Rate sheet loaded"
        );
        Ok(outcome.table)
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| OptimizerError::Config(format!("{} has invalid value '{}'", key, raw)))
}
