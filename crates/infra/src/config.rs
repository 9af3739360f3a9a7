//! Engine configuration.

use core::str::FromStr;

use tracing::warn;

use sportshub_inventory::DEFAULT_LOW_STOCK_THRESHOLD;

use crate::command_dispatcher::RetryPolicy;

pub const LOW_STOCK_THRESHOLD_VAR: &str = "SPORTSHUB_LOW_STOCK_THRESHOLD";
pub const MAX_COMMIT_ATTEMPTS_VAR: &str = "SPORTSHUB_MAX_COMMIT_ATTEMPTS";

/// Per-deployment engine settings.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ShopConfig {
    /// Items with `quantity <= low_stock_threshold` are flagged as low on stock.
    pub low_stock_threshold: i64,
    pub retry: RetryPolicy,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            retry: RetryPolicy::default(),
        }
    }
}

impl ShopConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Missing keys keep their defaults;
    /// malformed values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let low_stock_threshold = parse_or(
            &lookup,
            LOW_STOCK_THRESHOLD_VAR,
            defaults.low_stock_threshold,
            |v: &i64| *v >= 0,
        );
        let max_attempts = parse_or(
            &lookup,
            MAX_COMMIT_ATTEMPTS_VAR,
            defaults.retry.max_attempts,
            |v: &u32| *v >= 1,
        );

        Self {
            low_stock_threshold,
            retry: RetryPolicy::new(max_attempts),
        }
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    accept: impl Fn(&T) -> bool,
) -> T
where
    T: FromStr + Copy + core::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };

    match raw.trim().parse::<T>() {
        Ok(value) if accept(&value) => value,
        _ => {
            warn!(key, value = %raw, default = %default, "ignoring malformed setting");
            default
        }
    }
}
