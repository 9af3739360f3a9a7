//! Server settings read from the process environment.

use std::net::SocketAddr;

use anyhow::Context;

use sportshub_infra::ShopConfig;

pub const BIND_ADDR_VAR: &str = "SPORTSHUB_BIND_ADDR";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
#[cfg(feature = "postgres")]
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub shop: ShopConfig,
    /// Postgres connection string; the in-memory store is used when unset.
    #[cfg(feature = "postgres")]
    pub database_url: Option<String>,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let raw = lookup(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {BIND_ADDR_VAR}: {raw}"))?;

        Ok(Self {
            bind_addr,
            shop: ShopConfig::from_lookup(&lookup),
            #[cfg(feature = "postgres")]
            database_url: lookup(DATABASE_URL_VAR).filter(|url| !url.trim().is_empty()),
        })
    }
}
