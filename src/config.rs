//! Process configuration, read from the environment once at startup.

use std::time::Duration;

use eyre::{eyre, Result, WrapErr};
use url::Url;

use crate::listing::{
    ListingSelectors, DEFAULT_ITEM_SELECTOR, DEFAULT_LINK_SELECTOR, DEFAULT_PRICE_SELECTOR,
    DEFAULT_TITLE_SELECTOR,
};

pub const DEFAULT_SITE_URL: &str = "https://www.hepsiburada.com";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string (`DATABASE_URL`).
    pub database_url: String,
    /// Root that category slugs and relative product links hang off.
    pub site_url: Url,
    /// Per-request timeout. `None` keeps the HTTP client's default.
    pub request_timeout: Option<Duration>,
    pub max_connections: u32,
    /// Apply the bundled migrations before scraping.
    pub run_migrations: bool,
    pub selectors: ListingSelectors,
}

impl Config {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or_else(|| eyre!("DATABASE_URL is not set"))?;

        let site_url = var("SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_owned());
        let site_url =
            Url::parse(&site_url).wrap_err_with(|| format!("invalid SITE_URL {site_url:?}"))?;

        let request_timeout = var("REQUEST_TIMEOUT_SECS")
            .map(|secs| {
                secs.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .wrap_err_with(|| format!("invalid REQUEST_TIMEOUT_SECS {secs:?}"))
            })
            .transpose()?;

        let max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .wrap_err_with(|| format!("invalid DATABASE_MAX_CONNECTIONS {value:?}"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let run_migrations = match var("RUN_MIGRATIONS") {
            Some(value) => {
                parse_flag(&value).ok_or_else(|| eyre!("invalid RUN_MIGRATIONS {value:?}"))?
            }
            None => false,
        };

        let selectors = ListingSelectors::new(
            &var("LISTING_ITEM_SELECTOR").unwrap_or_else(|| DEFAULT_ITEM_SELECTOR.to_owned()),
            &var("LISTING_TITLE_SELECTOR").unwrap_or_else(|| DEFAULT_TITLE_SELECTOR.to_owned()),
            &var("LISTING_LINK_SELECTOR").unwrap_or_else(|| DEFAULT_LINK_SELECTOR.to_owned()),
            &var("LISTING_PRICE_SELECTOR").unwrap_or_else(|| DEFAULT_PRICE_SELECTOR.to_owned()),
        )?;

        Ok(Config {
            database_url,
            site_url,
            request_timeout,
            max_connections,
            run_migrations,
            selectors,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
