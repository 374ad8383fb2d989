use std::env;

use bcg_common::{parse_boolean_flag, Secret};
use log::*;

const DEFAULT_BCG_HOST: &str = "127.0.0.1";
const DEFAULT_BCG_PORT: u16 = 8360;

/// The header carrying the storefront's HMAC signature over the raw request body.
pub const SHOPIFY_HMAC_HEADER: &str = "X-Shopify-Hmac-Sha256";
/// The header identifying which shop a webhook delivery belongs to.
pub const SHOPIFY_SHOP_DOMAIN_HEADER: &str = "X-Shopify-Shop-Domain";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Storefront webhook configuration.
    pub shopify_config: ShopifyConfig,
}

#[derive(Clone, Debug, Default)]
pub struct ShopifyConfig {
    /// The shared secret the storefront signs webhook bodies with.
    pub hmac_secret: Secret<String>,
    /// When false, HMAC checks are skipped entirely. **DANGER**: only for local development.
    pub hmac_checks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BCG_HOST.to_string(),
            port: DEFAULT_BCG_PORT,
            database_url: String::default(),
            shopify_config: ShopifyConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BCG_HOST").ok().unwrap_or_else(|| DEFAULT_BCG_HOST.into());
        let port = env::var("BCG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for BCG_PORT. {e} Using the default, {DEFAULT_BCG_PORT}, instead."
                    );
                    DEFAULT_BCG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BCG_PORT);
        let database_url = env::var("BCG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BCG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let shopify_config = ShopifyConfig::from_env_or_defaults();
        Self { host, port, database_url, shopify_config }
    }
}

impl ShopifyConfig {
    pub fn from_env_or_defaults() -> Self {
        let hmac_secret = env::var("BCG_SHOPIFY_HMAC_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ BCG_SHOPIFY_HMAC_SECRET is not set. Please set it to the webhook signing secret for your \
                 storefront app."
            );
            String::default()
        });
        let hmac_secret = Secret::new(hmac_secret);
        let hmac_checks = parse_boolean_flag(env::var("BCG_SHOPIFY_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!(
                "🚨️ Storefront HMAC checks are disabled. Anyone can post to the webhook endpoints. If this is not a \
                 local development instance, you are doing it wrong."
            );
        }
        Self { hmac_secret, hmac_checks }
    }
}
