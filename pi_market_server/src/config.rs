use std::{env, time::Duration};

use log::*;
use pi_platform_tools::{PlatformConfig, DEFAULT_CHAIN_TIMEOUT};
use pmg_common::{
    helpers::{parse_boolean_flag, parse_seconds},
    Secret,
};

const DEFAULT_PMG_HOST: &str = "127.0.0.1";
const DEFAULT_PMG_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/pi_market.db";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Payment platform API access.
    pub platform: PlatformConfig,
    /// Bound on public-ledger lookups made while reconciling stuck payments.
    pub chain_timeout: Duration,
    /// Shared secret for the HMAC signature on platform callbacks.
    pub webhook_secret: Secret<String>,
    /// If true, the server will not verify HMAC signatures on platform callbacks. **DANGER**
    pub disable_webhook_signature_check: bool,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PMG_HOST.to_string(),
            port: DEFAULT_PMG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            platform: PlatformConfig::default(),
            chain_timeout: DEFAULT_CHAIN_TIMEOUT,
            webhook_secret: Secret::default(),
            disable_webhook_signature_check: false,
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PMG_HOST").ok().unwrap_or_else(|| DEFAULT_PMG_HOST.into());
        let port = env::var("PMG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for PMG_PORT. {e} Using the default, {DEFAULT_PMG_PORT}, instead.");
                    DEFAULT_PMG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PMG_PORT);
        let database_url = env::var("PMG_DATABASE_URL").unwrap_or_else(|_| {
            warn!("PMG_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let platform = PlatformConfig::new_from_env_or_default();
        let chain_timeout = parse_seconds(env::var("PMG_CHAIN_TIMEOUT_SECS").ok(), DEFAULT_CHAIN_TIMEOUT);
        let webhook_secret = Secret::new(env::var("PMG_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("PMG_WEBHOOK_SECRET is not set. Platform callbacks signed with an empty secret will be accepted.");
            String::new()
        }));
        let disable_webhook_signature_check =
            parse_boolean_flag(env::var("PMG_DISABLE_WEBHOOK_SIGNATURE_CHECK").ok(), false);
        if disable_webhook_signature_check {
            warn!("🪛️ Webhook signature checks are DISABLED. Unauthenticated platform callbacks will be accepted.");
        }
        let use_x_forwarded_for = parse_boolean_flag(env::var("PMG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("PMG_USE_FORWARDED").ok(), false);
        Self {
            host,
            port,
            database_url,
            platform,
            chain_timeout,
            webhook_secret,
            disable_webhook_signature_check,
            use_x_forwarded_for,
            use_forwarded,
        }
    }
}

/// The proxy-header trust settings, shared with request handlers for peer-IP logging.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProxyConfig {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl From<&ServerConfig> for ProxyConfig {
    fn from(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
