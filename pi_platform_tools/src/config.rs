use std::time::Duration;

use log::*;
use pmg_common::{helpers::parse_seconds, Secret};

const DEFAULT_PLATFORM_API_URL: &str = "https://api.minepi.com";
const DEFAULT_PLATFORM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub api_url: String,
    /// The server API key the platform issued for this app. Sent as `Authorization: Key <key>`.
    pub api_key: Secret<String>,
    pub timeout: Duration,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_PLATFORM_API_URL.to_string(),
            api_key: Secret::default(),
            timeout: DEFAULT_PLATFORM_TIMEOUT,
        }
    }
}

impl PlatformConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("PMG_PLATFORM_API_URL").unwrap_or_else(|_| {
            warn!("PMG_PLATFORM_API_URL not set, using {DEFAULT_PLATFORM_API_URL}");
            DEFAULT_PLATFORM_API_URL.to_string()
        });
        let api_key = Secret::new(std::env::var("PMG_PLATFORM_API_KEY").unwrap_or_else(|_| {
            warn!("PMG_PLATFORM_API_KEY not set, using (probably useless) default");
            "pi_api_key_0000000000".to_string()
        }));
        let timeout = parse_seconds(std::env::var("PMG_PLATFORM_TIMEOUT_SECS").ok(), DEFAULT_PLATFORM_TIMEOUT);
        Self { api_url, api_key, timeout }
    }
}
