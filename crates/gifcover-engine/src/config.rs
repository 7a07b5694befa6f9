use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://www.sex.com/portal/api/gifs/search";
pub const DEFAULT_CDN_URL: &str = "https://imagex1.sx.cdn.live";
pub const DEFAULT_REQUEST_TIMEOUT_S: f64 = 30.0;
pub const DEFAULT_TAG_DELAY_MS: u64 = 500;
pub const DEFAULT_AUTOFILL_LIMIT: u64 = 200;

pub const ENV_API_URL: &str = "GIFCOVER_API_URL";
pub const ENV_CDN_URL: &str = "GIFCOVER_CDN_URL";
pub const ENV_REQUEST_TIMEOUT: &str = "GIFCOVER_REQUEST_TIMEOUT";
pub const ENV_TAG_DELAY_MS: &str = "GIFCOVER_TAG_DELAY_MS";
pub const ENV_AUTOFILL_LIMIT: &str = "GIFCOVER_AUTOFILL_LIMIT";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub api_url: String,
    pub cdn_url: String,
    pub request_timeout: Duration,
    /// Pause after each tag in the autofill batch.
    pub tag_delay: Duration,
    pub autofill_limit: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            cdn_url: DEFAULT_CDN_URL.to_string(),
            request_timeout: Duration::from_secs_f64(DEFAULT_REQUEST_TIMEOUT_S),
            tag_delay: Duration::from_millis(DEFAULT_TAG_DELAY_MS),
            autofill_limit: DEFAULT_AUTOFILL_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            api_url: lookup(ENV_API_URL)
                .map(|value| normalize_base_url(&value))
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            cdn_url: lookup(ENV_CDN_URL)
                .map(|value| normalize_base_url(&value))
                .unwrap_or_else(|| DEFAULT_CDN_URL.to_string()),
            request_timeout: timeout_from_seconds(
                parse_f64(lookup(ENV_REQUEST_TIMEOUT)).unwrap_or(DEFAULT_REQUEST_TIMEOUT_S),
            ),
            tag_delay: delay_from_millis(
                parse_u64(lookup(ENV_TAG_DELAY_MS)).unwrap_or(DEFAULT_TAG_DELAY_MS),
            ),
            autofill_limit: parse_u64(lookup(ENV_AUTOFILL_LIMIT))
                .unwrap_or(DEFAULT_AUTOFILL_LIMIT)
                .clamp(1, 1000),
        }
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        let normalized = normalize_base_url(api_url);
        if !normalized.is_empty() {
            self.api_url = normalized;
        }
        self
    }

    pub fn with_cdn_url(mut self, cdn_url: &str) -> Self {
        let normalized = normalize_base_url(cdn_url);
        if !normalized.is_empty() {
            self.cdn_url = normalized;
        }
        self
    }

    pub fn with_request_timeout_seconds(mut self, seconds: f64) -> Self {
        self.request_timeout = timeout_from_seconds(seconds);
        self
    }

    pub fn with_tag_delay_millis(mut self, millis: u64) -> Self {
        self.tag_delay = delay_from_millis(millis);
        self
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn timeout_from_seconds(seconds: f64) -> Duration {
    let seconds = if seconds.is_finite() {
        seconds
    } else {
        DEFAULT_REQUEST_TIMEOUT_S
    };
    Duration::from_secs_f64(seconds.clamp(1.0, 600.0))
}

fn delay_from_millis(millis: u64) -> Duration {
    Duration::from_millis(millis.min(60_000))
}

fn parse_f64(value: Option<String>) -> Option<f64> {
    value.and_then(|raw| raw.parse::<f64>().ok())
}

fn parse_u64(value: Option<String>) -> Option<u64> {
    value.and_then(|raw| raw.parse::<u64>().ok())
}
