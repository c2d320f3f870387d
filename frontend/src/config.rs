//! Client configuration.
//!
//! Values are resolved in three layers: built-in defaults, environment
//! variables captured when the bundle is compiled (`JOBS_*`), and a JSON object
//! the hosting page may place in `<meta name="jobs-config" content="...">`.
//! Later layers only override the keys they set.

use std::time::Duration;

use common::requests::ParamEncoding;
use log::{warn, LevelFilter};
use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::HtmlMetaElement;

const META_SELECTOR: &str = "meta[name=\"jobs-config\"]";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Prefix of every API path, without trailing slash. Empty means the page origin.
    pub api_base: String,
    pub poll_interval_ms: u64,
    /// Number of log lines requested on every poll.
    pub log_tail: u32,
    pub request_timeout_ms: u64,
    pub param_encoding: ParamEncoding,
    pub log_level: LevelFilter,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "/api".to_string(),
            poll_interval_ms: 3000,
            log_tail: 400,
            request_timeout_ms: 60_000,
            param_encoding: ParamEncoding::Flattened,
            log_level: LevelFilter::Info,
        }
    }
}

/// Partial configuration; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub api_base: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub log_tail: Option<u32>,
    pub request_timeout_ms: Option<u64>,
    pub param_encoding: Option<ParamEncoding>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    /// Reads `JOBS_*` keys through `lookup`. Values that do not parse are
    /// reported and skipped.
    pub fn from_env<'a>(lookup: impl Fn(&str) -> Option<&'a str>) -> Self {
        Self {
            api_base: lookup("JOBS_API_BASE").map(str::to_string),
            poll_interval_ms: parse_var(&lookup, "JOBS_POLL_INTERVAL_MS"),
            log_tail: parse_var(&lookup, "JOBS_LOG_TAIL"),
            request_timeout_ms: parse_var(&lookup, "JOBS_REQUEST_TIMEOUT_MS"),
            param_encoding: lookup("JOBS_PARAM_ENCODING").and_then(|raw| {
                match raw.trim() {
                    "flattened" => Some(ParamEncoding::Flattened),
                    "json_blob" => Some(ParamEncoding::JsonBlob),
                    other => {
                        warn!("ignoring JOBS_PARAM_ENCODING={}", other);
                        None
                    }
                }
            }),
            log_level: lookup("JOBS_LOG_LEVEL").map(str::to_string),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn parse_var<'a, T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<&'a str>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring {}={}", key, raw);
            None
        }
    }
}

fn build_env(key: &str) -> Option<&'static str> {
    match key {
        "JOBS_API_BASE" => option_env!("JOBS_API_BASE"),
        "JOBS_POLL_INTERVAL_MS" => option_env!("JOBS_POLL_INTERVAL_MS"),
        "JOBS_LOG_TAIL" => option_env!("JOBS_LOG_TAIL"),
        "JOBS_REQUEST_TIMEOUT_MS" => option_env!("JOBS_REQUEST_TIMEOUT_MS"),
        "JOBS_PARAM_ENCODING" => option_env!("JOBS_PARAM_ENCODING"),
        "JOBS_LOG_LEVEL" => option_env!("JOBS_LOG_LEVEL"),
        _ => None,
    }
}

impl ClientConfig {
    /// Resolves the configuration for the running page.
    pub fn load() -> Self {
        let mut config = ClientConfig::default();
        config.apply(ConfigOverrides::from_env(build_env));

        if let Some(json) = page_config() {
            match ConfigOverrides::from_json(&json) {
                Ok(overrides) => config.apply(overrides),
                Err(err) => warn!("ignoring malformed jobs-config meta tag: {}", err),
            }
        }
        config
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(api_base) = overrides.api_base {
            self.api_base = api_base.trim().trim_end_matches('/').to_string();
        }
        if let Some(interval) = overrides.poll_interval_ms {
            self.poll_interval_ms = interval;
        }
        if let Some(tail) = overrides.log_tail {
            self.log_tail = tail;
        }
        if let Some(timeout) = overrides.request_timeout_ms {
            self.request_timeout_ms = timeout;
        }
        if let Some(encoding) = overrides.param_encoding {
            self.param_encoding = encoding;
        }
        if let Some(level) = overrides.log_level {
            match level.parse() {
                Ok(level) => self.log_level = level,
                Err(_) => warn!("ignoring log level {}", level),
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn page_config() -> Option<String> {
    let document = web_sys::window()?.document()?;
    let meta = document
        .query_selector(META_SELECTOR)
        .ok()??
        .dyn_into::<HtmlMetaElement>()
        .ok()?;
    let content = meta.content();
    if content.trim().is_empty() {
        None
    } else {
        Some(content)
    }
}
