//! Client configuration.
//!
//! Everything the client would otherwise read from its surroundings (the API
//! base URL, page size, remote offset convention) is collected in a
//! [`ClientConfig`] and handed to the controller at construction time.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::query::DEFAULT_PAGE_SIZE;

/// Base URL of the search API when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable holding the API base URL.
pub const ENV_API_URL: &str = "SCHOLARLY_API_URL";

/// Environment variable holding the page size.
pub const ENV_PAGE_SIZE: &str = "SCHOLARLY_PAGE_SIZE";

/// Environment variable holding the offset base (`0` or `1`).
pub const ENV_OFFSET_BASE: &str = "SCHOLARLY_OFFSET_BASE";

/// Environment variable holding a request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "SCHOLARLY_TIMEOUT_SECS";

/// Errors raised while building a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The base URL could not be parsed
    #[error("Invalid API URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A setting had an unusable value
    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Whether the remote `start` parameter counts results from 0 or from 1.
///
/// The search backend forwards `start` unchanged to the arXiv export API,
/// which counts from 0, so [`OffsetBase::Zero`] is the default. Deployments
/// behind a 1-based gateway select [`OffsetBase::One`] explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OffsetBase {
    #[default]
    Zero,
    One,
}

impl OffsetBase {
    /// Remote offset of the first result on `page` (1-based).
    pub fn start_for(&self, page: u32, page_size: u32) -> u64 {
        let zero_based = u64::from(page.saturating_sub(1)) * u64::from(page_size);
        match self {
            OffsetBase::Zero => zero_based,
            OffsetBase::One => zero_based + 1,
        }
    }
}

impl std::str::FromStr for OffsetBase {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(OffsetBase::Zero),
            "1" => Ok(OffsetBase::One),
            other => Err(ConfigError::InvalidValue {
                name: "offset base".to_string(),
                message: format!("expected 0 or 1, got `{}`", other),
            }),
        }
    }
}

/// Configuration for the search client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL the `/query` endpoints are resolved against
    pub base_url: Url,

    /// Results per page (`max_results`)
    pub page_size: u32,

    /// Remote offset convention
    pub offset_base: OffsetBase,

    /// Per-request timeout; `None` waits for the server indefinitely
    pub request_timeout: Option<Duration>,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            page_size: DEFAULT_PAGE_SIZE,
            offset_base: OffsetBase::Zero,
            request_timeout: None,
            user_agent: format!("scholarly-search/{}", crate::VERSION),
        }
    }
}

impl ClientConfig {
    /// Defaults with a different base URL.
    pub fn with_base_url(base_url: &str) -> ConfigResult<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            ..Self::default()
        })
    }

    /// Load settings from the process environment, using defaults for
    /// anything unset.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config.base_url = parse_base_url(&url)?;
        }
        if let Some(size) = lookup(ENV_PAGE_SIZE) {
            config.page_size = parse_page_size(&size)?;
        }
        if let Some(base) = lookup(ENV_OFFSET_BASE) {
            config.offset_base = base.parse()?;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: ENV_TIMEOUT_SECS.to_string(),
                message: format!("expected whole seconds, got `{}`", secs),
            })?;
            config.request_timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

/// Parse a base URL, making sure it ends with `/` so endpoint paths join
/// below it rather than replacing its last segment.
pub fn parse_base_url(raw: &str) -> ConfigResult<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    Url::parse(&with_slash).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

/// Parse a positive page size.
pub fn parse_page_size(raw: &str) -> ConfigResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            name: "page size".to_string(),
            message: format!("expected a positive integer, got `{}`", raw),
        }),
    }
}
