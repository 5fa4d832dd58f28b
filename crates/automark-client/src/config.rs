//! Client configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the server lives and where local tests are cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server base URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Directory holding the cached fixture bundle.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_url() -> String {
    "http://127.0.0.1:1234".to_string()
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(dirs::home_dir)
        .map(|base| base.join("automark").join("local_tests"))
        .unwrap_or_else(|| PathBuf::from("local_tests"))
}

fn default_timeout() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            cache_dir: default_cache_dir(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `AUTOMARK_URL` | Server base URL |
    /// | `AUTOMARK_CACHE_DIR` | Local test cache directory |
    /// | `AUTOMARK_TIMEOUT` | Request timeout in seconds |
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("AUTOMARK_URL").unwrap_or_else(|_| default_url()),
            cache_dir: std::env::var("AUTOMARK_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_cache_dir()),
            timeout_secs: std::env::var("AUTOMARK_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
        }
    }

    /// Set the server base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
