//! Server configuration.
//!
//! Sources, later ones winning: built-in defaults, an optional YAML file,
//! environment variables, then explicit `with_*` overrides (CLI flags).
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `AUTOMARK_BIND` | Listen address (default: `0.0.0.0:1234`) |
//! | `AUTOMARK_DATA_DIR` | Root of the data layout (default: `.`) |
//! | `AUTOMARK_COOLDOWN_SECS` | Cooldown window between attempts (default: 30) |
//! | `AUTOMARK_LOG_JSON` | Emit JSON logs (`1`/`true`) |
//!
//! # Data Layout
//!
//! ```text
//! {data_dir}/
//!   assignments/local_tests.json    # fixture bundle served to clients
//!   assignments/remote_tests.json   # held-out cases, never served
//!   users/user_info/{user}.json     # {"name": ..., "mail": ...}
//!   users/user_progress/{user}.json # {"assignment": bool}
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GradeError, GradeResult};
use crate::throttle::DEFAULT_COOLDOWN_SECS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Root of the on-disk layout.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Cooldown window in seconds.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub log_json: bool,
}

fn default_bind() -> String {
    "0.0.0.0:1234".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_cooldown_secs() -> u64 {
    DEFAULT_COOLDOWN_SECS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            data_dir: default_data_dir(),
            cooldown_secs: default_cooldown_secs(),
            log_json: false,
        }
    }
}

impl ServerConfig {
    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Read a YAML file; missing keys take their defaults.
    pub fn from_file(path: &Path) -> GradeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GradeError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        serde_yaml::from_str(&content).map_err(|e| GradeError::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
        })
    }

    /// Overlay any `AUTOMARK_*` variables that are set.
    pub fn apply_env(mut self) -> Self {
        if let Ok(bind) = std::env::var("AUTOMARK_BIND") {
            self.bind = bind;
        }
        if let Ok(dir) = std::env::var("AUTOMARK_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(secs) = std::env::var("AUTOMARK_COOLDOWN_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.cooldown_secs = secs;
        }
        if let Ok(v) = std::env::var("AUTOMARK_LOG_JSON") {
            self.log_json = v == "1" || v.eq_ignore_ascii_case("true");
        }
        self
    }

    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_cooldown_secs(mut self, secs: u64) -> Self {
        self.cooldown_secs = secs;
        self
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn bundle_path(&self) -> PathBuf {
        self.data_dir.join("assignments").join("local_tests.json")
    }

    pub fn held_out_path(&self) -> PathBuf {
        self.data_dir.join("assignments").join("remote_tests.json")
    }

    pub fn user_info_dir(&self) -> PathBuf {
        self.data_dir.join("users").join("user_info")
    }

    pub fn user_progress_dir(&self) -> PathBuf {
        self.data_dir.join("users").join("user_progress")
    }
}
