//! Registered users.
//!
//! One JSON record per user under `users/user_info/{user}.json`; the set of
//! file stems is the registered set. Identity is not verified here: a user ID
//! is an opaque, case-sensitive token.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GradeError, GradeResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub mail: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: BTreeMap<String, UserInfo>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, id: impl Into<String>, info: UserInfo) -> Self {
        self.users.insert(id.into(), info);
        self
    }

    /// Load every `*.json` record in `dir`.
    pub fn load(dir: &Path) -> GradeResult<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| GradeError::Config {
            message: format!("failed to read user directory {}: {}", dir.display(), e),
        })?;

        let mut users = BTreeMap::new();
        for entry in entries {
            let path = entry
                .map_err(|e| GradeError::Config {
                    message: format!("failed to read directory entry: {}", e),
                })?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let content = std::fs::read_to_string(&path).map_err(|e| GradeError::Config {
                message: format!("failed to read {}: {}", path.display(), e),
            })?;
            let info: UserInfo = serde_json::from_str(&content).map_err(|e| GradeError::Config {
                message: format!("failed to parse {}: {}", path.display(), e),
            })?;
            users.insert(id.to_string(), info);
        }

        debug!(dir = %dir.display(), users = users.len(), "loaded user directory");
        Ok(Self { users })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.users.contains_key(id)
    }

    pub fn info(&self, id: &str) -> GradeResult<&UserInfo> {
        self.users.get(id).ok_or_else(|| GradeError::UnknownUser {
            user: id.to_string(),
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.users.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
