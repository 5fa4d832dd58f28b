//! Local fixture cache.
//!
//! The cache holds one artifact, the raw bundle bytes. It is current exactly
//! when the server confirms the digest of those bytes.

use std::path::{Path, PathBuf};

use automark_core::{digest_bytes, FixtureBundle};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::client::AutomarkClient;
use crate::error::{ClientError, ClientResult};

const ARTIFACT_NAME: &str = "bundle.json";

#[derive(Debug, Clone)]
pub struct BundleCache {
    dir: PathBuf,
}

impl BundleCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.dir.join(ARTIFACT_NAME)
    }

    /// Digest of the cached bytes, `None` if there is no readable artifact.
    pub async fn digest(&self) -> Option<String> {
        let bytes = fs::read(self.artifact_path()).await.ok()?;
        Some(digest_bytes(&bytes))
    }

    /// Whether the cached bundle matches the server's. Any failure, local or
    /// remote, counts as stale.
    pub async fn is_current(&self, client: &AutomarkClient) -> bool {
        let Some(digest) = self.digest().await else {
            debug!(path = %self.artifact_path().display(), "no cached bundle");
            return false;
        };
        match client.check_sum(&digest).await {
            Ok(true) => {
                debug!(digest = %digest, "cached bundle is current");
                true
            }
            Ok(false) => {
                info!(digest = %digest, "cached bundle is outdated");
                false
            }
            Err(e) => {
                warn!(error = %e, "could not validate cached bundle");
                false
            }
        }
    }

    /// Download the bundle and atomically replace the cached artifact. On
    /// failure the existing artifact is left as it was.
    pub async fn refresh(&self, client: &AutomarkClient, user: &str) -> ClientResult<String> {
        let download = client
            .load_tests(user)
            .await
            .map_err(ClientError::fetch_failure)?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ClientError::Cache {
                message: format!("failed to create {}: {}", self.dir.display(), e),
            })?;
        write_atomic(&self.artifact_path(), &download.bytes).await?;

        info!(digest = %download.digest, "local tests downloaded");
        Ok(download.digest)
    }

    /// Refresh when stale. Returns whether a download happened.
    pub async fn ensure_current(&self, client: &AutomarkClient, user: &str) -> ClientResult<bool> {
        if self.is_current(client).await {
            return Ok(false);
        }
        self.refresh(client, user).await?;
        Ok(true)
    }

    /// Decode the cached bundle.
    pub async fn load(&self) -> ClientResult<FixtureBundle> {
        let path = self.artifact_path();
        let bytes = fs::read(&path).await.map_err(|e| ClientError::Cache {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        FixtureBundle::from_bytes(&bytes).map_err(|e| ClientError::LocalTests {
            message: e.to_string(),
        })
    }
}

async fn write_atomic(path: &Path, content: &[u8]) -> ClientResult<()> {
    let temp_path = path.with_extension("json.tmp");

    fs::write(&temp_path, content)
        .await
        .map_err(|e| ClientError::Cache {
            message: format!("failed to write temp file: {}", e),
        })?;

    fs::rename(&temp_path, path)
        .await
        .map_err(|e| ClientError::Cache {
            message: format!("failed to rename temp file: {}", e),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_artifact_has_no_digest() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BundleCache::new(dir.path().join("local_tests"));
        assert_eq!(cache.digest().await, None);
        assert!(matches!(
            cache.load().await,
            Err(ClientError::Cache { .. })
        ));
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ARTIFACT_NAME);
        write_atomic(&path, b"{}").await.unwrap();
        write_atomic(&path, b"[]").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"[]");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_artifact_is_a_local_tests_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BundleCache::new(dir.path());
        std::fs::write(cache.artifact_path(), b"not a bundle").unwrap();

        assert_eq!(
            cache.digest().await.as_deref(),
            Some(digest_bytes(b"not a bundle").as_str())
        );
        assert!(matches!(
            cache.load().await,
            Err(ClientError::LocalTests { .. })
        ));
    }
}
