//! Typed calls to the grading service.
//!
//! No status code knowledge here; see `http.rs`.

use std::time::Duration;

use automark_core::{digest_bytes, Challenge, NdArray, ProgressReport, BUNDLE_DIGEST_HEADER};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::HttpBackend;

const USER_AGENT_VALUE: &str = concat!("automark-client/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Success {
    success: bool,
}

/// A downloaded fixture bundle.
#[derive(Debug, Clone)]
pub struct BundleDownload {
    pub bytes: Vec<u8>,
    /// Digest computed over `bytes`.
    pub digest: String,
}

#[derive(Debug, Clone)]
pub struct AutomarkClient {
    http: HttpBackend,
}

impl AutomarkClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| ClientError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        let base_url = Url::parse(&config.url).map_err(|e| ClientError::Config {
            message: format!("invalid server URL '{}': {}", config.url, e),
        })?;

        Ok(Self {
            http: HttpBackend { client, base_url },
        })
    }

    pub fn from_env() -> ClientResult<Self> {
        Self::new(&ClientConfig::from_env())
    }

    pub fn base_url(&self) -> &Url {
        &self.http.base_url
    }

    /// Whether the server's bundle has exactly this digest.
    pub async fn check_sum(&self, digest: &str) -> ClientResult<bool> {
        let body: Success = self.http.get_json(&["check_sum", digest]).await?;
        Ok(body.success)
    }

    /// Download the fixture bundle. A digest header that disagrees with the
    /// received bytes is rejected.
    pub async fn load_tests(&self, user: &str) -> ClientResult<BundleDownload> {
        let response = self.http.get(&["load_tests", user]).await?;
        let announced = response
            .headers()
            .get(BUNDLE_DIGEST_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network {
                message: format!("failed to read response body: {}", e),
            })?
            .to_vec();
        let digest = digest_bytes(&bytes);

        if let Some(announced) = announced {
            if announced != digest {
                warn!(expected = %announced, actual = %digest, "bundle digest mismatch");
                return Err(ClientError::InvalidResponse {
                    message: format!(
                        "bundle digest mismatch: server announced {}, received {}",
                        announced, digest
                    ),
                });
            }
        }

        debug!(digest = %digest, size = bytes.len(), "downloaded fixture bundle");
        Ok(BundleDownload { bytes, digest })
    }

    pub async fn get_test_input(&self, user: &str, assignment: &str) -> ClientResult<Challenge> {
        self.http
            .get_json(&["get_test_input", user, assignment])
            .await
    }

    /// Submit an answer. The server arms the user's cooldown whatever the
    /// verdict.
    pub async fn check_answer(
        &self,
        user: &str,
        assignment: &str,
        ipd: u32,
        answer: &NdArray,
    ) -> ClientResult<bool> {
        let ipd = ipd.to_string();
        let answer = answer.to_json().to_string();
        let body: Success = self
            .http
            .get_json(&["check_answer", user, assignment, &ipd, &answer])
            .await?;
        Ok(body.success)
    }

    pub async fn get_progress(&self, user: &str) -> ClientResult<ProgressReport> {
        self.http.get_json(&["get_progress", user]).await
    }
}
