//! HTTP layer: URL building and status mapping.
//!
//! This is the only place that looks at status codes. The server answers
//! rejected requests with `{"error": ...}` and a non-2xx status.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: Url,
}

impl HttpBackend {
    /// `base_url` with `segments` appended, each percent-encoded as one
    /// path segment.
    pub(crate) fn url(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Config {
                message: format!("'{}' cannot be used as a base URL", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) async fn get(&self, segments: &[&str]) -> ClientResult<reqwest::Response> {
        let url = self.url(segments)?;
        debug!(url = %url, "GET");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody { error }) => Err(ClientError::Server { message: error }),
            Err(_) => Err(ClientError::InvalidResponse {
                message: format!("unexpected status {}", status),
            }),
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> ClientResult<T> {
        let response = self.get(segments).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse {
                message: format!("failed to decode response: {}", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend {
            client: reqwest::Client::new(),
            base_url: Url::parse(base).unwrap(),
        }
    }

    #[test]
    fn segments_are_percent_encoded() {
        let url = backend("http://127.0.0.1:1234")
            .url(&["check_answer", "alice", "matmul", "3", "[[1.0, 2.0]]"])
            .unwrap();
        assert_eq!(url.path_segments().unwrap().count(), 5);
        assert!(url.path().ends_with(",%202.0]]"));
    }

    #[test]
    fn base_path_is_kept() {
        let url = backend("http://grader.example/automark/")
            .url(&["get_progress", "alice"])
            .unwrap();
        assert_eq!(url.path(), "/automark/get_progress/alice");
    }

    #[test]
    fn slash_in_segment_is_escaped() {
        let url = backend("http://127.0.0.1:1234").url(&["get_progress", "a/b"]).unwrap();
        assert_eq!(url.path(), "/get_progress/a%2Fb");
    }
}
