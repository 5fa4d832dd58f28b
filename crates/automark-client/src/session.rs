//! The learner-facing flow: local fixtures first, then one remote challenge.

use automark_core::{bind_arguments, run_local_cases, ArgValue, LocalOutcome, NdArray};
use tracing::info;

use crate::cache::BundleCache;
use crate::client::AutomarkClient;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// How far a candidate got.
#[derive(Debug, Clone, PartialEq)]
pub enum TestOutcome {
    /// A fixture case failed; nothing was sent to the server.
    LocalFailed { case: usize, reason: String },
    /// Local cases passed but the challenge was not solved.
    RemoteFailed { reason: String },
    /// Local cases and the challenge passed.
    Passed,
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

#[derive(Debug, Clone)]
pub struct Automark {
    client: AutomarkClient,
    cache: BundleCache,
}

impl Automark {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self {
            client: AutomarkClient::new(config)?,
            cache: BundleCache::new(&config.cache_dir),
        })
    }

    pub fn from_env() -> ClientResult<Self> {
        Self::new(&ClientConfig::from_env())
    }

    pub fn client(&self) -> &AutomarkClient {
        &self.client
    }

    pub fn cache(&self) -> &BundleCache {
        &self.cache
    }

    /// Check `candidate` for `assignment`.
    ///
    /// `arg_keys` names the candidate's parameters in call order. The
    /// candidate first runs over every cached fixture case; only if all of
    /// them pass is a challenge requested and the answer submitted.
    pub async fn test_function<F>(
        &self,
        user: &str,
        assignment: &str,
        arg_keys: &[&str],
        mut candidate: F,
    ) -> ClientResult<TestOutcome>
    where
        F: FnMut(&[&ArgValue]) -> anyhow::Result<NdArray>,
    {
        self.cache.ensure_current(&self.client, user).await?;
        let bundle = self.cache.load().await?;

        let local = run_local_cases(&bundle, assignment, arg_keys, &mut candidate).map_err(|e| {
            ClientError::LocalTests {
                message: e.to_string(),
            }
        })?;
        if let LocalOutcome::Failed { case, reason } = local {
            info!(assignment, case, %reason, "local tests failed");
            return Ok(TestOutcome::LocalFailed { case, reason });
        }
        info!(assignment, "local tests passed");

        let challenge = self.client.get_test_input(user, assignment).await?;
        let args = match bind_arguments(&challenge.input, arg_keys) {
            Ok(args) => args,
            Err(reason) => return Ok(TestOutcome::RemoteFailed { reason }),
        };
        let answer = match candidate(&args) {
            Ok(answer) => answer,
            Err(e) => {
                return Ok(TestOutcome::RemoteFailed {
                    reason: format!("candidate failed: {:#}", e),
                })
            }
        };

        if self
            .client
            .check_answer(user, assignment, challenge.ipd, &answer)
            .await?
        {
            info!(assignment, "remote test passed");
            Ok(TestOutcome::Passed)
        } else {
            info!(assignment, "remote test failed");
            Ok(TestOutcome::RemoteFailed {
                reason: "answer rejected by the server".to_string(),
            })
        }
    }
}
