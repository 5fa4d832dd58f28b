//! The grading context: everything a request handler needs, built once at
//! startup and shared by reference.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bundle::BundleArtifact;
use crate::config::ServerConfig;
use crate::error::GradeResult;
use crate::guard::{
    run_chain, GuardScope, CHALLENGE_CHAIN, LOAD_TESTS_CHAIN, PROGRESS_CHAIN, VERIFY_CHAIN,
};
use crate::held_out::HeldOutSet;
use crate::issuer::{self, Challenge};
use crate::progress::{FileProgressBackend, ProgressBackend, ProgressState, ProgressStore};
use crate::throttle::ThrottleGuard;
use crate::users::UserDirectory;
use crate::verifier;

/// A user's progress over every deployed assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub name: String,
    pub mail: String,
    pub progress: BTreeMap<String, ProgressState>,
}

#[derive(Debug)]
pub struct GradingContext {
    users: UserDirectory,
    held_out: HeldOutSet,
    bundle: BundleArtifact,
    throttle: ThrottleGuard,
    progress: ProgressStore,
}

impl GradingContext {
    pub fn new(
        users: UserDirectory,
        held_out: HeldOutSet,
        bundle: BundleArtifact,
        throttle: ThrottleGuard,
        progress_backend: Arc<dyn ProgressBackend>,
    ) -> GradeResult<Self> {
        let progress = ProgressStore::open(progress_backend, users.ids())?;
        Ok(Self {
            users,
            held_out,
            bundle,
            throttle,
            progress,
        })
    }

    /// Build a context from the on-disk layout under `config.data_dir`.
    pub fn load(config: &ServerConfig) -> GradeResult<Self> {
        let users = UserDirectory::load(&config.user_info_dir())?;
        let held_out = HeldOutSet::load(&config.held_out_path())?;
        let bundle = BundleArtifact::load(&config.bundle_path())?;
        let throttle = ThrottleGuard::new(config.cooldown());
        let backend = Arc::new(FileProgressBackend::new(config.user_progress_dir()));

        let ctx = Self::new(users, held_out, bundle, throttle, backend)?;
        info!(
            users = ctx.users.len(),
            assignments = ctx.held_out.len(),
            bundle_digest = %ctx.bundle.digest(),
            cooldown_secs = config.cooldown_secs,
            "grading context ready"
        );
        Ok(ctx)
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn held_out(&self) -> &HeldOutSet {
        &self.held_out
    }

    pub fn bundle(&self) -> &BundleArtifact {
        &self.bundle
    }

    pub fn throttle(&self) -> &ThrottleGuard {
        &self.throttle
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// Hand out one random held-out case of `assignment`.
    pub fn issue_challenge(&self, user: &str, assignment: &str) -> GradeResult<Challenge> {
        run_chain(
            CHALLENGE_CHAIN,
            self,
            &GuardScope::assignment(user, assignment),
        )?;
        let challenge = issuer::issue(&self.held_out, user, assignment)?;
        debug!(user, assignment, ipd = challenge.ipd, "challenge issued");
        Ok(challenge)
    }

    /// Grade an answer. The cooldown is armed before grading, whatever the
    /// outcome.
    pub fn verify_answer(
        &self,
        user: &str,
        assignment: &str,
        token: u32,
        answer: &str,
    ) -> GradeResult<bool> {
        run_chain(VERIFY_CHAIN, self, &GuardScope::assignment(user, assignment))?;
        let verdict = verifier::verify_answer(
            &self.held_out,
            &self.progress,
            user,
            assignment,
            token,
            answer,
        )?;
        Ok(verdict.correct)
    }

    /// The bundle for a registered user outside their cooldown.
    pub fn load_tests(&self, user: &str) -> GradeResult<&BundleArtifact> {
        run_chain(LOAD_TESTS_CHAIN, self, &GuardScope::user(user))?;
        debug!(user, digest = %self.bundle.digest(), "serving fixture bundle");
        Ok(&self.bundle)
    }

    /// Whether `digest` names the current bundle.
    pub fn check_sum(&self, digest: &str) -> bool {
        self.bundle.matches(digest)
    }

    pub fn progress_report(&self, user: &str) -> GradeResult<ProgressReport> {
        run_chain(PROGRESS_CHAIN, self, &GuardScope::user(user))?;
        let info = self.users.info(user)?;
        let progress = self
            .progress
            .states(user, self.held_out.assignment_names())?;
        Ok(ProgressReport {
            name: info.name.clone(),
            mail: info.mail.clone(),
            progress,
        })
    }
}
