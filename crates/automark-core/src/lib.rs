//! Assignment verification protocol for AutoMark.
//!
//! Learners check a candidate solution in two steps:
//!
//! - offline, against a fixture bundle cached on their machine and validated by
//!   digest ([`bundle`], [`local`]);
//! - online, against one randomly chosen held-out case whose expected output
//!   never leaves the server ([`issuer`], [`verifier`]).
//!
//! The server side throttles attempts per user ([`throttle`]), records
//! completion durably and monotonically ([`progress`]), and runs every request
//! through an ordered guard chain ([`guard`]) over an explicitly constructed
//! [`GradingContext`].

pub mod array;
pub mod bundle;
pub mod config;
pub mod context;
mod digest;
pub mod error;
pub mod guard;
pub mod held_out;
pub mod issuer;
pub mod local;
pub mod progress;
pub mod throttle;
pub mod tolerance;
pub mod users;
pub mod value;
pub mod verifier;

pub use array::{ArrayError, NdArray};
pub use bundle::{
    BundleArtifact, FixtureBundle, TestCase, BUNDLE_DIGEST_HEADER, BUNDLE_SCHEMA_VERSION,
};
pub use config::ServerConfig;
pub use context::{GradingContext, ProgressReport};
pub use digest::{digest_bytes, DIGEST_PREFIX};
pub use error::{GradeError, GradeResult};
pub use guard::{Guard, GuardScope};
pub use held_out::{HeldOutCase, HeldOutSet};
pub use issuer::Challenge;
pub use local::{bind_arguments, run_local_cases, LocalOutcome};
pub use progress::{
    FileProgressBackend, MemoryProgressBackend, ProgressBackend, ProgressRecord, ProgressState,
    ProgressStore,
};
pub use throttle::{Clock, ManualClock, SystemClock, ThrottleGuard, DEFAULT_COOLDOWN_SECS};
pub use tolerance::Tolerance;
pub use users::{UserDirectory, UserInfo};
pub use value::ArgValue;
pub use verifier::Verdict;
