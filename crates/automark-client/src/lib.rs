//! Learner-side client for AutoMark.
//!
//! ```no_run
//! use automark_client::{Automark, TestOutcome};
//! use automark_core::NdArray;
//!
//! # async fn run() -> Result<(), automark_client::ClientError> {
//! let automark = Automark::from_env()?;
//! let outcome = automark
//!     .test_function("alice", "double", &["x"], |args| {
//!         let x = args[0].to_array()?;
//!         Ok(NdArray::from_shape_vec(
//!             x.shape().to_vec(),
//!             x.data().iter().map(|v| v * 2.0).collect(),
//!         )?)
//!     })
//!     .await?;
//! assert!(matches!(outcome, TestOutcome::Passed));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
mod http;
pub mod report;
pub mod session;

pub use cache::BundleCache;
pub use client::{AutomarkClient, BundleDownload};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use report::format_progress;
pub use session::{Automark, TestOutcome};
