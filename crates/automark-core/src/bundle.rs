//! Fixture bundles distributed to clients for offline checks.
//!
//! A bundle is a versioned JSON document:
//!
//! ```text
//! {"version": 1, "assignments": {"matmul": [{"inputs": {...}, "expected": [[...]]}]}}
//! ```
//!
//! Clients identify a bundle solely by the digest of its raw bytes.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::array::NdArray;
use crate::digest::digest_bytes;
use crate::error::{GradeError, GradeResult};
use crate::value::ArgValue;

/// Schema version written by this crate.
pub const BUNDLE_SCHEMA_VERSION: u32 = 1;

/// Response header carrying the digest of a served bundle.
pub const BUNDLE_DIGEST_HEADER: &str = "x-bundle-digest";

/// One (inputs, expected output) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub inputs: BTreeMap<String, ArgValue>,
    pub expected: NdArray,
}

impl TestCase {
    pub fn new(expected: NdArray) -> Self {
        Self {
            inputs: BTreeMap::new(),
            expected,
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureBundle {
    pub version: u32,
    pub assignments: BTreeMap<String, Vec<TestCase>>,
}

impl Default for FixtureBundle {
    fn default() -> Self {
        Self {
            version: BUNDLE_SCHEMA_VERSION,
            assignments: BTreeMap::new(),
        }
    }
}

impl FixtureBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assignment(mut self, name: impl Into<String>, cases: Vec<TestCase>) -> Self {
        self.assignments.insert(name.into(), cases);
        self
    }

    pub fn cases(&self, assignment: &str) -> Option<&[TestCase]> {
        self.assignments.get(assignment).map(Vec::as_slice)
    }

    pub fn to_bytes(&self) -> GradeResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| GradeError::bundle(format!("failed to encode bundle: {}", e)))
    }

    pub fn from_bytes(bytes: &[u8]) -> GradeResult<Self> {
        let bundle: Self = serde_json::from_slice(bytes)
            .map_err(|e| GradeError::bundle(format!("failed to decode bundle: {}", e)))?;
        check_version(bundle.version)?;
        Ok(bundle)
    }
}

pub(crate) fn check_version(version: u32) -> GradeResult<()> {
    if version != BUNDLE_SCHEMA_VERSION {
        return Err(GradeError::bundle(format!(
            "unsupported schema version {} (expected {})",
            version, BUNDLE_SCHEMA_VERSION
        )));
    }
    Ok(())
}

/// Server-held bundle bytes and their digest.
///
/// The bytes are served as-is; they are decoded once at load time only to
/// reject a broken deployment early.
#[derive(Debug, Clone)]
pub struct BundleArtifact {
    bytes: Vec<u8>,
    digest: String,
}

impl BundleArtifact {
    pub fn from_bytes(bytes: Vec<u8>) -> GradeResult<Self> {
        FixtureBundle::from_bytes(&bytes)?;
        let digest = digest_bytes(&bytes);
        Ok(Self { bytes, digest })
    }

    pub fn from_bundle(bundle: &FixtureBundle) -> GradeResult<Self> {
        Self::from_bytes(bundle.to_bytes()?)
    }

    pub fn load(path: &Path) -> GradeResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            GradeError::bundle(format!("failed to read {}: {}", path.display(), e))
        })?;
        let artifact = Self::from_bytes(bytes)?;
        debug!(path = %path.display(), digest = %artifact.digest, "loaded fixture bundle");
        Ok(artifact)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Exact, case-sensitive comparison against a caller-supplied digest.
    pub fn matches(&self, digest: &str) -> bool {
        self.digest == digest
    }
}
