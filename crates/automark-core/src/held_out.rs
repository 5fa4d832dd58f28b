//! Server-only test cases used for challenges.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::array::NdArray;
use crate::bundle::{check_version, BUNDLE_SCHEMA_VERSION};
use crate::error::{GradeError, GradeResult};
use crate::value::ArgValue;

/// A held-out case. `token` identifies it within its assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeldOutCase {
    pub token: u32,
    pub inputs: BTreeMap<String, ArgValue>,
    pub expected: NdArray,
}

/// Held-out cases per assignment. Only constructible through validation, so
/// every assignment has cases and tokens are unique within it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHeldOutSet")]
pub struct HeldOutSet {
    version: u32,
    assignments: BTreeMap<String, Vec<HeldOutCase>>,
}

#[derive(Deserialize)]
struct RawHeldOutSet {
    version: u32,
    assignments: BTreeMap<String, Vec<HeldOutCase>>,
}

impl TryFrom<RawHeldOutSet> for HeldOutSet {
    type Error = GradeError;

    fn try_from(raw: RawHeldOutSet) -> GradeResult<Self> {
        check_version(raw.version)?;
        let set = Self {
            version: raw.version,
            assignments: raw.assignments,
        };
        set.validate()?;
        Ok(set)
    }
}

impl Default for HeldOutSet {
    fn default() -> Self {
        Self {
            version: BUNDLE_SCHEMA_VERSION,
            assignments: BTreeMap::new(),
        }
    }
}

impl HeldOutSet {
    /// Build a set, validating that every assignment has cases and that
    /// tokens are unique within each assignment.
    pub fn new(assignments: BTreeMap<String, Vec<HeldOutCase>>) -> GradeResult<Self> {
        let set = Self {
            version: BUNDLE_SCHEMA_VERSION,
            assignments,
        };
        set.validate()?;
        Ok(set)
    }

    pub fn from_bytes(bytes: &[u8]) -> GradeResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| GradeError::bundle(format!("failed to decode held-out set: {}", e)))
    }

    pub fn load(path: &Path) -> GradeResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            GradeError::bundle(format!("failed to read {}: {}", path.display(), e))
        })?;
        let set = Self::from_bytes(&bytes)?;
        debug!(
            path = %path.display(),
            assignments = set.assignments.len(),
            "loaded held-out set"
        );
        Ok(set)
    }

    fn validate(&self) -> GradeResult<()> {
        for (name, cases) in &self.assignments {
            if cases.is_empty() {
                return Err(GradeError::bundle(format!(
                    "assignment '{}' has no held-out cases",
                    name
                )));
            }
            let mut seen = HashSet::new();
            for case in cases {
                if !seen.insert(case.token) {
                    return Err(GradeError::bundle(format!(
                        "assignment '{}' reuses challenge token {}",
                        name, case.token
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn contains(&self, assignment: &str) -> bool {
        self.assignments.contains_key(assignment)
    }

    pub fn assignment_names(&self) -> impl Iterator<Item = &str> {
        self.assignments.keys().map(String::as_str)
    }

    pub fn cases(&self, assignment: &str) -> GradeResult<&[HeldOutCase]> {
        self.assignments
            .get(assignment)
            .map(Vec::as_slice)
            .ok_or_else(|| GradeError::UnknownAssignment {
                assignment: assignment.to_string(),
            })
    }

    /// Map a challenge token back to its case.
    pub fn resolve(&self, assignment: &str, token: u32) -> GradeResult<&HeldOutCase> {
        self.cases(assignment)?
            .iter()
            .find(|case| case.token == token)
            .ok_or_else(|| GradeError::UnknownChallenge {
                assignment: assignment.to_string(),
                token,
            })
    }
}
