//! Offline checks of a candidate function against fixture cases.

use std::collections::BTreeMap;

use crate::array::NdArray;
use crate::bundle::FixtureBundle;
use crate::error::{GradeError, GradeResult};
use crate::tolerance::Tolerance;
use crate::value::ArgValue;

/// Result of running every fixture case of one assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalOutcome {
    Passed { cases: usize },
    Failed { case: usize, reason: String },
}

impl LocalOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }
}

/// Arguments of a case in the caller's declared order.
pub fn bind_arguments<'a>(
    inputs: &'a BTreeMap<String, ArgValue>,
    arg_keys: &[&str],
) -> Result<Vec<&'a ArgValue>, String> {
    arg_keys
        .iter()
        .map(|key| {
            inputs
                .get(*key)
                .ok_or_else(|| format!("test case has no argument named '{}'", key))
        })
        .collect()
}

/// Run `candidate` over every case of `assignment`, stopping at the first
/// failure.
pub fn run_local_cases<F>(
    bundle: &FixtureBundle,
    assignment: &str,
    arg_keys: &[&str],
    mut candidate: F,
) -> GradeResult<LocalOutcome>
where
    F: FnMut(&[&ArgValue]) -> anyhow::Result<NdArray>,
{
    let cases = bundle
        .cases(assignment)
        .ok_or_else(|| GradeError::UnknownAssignment {
            assignment: assignment.to_string(),
        })?;

    for (index, case) in cases.iter().enumerate() {
        let args = match bind_arguments(&case.inputs, arg_keys) {
            Ok(args) => args,
            Err(reason) => return Ok(LocalOutcome::Failed { case: index, reason }),
        };
        let actual = match candidate(&args) {
            Ok(actual) => actual,
            Err(e) => {
                return Ok(LocalOutcome::Failed {
                    case: index,
                    reason: format!("candidate failed: {:#}", e),
                })
            }
        };
        match Tolerance::LOCAL.all_close(&actual, &case.expected) {
            Ok(true) => {}
            Ok(false) => {
                return Ok(LocalOutcome::Failed {
                    case: index,
                    reason: "output differs from expected".to_string(),
                })
            }
            Err(e) => {
                return Ok(LocalOutcome::Failed {
                    case: index,
                    reason: e.to_string(),
                })
            }
        }
    }

    Ok(LocalOutcome::Passed { cases: cases.len() })
}
