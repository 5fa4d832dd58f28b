//! Challenge issuance: one random held-out case per request.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GradeResult;
use crate::held_out::HeldOutSet;
use crate::value::ArgValue;

/// Inputs of one held-out case plus the token that correlates the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub username: String,
    pub ipd: u32,
    pub input: BTreeMap<String, ArgValue>,
}

/// Pick a case uniformly at random, with replacement across calls.
pub fn issue(held_out: &HeldOutSet, user: &str, assignment: &str) -> GradeResult<Challenge> {
    issue_with_rng(held_out, user, assignment, &mut rand::thread_rng())
}

pub fn issue_with_rng<R: Rng + ?Sized>(
    held_out: &HeldOutSet,
    user: &str,
    assignment: &str,
    rng: &mut R,
) -> GradeResult<Challenge> {
    let cases = held_out.cases(assignment)?;
    let case = &cases[rng.gen_range(0..cases.len())];
    Ok(Challenge {
        username: user.to_string(),
        ipd: case.token,
        input: case.inputs.clone(),
    })
}
