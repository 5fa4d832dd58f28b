//! Request guards.
//!
//! Every operation runs an ordered chain of guards before doing any work. The
//! first guard that fails short-circuits the chain with its error, so the
//! order decides which error a request sees when several apply.

use crate::context::GradingContext;
use crate::error::{GradeError, GradeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// The user must be registered.
    RegisteredUser,
    /// The user's cooldown window must have elapsed.
    CooldownElapsed,
    /// The assignment must exist in the held-out set.
    KnownAssignment,
    /// Re-check the cooldown and start a new window in the same step.
    ArmCooldown,
}

/// What a guard inspects.
#[derive(Debug, Clone, Copy)]
pub struct GuardScope<'a> {
    pub user: &'a str,
    pub assignment: Option<&'a str>,
}

impl<'a> GuardScope<'a> {
    pub fn user(user: &'a str) -> Self {
        Self {
            user,
            assignment: None,
        }
    }

    pub fn assignment(user: &'a str, assignment: &'a str) -> Self {
        Self {
            user,
            assignment: Some(assignment),
        }
    }
}

pub const CHALLENGE_CHAIN: &[Guard] = &[
    Guard::RegisteredUser,
    Guard::CooldownElapsed,
    Guard::KnownAssignment,
];

pub const VERIFY_CHAIN: &[Guard] = &[
    Guard::RegisteredUser,
    Guard::CooldownElapsed,
    Guard::KnownAssignment,
    Guard::ArmCooldown,
];

pub const LOAD_TESTS_CHAIN: &[Guard] = &[Guard::RegisteredUser, Guard::CooldownElapsed];

pub const PROGRESS_CHAIN: &[Guard] = &[Guard::RegisteredUser];

impl Guard {
    pub fn check(self, ctx: &GradingContext, scope: &GuardScope<'_>) -> GradeResult<()> {
        match self {
            Self::RegisteredUser => {
                if ctx.users().contains(scope.user) {
                    Ok(())
                } else {
                    Err(GradeError::UnknownUser {
                        user: scope.user.to_string(),
                    })
                }
            }
            Self::CooldownElapsed => ctx.throttle().ensure_allowed(scope.user),
            Self::KnownAssignment => match scope.assignment {
                Some(assignment) if !ctx.held_out().contains(assignment) => {
                    Err(GradeError::UnknownAssignment {
                        assignment: assignment.to_string(),
                    })
                }
                _ => Ok(()),
            },
            Self::ArmCooldown => ctx.throttle().check_and_arm(scope.user),
        }
    }
}

pub fn run_chain(chain: &[Guard], ctx: &GradingContext, scope: &GuardScope<'_>) -> GradeResult<()> {
    chain.iter().try_for_each(|guard| guard.check(ctx, scope))
}
