//! Per-user cooldown between verification attempts.
//!
//! Each user has a "not before" instant. Checking compares it with the clock;
//! arming moves it to `now + window`. Only answer verification arms, and it
//! arms whatever the answer turns out to be, so repeated guessing is throttled
//! even when every guess is wrong.
//!
//! State is in memory only. A restart forgets all cooldowns, which at worst
//! unlocks a user early.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{GradeError, GradeResult};

/// Default cooldown window in seconds.
pub const DEFAULT_COOLDOWN_SECS: u64 = 30;

/// Time source for the throttle.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(next) = chrono::Duration::from_std(by)
            .ok()
            .and_then(|by| now.checked_add_signed(by))
        {
            *now = next;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
pub struct ThrottleGuard {
    window: chrono::Duration,
    clock: Arc<dyn Clock>,
    not_before: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl ThrottleGuard {
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    pub fn with_clock(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window: chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX),
            clock,
            not_before: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window.to_std().unwrap_or_default()
    }

    /// Fail with `CooldownActive` while the user's window is open.
    pub fn ensure_allowed(&self, user: &str) -> GradeResult<()> {
        let state = self.lock();
        self.check_locked(&state, user, self.clock.now())
    }

    /// Start a fresh window for `user`, unconditionally.
    pub fn arm(&self, user: &str) {
        let mut state = self.lock();
        let now = self.clock.now();
        self.arm_locked(&mut state, user, now);
    }

    /// Check and arm under one lock, so two concurrent attempts by the same
    /// user cannot both pass.
    pub fn check_and_arm(&self, user: &str) -> GradeResult<()> {
        let mut state = self.lock();
        let now = self.clock.now();
        self.check_locked(&state, user, now)?;
        self.arm_locked(&mut state, user, now);
        Ok(())
    }

    /// Whole seconds left in the user's window, `None` when not throttled.
    pub fn remaining_secs(&self, user: &str) -> Option<u64> {
        let state = self.lock();
        state
            .get(user)
            .and_then(|not_before| remaining_secs(*not_before, self.clock.now()))
    }

    fn check_locked(
        &self,
        state: &HashMap<String, DateTime<Utc>>,
        user: &str,
        now: DateTime<Utc>,
    ) -> GradeResult<()> {
        if let Some(seconds_remaining) = state
            .get(user)
            .and_then(|not_before| remaining_secs(*not_before, now))
        {
            warn!(user, seconds_remaining, "attempt rejected by cooldown");
            return Err(GradeError::CooldownActive { seconds_remaining });
        }
        Ok(())
    }

    fn arm_locked(
        &self,
        state: &mut HashMap<String, DateTime<Utc>>,
        user: &str,
        now: DateTime<Utc>,
    ) {
        // Expired entries carry no information; drop them while we hold the lock.
        state.retain(|_, not_before| *not_before > now);
        let not_before = now
            .checked_add_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        state.insert(user.to_string(), not_before);
        debug!(user, %not_before, "cooldown armed");
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.not_before
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn remaining_secs(not_before: DateTime<Utc>, now: DateTime<Utc>) -> Option<u64> {
    let millis = (not_before - now).num_milliseconds();
    if millis <= 0 {
        return None;
    }
    Some((millis as u64).div_ceil(1000))
}
