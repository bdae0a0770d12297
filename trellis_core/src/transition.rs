// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-attribute transition state.
//!
//! A [`TransitionState`] moves one attribute of one node from a start value
//! to a target value:
//!
//! ```text
//! progress = clamp((now - start_time) / duration, 0, 1)
//! eased    = easing(progress)
//! value    = interpolate(start, target, eased)
//! ```
//!
//! Each state walks `Scheduled → Running → Complete`. `Scheduled` covers the
//! delay before `start_time`. Progress never decreases, even if a host
//! delivers an older timestamp after a newer one.

use crate::easing::Easing;
use crate::time::{Duration, HostTime};
use crate::value::Value;

/// Duration, delay and easing of a transition.
#[derive(Clone, Copy, Debug, Default)]
pub struct Timing {
    /// Time from start to completion.
    pub duration: Duration,
    /// Time between scheduling and start.
    pub delay: Duration,
    /// Easing applied to linear progress.
    pub easing: Easing,
}

impl Timing {
    /// A linear transition of the given duration, without delay.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self {
            duration,
            delay: Duration::ZERO,
            easing: Easing::Linear,
        }
    }

    /// A linear transition lasting `millis` milliseconds.
    #[must_use]
    pub const fn millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Returns a copy with the given easing.
    #[must_use]
    pub const fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Returns a copy with the given delay.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Which part of the general update pattern started a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The node was just created.
    Enter,
    /// The node already existed.
    Update,
    /// The node is leaving; it is removed once all its exit transitions
    /// complete.
    Exit,
}

/// Lifecycle of one in-flight transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// Waiting for its delay to elapse.
    Scheduled,
    /// Between start and target.
    Running,
    /// Reached the target.
    Complete,
}

/// One attribute moving from `start` to `target`.
#[derive(Clone, Debug)]
pub struct TransitionState {
    start: Value,
    target: Value,
    start_time: HostTime,
    duration: Duration,
    easing: Easing,
    progress: f64,
    started: bool,
    phase: Phase,
}

impl TransitionState {
    /// Schedules a transition at `now`. It starts after `timing.delay`.
    ///
    /// `start` and `target` are expected to interpolate into each other; a
    /// pair that does not is treated as a snap to `target` on completion.
    #[must_use]
    pub fn new(start: Value, target: Value, now: HostTime, timing: Timing, phase: Phase) -> Self {
        Self {
            start,
            target,
            start_time: now.saturating_add(timing.delay),
            duration: timing.duration,
            easing: timing.easing,
            progress: 0.0,
            started: false,
            phase,
        }
    }

    /// The value the transition started from.
    #[must_use]
    pub fn start_value(&self) -> &Value {
        &self.start
    }

    /// The value the transition moves towards.
    #[must_use]
    pub fn target_value(&self) -> &Value {
        &self.target
    }

    /// The time at which the transition leaves [`Status::Scheduled`].
    #[must_use]
    pub fn start_time(&self) -> HostTime {
        self.start_time
    }

    /// The transition's duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The phase that started this transition.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Linear progress as of the latest [`sample`](Self::sample).
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Status as of the latest [`sample`](Self::sample).
    #[must_use]
    pub fn status(&self) -> Status {
        if self.progress >= 1.0 {
            Status::Complete
        } else if self.started {
            Status::Running
        } else {
            Status::Scheduled
        }
    }

    /// Linear progress at `now`, never below the latest sampled progress.
    ///
    /// Progress holds until the start time even when the duration is zero.
    #[must_use]
    pub fn progress_at(&self, now: HostTime) -> f64 {
        if now < self.start_time {
            return self.progress;
        }
        let elapsed = now.saturating_duration_since(self.start_time);
        elapsed.ratio(self.duration).max(self.progress)
    }

    /// The interpolated value at `now`, without advancing the state.
    #[must_use]
    pub fn value_at(&self, now: HostTime) -> Value {
        self.value_for(self.progress_at(now))
    }

    /// Advances the state to `now` and returns the current value.
    pub fn sample(&mut self, now: HostTime) -> Value {
        if now >= self.start_time {
            self.started = true;
        }
        self.progress = self.progress_at(now);
        self.value_for(self.progress)
    }

    fn value_for(&self, progress: f64) -> Value {
        if progress >= 1.0 {
            return self.target.clone();
        }
        let eased = self.easing.apply(progress);
        self.start
            .interpolate(&self.target, eased)
            .unwrap_or_else(|| self.target.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(from: f64, to: f64, millis: u64) -> TransitionState {
        TransitionState::new(
            Value::Number(from),
            Value::Number(to),
            HostTime::ZERO,
            Timing::millis(millis),
            Phase::Update,
        )
    }

    #[test]
    fn linear_midpoint() {
        let mut t = linear(0.0, 10.0, 1000);
        assert_eq!(t.sample(HostTime::from_millis(500)), Value::Number(5.0));
        assert_eq!(t.status(), Status::Running);
    }

    #[test]
    fn progress_is_monotone_and_clamped() {
        let mut t = linear(0.0, 1.0, 100);
        let mut last = 0.0;
        for ms in [0, 10, 40, 40, 90, 120, 500] {
            t.sample(HostTime::from_millis(ms));
            assert!(t.progress() >= last, "progress went backwards at {ms}ms");
            assert!((0.0..=1.0).contains(&t.progress()));
            last = t.progress();
        }
        // An older timestamp does not rewind.
        t.sample(HostTime::from_millis(20));
        assert_eq!(t.progress(), 1.0);
        assert_eq!(t.status(), Status::Complete);
    }

    #[test]
    fn delay_keeps_transition_scheduled() {
        let timing = Timing::millis(100).with_delay(Duration::from_millis(50));
        let mut t = TransitionState::new(
            Value::Number(0.0),
            Value::Number(1.0),
            HostTime::ZERO,
            timing,
            Phase::Enter,
        );
        assert_eq!(t.sample(HostTime::from_millis(30)), Value::Number(0.0));
        assert_eq!(t.status(), Status::Scheduled);
        assert_eq!(t.sample(HostTime::from_millis(100)), Value::Number(0.5));
        assert_eq!(t.status(), Status::Running);
    }

    #[test]
    fn delayed_zero_duration_waits_for_its_start() {
        let timing = Timing::millis(0).with_delay(Duration::from_millis(100));
        let mut t = TransitionState::new(
            Value::Number(0.0),
            Value::Number(1.0),
            HostTime::ZERO,
            timing,
            Phase::Enter,
        );
        assert_eq!(t.sample(HostTime::from_millis(10)), Value::Number(0.0));
        assert_eq!(t.status(), Status::Scheduled);
        assert_eq!(t.sample(HostTime::from_millis(100)), Value::Number(1.0));
        assert_eq!(t.status(), Status::Complete);
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let mut t = linear(3.0, 4.0, 0);
        assert_eq!(t.sample(HostTime::ZERO), Value::Number(4.0));
        assert_eq!(t.status(), Status::Complete);
    }
}
