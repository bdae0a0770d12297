// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tick sources.
//!
//! The engine never reads a clock. Hosts deliver a [`FrameTick`] per frame
//! from whatever drives them (an animation-frame callback, a physics
//! simulation step, a test loop) and pass it to
//! [`Engine::tick`](crate::engine::Engine::tick).
//!
//! [`TickSource`] is the pull-based contract for such drivers: request a
//! tick, optionally cancel it, then pull it. Requests are one-shot, like
//! `requestAnimationFrame`: a host that wants to keep animating requests the
//! next tick while handling the current one.

use crate::time::{Duration, HostTime};

/// What produced a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickOrigin {
    /// A display-paced animation-frame loop.
    AnimationFrame,
    /// A physics simulation step.
    Physics,
    /// A host-driven step, e.g. in tests.
    Manual,
}

/// One frame opportunity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameTick {
    /// Host time of the frame.
    pub now: HostTime,
    /// Monotonically increasing frame counter.
    pub frame_index: u64,
    /// What produced the tick.
    pub origin: TickOrigin,
}

impl FrameTick {
    /// A manual tick at `now`.
    #[must_use]
    pub const fn manual(now: HostTime, frame_index: u64) -> Self {
        Self {
            now,
            frame_index,
            origin: TickOrigin::Manual,
        }
    }
}

/// Identifies one outstanding tick request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CancelToken(pub u64);

/// A driver of frame ticks.
pub trait TickSource {
    /// Requests one tick. Returns a token that cancels the request.
    fn request_tick(&mut self) -> CancelToken;

    /// Cancels an outstanding request. Unknown or fulfilled tokens are
    /// ignored.
    fn cancel(&mut self, token: CancelToken);

    /// Delivers the requested tick, or `None` if nothing is requested.
    fn next_tick(&mut self) -> Option<FrameTick>;
}

/// A deterministic animation-frame source with a fixed interval.
///
/// The first tick is delivered at `start`, each following one `interval`
/// later.
#[derive(Clone, Debug)]
pub struct FixedRateTicker {
    interval: Duration,
    next: HostTime,
    frame_index: u64,
    pending: Option<CancelToken>,
    next_token: u64,
}

impl FixedRateTicker {
    /// Creates a ticker starting at `start`.
    #[must_use]
    pub const fn new(start: HostTime, interval: Duration) -> Self {
        Self {
            interval,
            next: start,
            frame_index: 0,
            pending: None,
            next_token: 0,
        }
    }

    /// The time of the next delivered tick.
    #[must_use]
    pub const fn next_time(&self) -> HostTime {
        self.next
    }

    /// Whether a tick is requested and not yet delivered.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl TickSource for FixedRateTicker {
    fn request_tick(&mut self) -> CancelToken {
        if let Some(token) = self.pending {
            return token;
        }
        let token = CancelToken(self.next_token);
        self.next_token += 1;
        self.pending = Some(token);
        token
    }

    fn cancel(&mut self, token: CancelToken) {
        if self.pending == Some(token) {
            self.pending = None;
        }
    }

    fn next_tick(&mut self) -> Option<FrameTick> {
        self.pending.take()?;
        let tick = FrameTick {
            now: self.next,
            frame_index: self.frame_index,
            origin: TickOrigin::AnimationFrame,
        };
        self.next = self.next.saturating_add(self.interval);
        self.frame_index += 1;
        Some(tick)
    }
}
