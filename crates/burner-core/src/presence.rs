//! Typing indicators and the departure countdown.
//!
//! Both timers are stored as deadlines and evaluated when the owner polls
//! them with the current instant. Nothing here sleeps, so dropping the state
//! at teardown is enough to cancel every timer.

use std::{ops::Add, time::Duration};

/// Local typing debounce and remote typing flag.
///
/// Outbound `typing` goes out on the first keystroke after idle. Each
/// keystroke pushes the quiet deadline forward; once it passes, one
/// `stopped_typing` goes out.
#[derive(Debug, Clone)]
pub struct TypingState<I> {
    deadline: Option<I>,
    remote: bool,
}

impl<I> Default for TypingState<I> {
    fn default() -> Self {
        Self { deadline: None, remote: false }
    }
}

impl<I> TypingState<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Idle in both directions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a local keystroke. Returns true when `typing` should be sent.
    pub fn keystroke(&mut self, now: I, debounce: Duration) -> bool {
        let was_idle = self.deadline.is_none();
        self.deadline = Some(now + debounce);
        was_idle
    }

    /// Returns true exactly once when the quiet deadline has passed.
    pub fn poll(&mut self, now: I) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            },
            _ => false,
        }
    }

    /// Whether we last told the peer we are typing.
    pub fn is_typing(&self) -> bool {
        self.deadline.is_some()
    }

    /// Pending quiet deadline, if typing.
    pub fn deadline(&self) -> Option<I> {
        self.deadline
    }

    /// Update the remote flag. Returns true if it changed.
    pub fn set_remote(&mut self, typing: bool) -> bool {
        let changed = self.remote != typing;
        self.remote = typing;
        changed
    }

    /// Whether the peer is typing.
    pub fn remote(&self) -> bool {
        self.remote
    }

    /// Back to idle in both directions.
    pub fn reset(&mut self) {
        self.deadline = None;
        self.remote = false;
    }
}

/// Grace period between the peer leaving and forced teardown.
#[derive(Debug, Clone)]
pub struct DepartureCountdown<I> {
    remaining: u8,
    next_tick: I,
    tick: Duration,
}

impl<I> DepartureCountdown<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Start counting down from `from`, one step per `tick`.
    pub fn start(now: I, from: u8, tick: Duration) -> Self {
        Self { remaining: from, next_tick: now + tick, tick }
    }

    /// Advance to `now`. Returns the remaining count after each elapsed tick.
    ///
    /// Several values are returned if the caller polled late; the last value
    /// is the current count.
    pub fn poll(&mut self, now: I) -> Vec<u8> {
        let mut elapsed = Vec::new();

        while self.remaining > 0 && now >= self.next_tick {
            self.remaining -= 1;
            self.next_tick = self.next_tick + self.tick;
            elapsed.push(self.remaining);
        }

        elapsed
    }

    /// Current count.
    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    /// True once the count reached zero.
    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }
}
