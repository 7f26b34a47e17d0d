//! Session timing configuration.

use std::time::Duration;

/// Default quiet interval before `stopped_typing` is sent.
pub const DEFAULT_TYPING_DEBOUNCE: Duration = Duration::from_secs(1);

/// Default departure countdown start value.
pub const DEFAULT_DEPARTURE_COUNTDOWN: u8 = 5;

/// Default interval between departure countdown steps.
pub const DEFAULT_DEPARTURE_TICK: Duration = Duration::from_secs(1);

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Quiet interval after the last keystroke before `stopped_typing`
    pub typing_debounce: Duration,
    /// Countdown start value after the peer leaves
    pub departure_countdown: u8,
    /// Interval between countdown steps
    pub departure_tick: Duration,
}

impl SessionConfig {
    /// Total grace period between `peer_left` and teardown.
    pub fn departure_grace(&self) -> Duration {
        self.departure_tick * u32::from(self.departure_countdown)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            typing_debounce: DEFAULT_TYPING_DEBOUNCE,
            departure_countdown: DEFAULT_DEPARTURE_COUNTDOWN,
            departure_tick: DEFAULT_DEPARTURE_TICK,
        }
    }
}
