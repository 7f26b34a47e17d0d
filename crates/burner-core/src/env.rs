//! Environment abstraction for deterministic testing.
//!
//! Decouples the session logic from system resources (time, randomness). The
//! production [`SystemEnv`] reads the tokio clock and OS entropy; the
//! [`test_utils::MockEnv`] uses a manually advanced clock and a seeded RNG so
//! session tests replay identically.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

/// Abstract environment providing time, randomness, and async primitives.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Timers are stored as deadlines, so instants must support adding a
    /// `Duration`.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + std::fmt::Debug
        + Sub<Output = Duration>
        + Add<Duration, Output = Self::Instant>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this; the session itself never sleeps.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// Used for ephemeral key generation and envelope nonces.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Wall-clock time in Unix milliseconds, used for message timestamps.
    fn wall_clock_ms(&self) -> u64;

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}

/// Production environment using the tokio clock and OS randomness.
///
/// Instants come from `tokio::time::Instant`, so a runtime started with
/// paused time drives session timers deterministically.
///
/// # Panics
///
/// Panics if the OS RNG fails. Without working randomness neither ephemeral
/// keys nor nonces can be generated safely.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - keys and nonces need entropy");
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as u64)
    }
}

/// Deterministic environment for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use std::{
        ops::{Add, Sub},
        sync::{Arc, Mutex, PoisonError},
        time::Duration,
    };

    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    use super::Environment;

    /// Wall-clock origin of every mock environment (2024-01-01T00:00:00Z).
    const MOCK_EPOCH_MS: u64 = 1_704_067_200_000;

    /// Virtual instant: time elapsed since the mock environment was created.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct MockInstant(Duration);

    impl Sub for MockInstant {
        type Output = Duration;

        fn sub(self, earlier: Self) -> Duration {
            self.0.saturating_sub(earlier.0)
        }
    }

    impl Add<Duration> for MockInstant {
        type Output = Self;

        fn add(self, duration: Duration) -> Self {
            Self(self.0 + duration)
        }
    }

    struct MockState {
        rng: ChaCha20Rng,
        elapsed: Duration,
    }

    /// Seeded RNG and a clock that only moves when told to.
    ///
    /// Clones share state, so a test can hold one handle while the session
    /// owns another. `sleep` advances the clock instantly.
    #[derive(Clone)]
    pub struct MockEnv {
        state: Arc<Mutex<MockState>>,
    }

    impl MockEnv {
        /// Mock environment with seed 0.
        pub fn new() -> Self {
            Self::with_seed(0)
        }

        /// Mock environment with the given RNG seed.
        pub fn with_seed(seed: u64) -> Self {
            let state = MockState { rng: ChaCha20Rng::seed_from_u64(seed), elapsed: Duration::ZERO };
            Self { state: Arc::new(Mutex::new(state)) }
        }

        /// Move the clock forward.
        pub fn advance(&self, duration: Duration) {
            self.state.lock().unwrap_or_else(PoisonError::into_inner).elapsed += duration;
        }
    }

    impl Default for MockEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Environment for MockEnv {
        type Instant = MockInstant;

        fn now(&self) -> MockInstant {
            MockInstant(self.state.lock().unwrap_or_else(PoisonError::into_inner).elapsed)
        }

        fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            self.advance(duration);
            std::future::ready(())
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            self.state.lock().unwrap_or_else(PoisonError::into_inner).rng.fill_bytes(buffer);
        }

        fn wall_clock_ms(&self) -> u64 {
            let elapsed = self.state.lock().unwrap_or_else(PoisonError::into_inner).elapsed;
            MOCK_EPOCH_MS + elapsed.as_millis() as u64
        }
    }
}
