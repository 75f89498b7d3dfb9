//! Time abstraction for the GPS scheduler.
//!
//! Every timeout in the GPS subsystem (baud cycling, NMEA settling, link
//! staleness) is measured in milliseconds read from a `TimeSource`, so host
//! tests can drive the state machines with `MockTime`.

use core::cell::Cell;

/// Platform-agnostic millisecond clock.
///
/// - `EmbassyTime` (feature `embassy`) for embedded targets
/// - `MockTime` for host testing with controllable time
///
/// # Example
///
/// ```
/// use trail_gps::core::traits::{MockTime, TimeSource};
///
/// fn stale<T: TimeSource>(time: &T, last_message_ms: u64) -> bool {
///     time.elapsed_ms_since(last_message_ms) > 1200
/// }
///
/// let time = MockTime::new();
/// time.advance_ms(1201);
/// assert!(stale(&time, 0));
/// ```
pub trait TimeSource: Clone + Send + Sync {
    /// Returns current time in milliseconds since system start.
    fn now_ms(&self) -> u64;

    /// Returns current time in microseconds since system start.
    fn now_us(&self) -> u64;

    /// Returns elapsed time in microseconds since a reference point.
    ///
    /// Uses saturating subtraction to handle potential overflow.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }

    /// Returns elapsed milliseconds since a reference point (saturating).
    fn elapsed_ms_since(&self, reference_ms: u64) -> u64 {
        self.now_ms().saturating_sub(reference_ms)
    }
}

impl<T: TimeSource> TimeSource for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

// ============================================================================
// Embassy Implementation
// ============================================================================

/// Embassy-based time source using the Embassy time driver.
#[cfg(feature = "embassy")]
#[derive(Clone, Copy, Default)]
pub struct EmbassyTime;

#[cfg(feature = "embassy")]
impl TimeSource for EmbassyTime {
    fn now_ms(&self) -> u64 {
        embassy_time::Instant::now().as_millis()
    }

    fn now_us(&self) -> u64 {
        embassy_time::Instant::now().as_micros()
    }
}

// ============================================================================
// Mock Implementation (always available for testing)
// ============================================================================

/// Mock time source for testing with controllable time advancement.
///
/// Hand the GPS manager `&MockTime` so the test keeps control of the clock.
#[derive(Clone, Default)]
pub struct MockTime {
    current_us: Cell<u64>,
}

// Safety: MockTime is only used in single-threaded test contexts
// where Cell is safe. The Send+Sync bounds on TimeSource trait
// are required for embedded contexts, but MockTime is not used there.
unsafe impl Send for MockTime {}
unsafe impl Sync for MockTime {}

impl MockTime {
    /// Creates a new `MockTime` starting at time 0.
    pub fn new() -> Self {
        Self {
            current_us: Cell::new(0),
        }
    }

    /// Creates a new `MockTime` starting at the given millisecond.
    pub fn with_initial_ms(ms: u64) -> Self {
        Self {
            current_us: Cell::new(ms * 1000),
        }
    }

    /// Sets the current time to an absolute millisecond value.
    pub fn set_ms(&self, ms: u64) {
        self.current_us.set(ms * 1000);
    }

    /// Advances the current time by the given number of microseconds.
    pub fn advance(&self, us: u64) {
        self.current_us.set(self.current_us.get() + us);
    }

    /// Advances the current time by the given number of milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(ms * 1000);
    }
}

impl TimeSource for MockTime {
    fn now_ms(&self) -> u64 {
        self.current_us.get() / 1000
    }

    fn now_us(&self) -> u64 {
        self.current_us.get()
    }
}
