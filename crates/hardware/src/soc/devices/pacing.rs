//! Real-time pacing for timed devices.
//!
//! A timed device performs its work, then waits for an absolute deadline one
//! period after the previous one. The wait is hybrid: a coarse sleep when
//! more than a millisecond remains, leaving a margin, then a busy spin to hit
//! the deadline precisely. While the debug pause signal is raised the wait
//! polls instead, so single-stepping does not starve real time.
//!
//! The clock is a trait so tests can drive device loops without wall-clock
//! waits.

use crate::common::error::SimulationError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Waits shorter than this skip the coarse sleep entirely.
pub const SPIN_THRESHOLD: Duration = Duration::from_millis(1);

/// Margin left unslept before the busy spin takes over.
pub const SLEEP_MARGIN: Duration = Duration::from_micros(500);

/// Poll interval while the debug pause signal is raised.
pub const PAUSE_POLL: Duration = Duration::from_millis(1);

/// Clock and wait strategy used by timed device loops.
pub trait DeviceClock: Send + Sync {
    /// Monotonic time since the clock's origin.
    fn now(&self) -> Duration;

    /// Coarse wait; precision is the host scheduler's.
    fn sleep(&self, duration: Duration);

    /// Fine wait until `deadline`; the default implementation busy spins.
    fn busy_wait(&self, deadline: Duration) {
        while self.now() < deadline {
            std::hint::spin_loop();
        }
    }
}

/// Wall-clock implementation used outside tests.
#[derive(Debug)]
pub struct HostClock {
    origin: Instant,
}

impl HostClock {
    /// Creates a clock with its origin at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceClock for HostClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Converts a device frequency into its loop period.
pub fn period_of(frequency_hz: u32) -> Duration {
    Duration::from_secs(1) / frequency_hz.max(1)
}

/// Deadline-paced loop driver for one device thread.
pub struct Pacer {
    period: Duration,
    deadline: Duration,
    clock: Arc<dyn DeviceClock>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl Pacer {
    /// Creates a pacer with the given period and shared control flags.
    pub fn new(
        period: Duration,
        clock: Arc<dyn DeviceClock>,
        running: Arc<AtomicBool>,
        paused: Arc<AtomicBool>,
    ) -> Self {
        Self {
            period,
            deadline: Duration::ZERO,
            clock,
            running,
            paused,
        }
    }

    /// Runs `work` once per period until the running flag clears.
    ///
    /// Deadlines are absolute: each is one period after the previous one, so
    /// jitter in one iteration does not accumulate. An iteration that
    /// overruns its deadline starts the next one immediately.
    pub fn run(mut self, mut work: impl FnMut()) {
        self.deadline = self.clock.now();
        while self.running.load(Ordering::Acquire) {
            work();
            self.deadline += self.period;
            self.wait();
        }
    }

    fn wait(&self) {
        while self.paused.load(Ordering::Acquire) {
            if !self.running.load(Ordering::Acquire) {
                return;
            }
            self.clock.sleep(PAUSE_POLL);
        }

        let now = self.clock.now();
        if let Some(remaining) = self.deadline.checked_sub(now) {
            if remaining > SPIN_THRESHOLD {
                self.clock.sleep(remaining - SLEEP_MARGIN);
            }
            self.clock.busy_wait(self.deadline);
        }
    }
}

/// Spawns a named thread running a paced device loop.
///
/// Device threads are detached; they exit on their own when the shared
/// running flag clears.
///
/// # Errors
///
/// Returns [`SimulationError::Thread`] if the OS refuses the thread.
pub fn spawn_device_loop(
    device: &str,
    machine: &str,
    pacer: Pacer,
    work: impl FnMut() + Send + 'static,
) -> Result<(), SimulationError> {
    let name = format!("device {device} - {machine}");
    let span_name = name.clone();
    thread::Builder::new()
        .name(name)
        .spawn(move || {
            tracing::debug!(thread = %span_name, "device thread started");
            pacer.run(work);
            tracing::debug!(thread = %span_name, "device thread stopped");
        })
        .map(drop)
        .map_err(|err| SimulationError::Thread(err.to_string()))
}
