//! Timer device.
//!
//! A thread sets a tick flag at a fixed frequency; the emulated program polls
//! the single status port, which reads the flag and clears it.

use crate::common::error::SimulationError;
use crate::common::id::ComponentId;
use crate::event::EventSink;
use crate::soc::bus::Bus;
use crate::soc::devices::pacing::{Pacer, period_of, spawn_device_loop};
use crate::soc::devices::{PortWindow, Ports, TimedContext};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

struct TimerPorts {
    ticked: Arc<AtomicBool>,
}

impl Ports for TimerPorts {
    fn read_port(&mut self, _port: u32) -> u32 {
        u32::from(self.ticked.swap(false, Ordering::AcqRel))
    }

    fn write_port(&mut self, _port: u32, _value: u32) {
        // the status port is read-only
    }
}

/// The timer device mounted on the bus.
pub struct TimerDevice {
    window: PortWindow,
    ports: TimerPorts,
    tick_hz: u32,
    sink: EventSink,
}

impl TimerDevice {
    /// Number of bus addresses the timer claims.
    pub const PORT_COUNT: u32 = 1;

    /// Creates a timer ticking at `tick_hz`.
    pub fn new(id: ComponentId, base: u32, tick_hz: u32, sink: EventSink) -> Self {
        Self {
            window: PortWindow::new(id, base, Self::PORT_COUNT),
            ports: TimerPorts {
                ticked: Arc::new(AtomicBool::new(false)),
            },
            tick_hz,
            sink,
        }
    }

    /// The device's claimed address window.
    pub const fn window(&self) -> &PortWindow {
        &self.window
    }

    /// Marks one elapsed timer period.
    ///
    /// The tick thread calls this once per period; it is public so a paused
    /// machine can be ticked by hand.
    pub fn tick(&self) {
        self.ports.ticked.store(true, Ordering::Release);
    }

    /// Steps the bus protocol for one cycle.
    ///
    /// # Errors
    ///
    /// Propagates line ownership violations.
    pub fn step(&mut self, bus: &mut Bus) -> Result<(), SimulationError> {
        self.window.step(bus, &mut self.ports, &self.sink)
    }

    /// Starts the tick thread.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Thread`] if the thread could not be
    /// spawned.
    pub fn start(&mut self, ctx: &TimedContext) -> Result<(), SimulationError> {
        let ticked = Arc::clone(&self.ports.ticked);
        let pacer = Pacer::new(
            period_of(self.tick_hz),
            Arc::clone(&ctx.clock),
            Arc::clone(&ctx.running),
            Arc::clone(&ctx.paused),
        );
        spawn_device_loop("timer", &ctx.machine_name, pacer, move || {
            ticked.store(true, Ordering::Release);
        })
    }
}
