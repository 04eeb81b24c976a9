//! Audio device.
//!
//! The device claims a single unused port and paces its thread at the cadence
//! one sample buffer lasts. Sample synthesis and playback belong to the host
//! audio backend outside the core; what the core owns is the real-time
//! scheduling that backend hangs off.

use crate::common::error::SimulationError;
use crate::common::id::ComponentId;
use crate::event::{EventKind, EventSink, SimEvent};
use crate::soc::bus::Bus;
use crate::soc::devices::pacing::{Pacer, spawn_device_loop};
use crate::soc::devices::{PortWindow, Ports, TimedContext};
use std::sync::Arc;
use std::time::Duration;

/// Playback sample rate in Hz.
pub const SAMPLE_RATE: u32 = 22_050;

/// Samples per buffer period.
pub const BUFFER_SAMPLES: u32 = 1024;

/// Wall-clock duration one buffer lasts.
pub fn buffer_period() -> Duration {
    Duration::from_nanos(1_000_000_000 / u64::from(SAMPLE_RATE)) * BUFFER_SAMPLES
}

struct AudioPorts;

impl Ports for AudioPorts {
    fn read_port(&mut self, _port: u32) -> u32 {
        0
    }

    fn write_port(&mut self, _port: u32, _value: u32) {}
}

/// The audio device mounted on the bus.
pub struct AudioDevice {
    window: PortWindow,
    ports: AudioPorts,
    sink: EventSink,
}

impl AudioDevice {
    /// Number of bus addresses the audio device claims.
    pub const PORT_COUNT: u32 = 1;

    /// Creates an audio device at the given base address.
    pub fn new(id: ComponentId, base: u32, sink: EventSink) -> Self {
        Self {
            window: PortWindow::new(id, base, Self::PORT_COUNT),
            ports: AudioPorts,
            sink,
        }
    }

    /// The device's claimed address window.
    pub const fn window(&self) -> &PortWindow {
        &self.window
    }

    /// Steps the bus protocol for one cycle.
    ///
    /// # Errors
    ///
    /// Propagates line ownership violations.
    pub fn step(&mut self, bus: &mut Bus) -> Result<(), SimulationError> {
        self.window.step(bus, &mut self.ports, &self.sink)
    }

    /// Starts the buffer pacing thread.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Thread`] if the thread could not be
    /// spawned.
    pub fn start(&mut self, ctx: &TimedContext) -> Result<(), SimulationError> {
        let sink = self.sink.clone();
        let source = self.window.id();
        let pacer = Pacer::new(
            buffer_period(),
            Arc::clone(&ctx.clock),
            Arc::clone(&ctx.running),
            Arc::clone(&ctx.paused),
        );
        spawn_device_loop("audio", &ctx.machine_name, pacer, move || {
            if sink.debug_enabled() {
                sink.emit(SimEvent {
                    source,
                    kind: EventKind::Debug("audio buffer period elapsed".to_owned()),
                });
            }
        })
    }
}
