//! Port-mapped I/O devices.
//!
//! Devices claim a window of bus addresses, one address per port, and answer
//! reads and writes seen there. The set of device kinds is closed and known
//! at compile time, so dispatch is an enum rather than trait objects:
//! 1. **[`Ports`]:** the capability each device implements (port read/write,
//!    possibly with side effects such as dequeuing a key).
//! 2. **[`PortWindow`]:** the shared bus protocol of every device.
//! 3. **[`Device`]:** the closed roster of video, keyboard, timer, network,
//!    and audio devices.

/// Audio device (paced buffer periods; synthesis lives outside the core).
pub mod audio;

/// Keyboard device with a buffered key queue.
pub mod keyboard;

/// Word-broadcast network device and its shared hub.
pub mod network;

/// Real-time pacing for devices that run on their own thread.
pub mod pacing;

/// Timer device raising a periodic tick flag.
pub mod timer;

/// Video device exposing cursor ports and publishing frame snapshots.
pub mod video;

use crate::common::error::SimulationError;
use crate::common::id::ComponentId;
use crate::event::{EventKind, EventSink, SimEvent};
use crate::soc::bus::Bus;
use pacing::DeviceClock;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub use audio::AudioDevice;
pub use keyboard::{KeyboardDevice, KeyboardHandle};
pub use network::{NetworkDevice, NetworkHub};
pub use timer::TimerDevice;
pub use video::VideoDevice;

/// Port access capability implemented by every device kind.
///
/// Port indices are relative to the device's base address. Reads may have
/// side effects; writes to read-only ports are ignored.
pub trait Ports {
    /// Returns the value the given port presents on the data line.
    fn read_port(&mut self, port: u32) -> u32;

    /// Accepts a value written to the given port.
    fn write_port(&mut self, port: u32, value: u32);
}

/// Shared resources handed to timed devices when their threads start.
#[derive(Clone)]
pub struct TimedContext {
    /// Cleared by the orchestrator to stop every device thread.
    pub running: Arc<AtomicBool>,
    /// Advisory debug pause honored inside device wait loops.
    pub paused: Arc<AtomicBool>,
    /// Clock and wait strategy for deadline pacing.
    pub clock: Arc<dyn DeviceClock>,
    /// Machine name used for thread naming.
    pub machine_name: String,
}

/// The bus-facing half shared by all port-mapped devices.
///
/// Owns the claimed address window and the data-line driving state, and runs
/// the port read/write protocol against a [`Ports`] implementation.
#[derive(Debug)]
pub struct PortWindow {
    id: ComponentId,
    base: u32,
    ports: u32,
    driving: bool,
}

impl PortWindow {
    /// Claims `ports` consecutive bus addresses starting at `base`.
    pub const fn new(id: ComponentId, base: u32, ports: u32) -> Self {
        Self {
            id,
            base,
            ports,
            driving: false,
        }
    }

    /// Identity of the owning device.
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// First claimed bus address.
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Number of claimed bus addresses.
    pub const fn port_count(&self) -> u32 {
        self.ports
    }

    /// Whether an address falls inside the claimed window.
    pub const fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr < self.base + self.ports
    }

    /// Handles one cycle of the bus protocol for the owning device.
    ///
    /// Addresses outside the window are ignored, releasing the data line if
    /// this device drove it on the previous transaction. A read drives the
    /// data line with the port value for this step; a write hands the data
    /// line word to the port.
    ///
    /// # Errors
    ///
    /// Propagates line ownership violations, which indicate overlapping
    /// device windows or a mis-ordered component.
    pub fn step(
        &mut self,
        bus: &mut Bus,
        ports: &mut impl Ports,
        sink: &EventSink,
    ) -> Result<(), SimulationError> {
        let addr = bus.address.read();
        if !self.contains(addr) {
            if self.driving {
                bus.data.release(self.id)?;
                self.driving = false;
            }
            return Ok(());
        }

        let port = addr - self.base;
        let read_enable = bus.read_enable.read() == 1;
        let write_enable = bus.write_enable.read() == 1;

        if read_enable {
            let value = ports.read_port(port);
            bus.data.drive(self.id, value)?;
            self.driving = true;

            if sink.debug_enabled() {
                sink.emit(SimEvent {
                    source: self.id,
                    kind: EventKind::BusRead { addr, value },
                });
            }
            return Ok(());
        }

        if write_enable {
            let value = bus.data.read();
            ports.write_port(port, value);

            if sink.debug_enabled() {
                sink.emit(SimEvent {
                    source: self.id,
                    kind: EventKind::BusWrite { addr, value },
                });
            }
            return Ok(());
        }

        if self.driving {
            bus.data.release(self.id)?;
            self.driving = false;
        }
        Ok(())
    }
}

/// The closed set of devices a machine can mount.
pub enum Device {
    /// Text-mode video device.
    Video(VideoDevice),
    /// Buffered keyboard device.
    Keyboard(KeyboardDevice),
    /// Periodic timer device.
    Timer(TimerDevice),
    /// Word-broadcast network device.
    Network(NetworkDevice),
    /// Audio device.
    Audio(AudioDevice),
}

impl Device {
    /// Steps the device's bus protocol for one cycle.
    ///
    /// # Errors
    ///
    /// Propagates line ownership violations.
    pub fn step(&mut self, bus: &mut Bus) -> Result<(), SimulationError> {
        match self {
            Self::Video(dev) => dev.step(bus),
            Self::Keyboard(dev) => dev.step(bus),
            Self::Timer(dev) => dev.step(bus),
            Self::Network(dev) => dev.step(bus),
            Self::Audio(dev) => dev.step(bus),
        }
    }

    /// Starts the device's thread, if it is a timed device.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Thread`] if the thread could not be
    /// spawned.
    pub fn start(&mut self, ctx: &TimedContext) -> Result<(), SimulationError> {
        match self {
            Self::Video(dev) => dev.start(ctx),
            Self::Timer(dev) => dev.start(ctx),
            Self::Audio(dev) => dev.start(ctx),
            Self::Keyboard(_) | Self::Network(_) => Ok(()),
        }
    }

    /// The device's claimed address window.
    pub const fn window(&self) -> &PortWindow {
        match self {
            Self::Video(dev) => dev.window(),
            Self::Keyboard(dev) => dev.window(),
            Self::Timer(dev) => dev.window(),
            Self::Network(dev) => dev.window(),
            Self::Audio(dev) => dev.window(),
        }
    }

    /// Returns the keyboard device if this is one.
    pub const fn as_keyboard(&self) -> Option<&KeyboardDevice> {
        match self {
            Self::Keyboard(dev) => Some(dev),
            _ => None,
        }
    }

    /// Returns the video device if this is one.
    pub const fn as_video(&self) -> Option<&VideoDevice> {
        match self {
            Self::Video(dev) => Some(dev),
            _ => None,
        }
    }

    /// Returns the network device if this is one.
    pub const fn as_network(&self) -> Option<&NetworkDevice> {
        match self {
            Self::Network(dev) => Some(dev),
            _ => None,
        }
    }
}
