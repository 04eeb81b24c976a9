//! Keyboard device.
//!
//! Buffers key codes pushed by an external input source and hands them to the
//! emulated program through two ports: a status port and a data port that
//! dequeues one code per read.

use crate::common::error::SimulationError;
use crate::common::id::ComponentId;
use crate::event::EventSink;
use crate::soc::bus::Bus;
use crate::soc::devices::{PortWindow, Ports};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Keys buffered beyond this are dropped.
pub const KEY_BUFFER_CAPACITY: usize = 64;

/// Status port index: 1 while a code is buffered, 0 otherwise.
const PORT_STATUS: u32 = 0;
/// Data port index: dequeues one code, 0 when empty.
const PORT_DATA: u32 = 1;

type KeyBuffer = Arc<Mutex<VecDeque<u32>>>;

/// Cloneable handle an input source uses to feed key codes in.
///
/// The window/event glue that captures host keys lives outside the core; it
/// only ever sees this handle.
#[derive(Debug, Clone)]
pub struct KeyboardHandle {
    buffer: KeyBuffer,
}

impl KeyboardHandle {
    /// Enqueues one key code; codes beyond the buffer capacity are dropped.
    pub fn push_key(&self, code: u32) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        if buffer.len() < KEY_BUFFER_CAPACITY {
            buffer.push_back(code);
        }
    }
}

struct KeyboardPorts {
    buffer: KeyBuffer,
}

impl Ports for KeyboardPorts {
    fn read_port(&mut self, port: u32) -> u32 {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        match port {
            PORT_STATUS => u32::from(!buffer.is_empty()),
            PORT_DATA => buffer.pop_front().unwrap_or(0),
            _ => 0,
        }
    }

    fn write_port(&mut self, _port: u32, _value: u32) {
        // both ports are read-only
    }
}

/// The keyboard device mounted on the bus.
pub struct KeyboardDevice {
    window: PortWindow,
    ports: KeyboardPorts,
    sink: EventSink,
}

impl KeyboardDevice {
    /// Number of bus addresses the keyboard claims.
    pub const PORT_COUNT: u32 = 2;

    /// Creates a keyboard device at the given base address.
    pub fn new(id: ComponentId, base: u32, sink: EventSink) -> Self {
        Self {
            window: PortWindow::new(id, base, Self::PORT_COUNT),
            ports: KeyboardPorts {
                buffer: Arc::new(Mutex::new(VecDeque::new())),
            },
            sink,
        }
    }

    /// Handle for the external input source feeding this keyboard.
    pub fn handle(&self) -> KeyboardHandle {
        KeyboardHandle {
            buffer: Arc::clone(&self.ports.buffer),
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
}
