//! Video device.
//!
//! The device exposes two write-only cursor ports on the bus and, on its own
//! thread, periodically snapshots video RAM into a text-mode [`Frame`]
//! published as an event. Turning a frame into pixels on a window is the
//! renderer's job and lives outside the core.
//!
//! The snapshot reads VRAM concurrently with main-loop writes through the
//! relaxed-atomic backing; a frame may mix bytes from adjacent cycles, which
//! is the tolerated behavior of an asynchronous refresh.

use crate::common::error::SimulationError;
use crate::common::id::ComponentId;
use crate::event::{EventKind, EventSink, SimEvent};
use crate::soc::bus::Bus;
use crate::soc::devices::pacing::{Pacer, period_of, spawn_device_loop};
use crate::soc::devices::{PortWindow, Ports, TimedContext};
use crate::soc::memory::store::ByteStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Text mode columns.
pub const TEXT_COLS: usize = 80;

/// Text mode rows.
pub const TEXT_ROWS: usize = 30;

/// Cursor row port index.
const PORT_CURSOR_ROW: u32 = 0;
/// Cursor column port index.
const PORT_CURSOR_COL: u32 = 1;

/// One text-mode frame snapshot.
///
/// Cells are character codes in row-major order, one row of [`TEXT_COLS`]
/// cells per text row.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Character cells, row-major.
    pub cells: Vec<u8>,
    /// Cursor row at snapshot time.
    pub cursor_row: u32,
    /// Cursor column at snapshot time.
    pub cursor_col: u32,
}

#[derive(Debug)]
struct Cursor {
    row: AtomicU32,
    col: AtomicU32,
}

struct VideoPorts {
    cursor: Arc<Cursor>,
}

impl Ports for VideoPorts {
    fn read_port(&mut self, _port: u32) -> u32 {
        // both cursor ports are write-only
        0
    }

    fn write_port(&mut self, port: u32, value: u32) {
        match port {
            PORT_CURSOR_ROW => self.cursor.row.store(value, Ordering::Relaxed),
            PORT_CURSOR_COL => self.cursor.col.store(value, Ordering::Relaxed),
            _ => {}
        }
    }
}

/// The video device mounted on the bus.
pub struct VideoDevice {
    window: PortWindow,
    ports: VideoPorts,
    vram: Arc<ByteStore>,
    frame_hz: u32,
    sink: EventSink,
}

impl VideoDevice {
    /// Number of bus addresses the video device claims.
    pub const PORT_COUNT: u32 = 2;

    /// Creates a video device rendering from the given VRAM backing.
    pub fn new(
        id: ComponentId,
        base: u32,
        frame_hz: u32,
        vram: Arc<ByteStore>,
        sink: EventSink,
    ) -> Self {
        Self {
            window: PortWindow::new(id, base, Self::PORT_COUNT),
            ports: VideoPorts {
                cursor: Arc::new(Cursor {
                    row: AtomicU32::new(0),
                    col: AtomicU32::new(0),
                }),
            },
            vram,
            frame_hz,
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

    /// Produces a frame snapshot immediately.
    ///
    /// The frame thread does this once per period; the debugger calls it to
    /// force a refresh while paused.
    pub fn render_frame(&self) -> Frame {
        snapshot(&self.vram, &self.ports.cursor)
    }

    /// Starts the frame thread.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Thread`] if the thread could not be
    /// spawned.
    pub fn start(&mut self, ctx: &TimedContext) -> Result<(), SimulationError> {
        let vram = Arc::clone(&self.vram);
        let cursor = Arc::clone(&self.ports.cursor);
        let sink = self.sink.clone();
        let source = self.window.id();
        let pacer = Pacer::new(
            period_of(self.frame_hz),
            Arc::clone(&ctx.clock),
            Arc::clone(&ctx.running),
            Arc::clone(&ctx.paused),
        );
        spawn_device_loop("video", &ctx.machine_name, pacer, move || {
            let frame = snapshot(&vram, &cursor);
            sink.emit(SimEvent {
                source,
                kind: EventKind::Frame(frame),
            });
        })
    }
}

fn snapshot(vram: &ByteStore, cursor: &Cursor) -> Frame {
    Frame {
        cells: vram.snapshot(0, TEXT_COLS * TEXT_ROWS),
        cursor_row: cursor.row.load(Ordering::Relaxed),
        cursor_col: cursor.col.load(Ordering::Relaxed),
    }
}
