//! The shared system bus.
//!
//! The bus is nothing more than five tri-state lines stepped together:
//! address, data, read enable, write enable, and byte select. All arbitration
//! is the per-line single-driver rule; the bus adds no logic of its own.
//! Control lines use 0 for low and 1 for high; the byte-select line carries a
//! [`crate::common::ByteSelect`] state.

/// Tri-state line implementation.
pub mod line;

use line::{LineName, TriStateLine};

/// The five lines every component observes each cycle.
#[derive(Debug)]
pub struct Bus {
    /// 32 bit address line.
    pub address: TriStateLine,
    /// 32 bit data line.
    pub data: TriStateLine,
    /// Read enable control line (active high).
    pub read_enable: TriStateLine,
    /// Write enable control line (active high).
    pub write_enable: TriStateLine,
    /// Byte-select control line.
    pub byte_select: TriStateLine,
}

impl Bus {
    /// Creates a bus with all lines free and carrying zero.
    pub const fn new() -> Self {
        Self {
            address: TriStateLine::new(LineName::Address),
            data: TriStateLine::new(LineName::Data),
            read_enable: TriStateLine::new(LineName::ReadEnable),
            write_enable: TriStateLine::new(LineName::WriteEnable),
            byte_select: TriStateLine::new(LineName::ByteSelect),
        }
    }

    /// Commits every line's buffered value, in fixed declared order.
    pub fn step(&mut self) {
        self.address.step();
        self.data.step();
        self.read_enable.step();
        self.write_enable.step();
        self.byte_select.step();
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}
