//! Segmented memory space.
//!
//! The memory space answers bus transactions for a flat address range split
//! into three fixed regions:
//! 1. **Program image:** holds code and constant data loaded at construction.
//! 2. **RAM:** general read/write storage.
//! 3. **Video RAM:** text cells the video device renders asynchronously.
//!
//! Regions are defined by inclusive begin/end address pairs and carry their
//! own read/write permission policy. Addresses outside every region are
//! assumed to target a device and are ignored here.

/// Shared byte storage backing a region.
pub mod store;

use crate::common::data::{AccessKind, ByteSelect};
use crate::common::error::SimulationError;
use crate::common::id::ComponentId;
use crate::config::MemoryConfig;
use crate::event::{EventKind, EventSink, SimEvent};
use crate::soc::bus::Bus;
use std::fmt;
use std::sync::Arc;
use store::ByteStore;

/// The fixed region roles of the address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// The program image (EPROM).
    Program,
    /// General purpose RAM.
    Ram,
    /// Video RAM rendered by the video device.
    Video,
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Program => "program",
            Self::Ram => "ram",
            Self::Video => "video",
        };
        f.write_str(name)
    }
}

/// One contiguous, permission-tagged slice of the address space.
#[derive(Debug)]
pub struct Region {
    kind: RegionKind,
    start: u32,
    end: u32,
    allow_read: bool,
    allow_write: bool,
    bytes: Arc<ByteStore>,
}

impl Region {
    fn new(kind: RegionKind, start: u32, end: u32, allow_read: bool, allow_write: bool) -> Self {
        let capacity = (end - start + 1) as usize;
        Self {
            kind,
            start,
            end,
            allow_read,
            allow_write,
            bytes: Arc::new(ByteStore::new(capacity)),
        }
    }

    const fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr <= self.end
    }

    const fn offset(&self, addr: u32) -> usize {
        (addr - self.start) as usize
    }
}

/// The memory space mounted on the bus.
pub struct MemorySpace {
    regions: [Region; 3],
    driving: bool,
    sink: EventSink,
}

impl MemorySpace {
    /// Builds the three regions from configuration and loads the program
    /// image into the program region.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::ImageTooLarge`] if the image exceeds the
    /// program region's capacity.
    pub fn new(
        config: &MemoryConfig,
        image: &[u8],
        sink: EventSink,
    ) -> Result<Self, SimulationError> {
        let program = Region::new(
            RegionKind::Program,
            config.eprom_start,
            config.eprom_end,
            true,
            config.allow_eprom_writes,
        );
        let ram = Region::new(RegionKind::Ram, config.ram_start, config.ram_end, true, true);
        let video = Region::new(
            RegionKind::Video,
            config.vram_start,
            config.vram_end,
            config.allow_vram_reads,
            true,
        );

        if image.len() > program.bytes.len() {
            return Err(SimulationError::ImageTooLarge {
                image: image.len(),
                capacity: program.bytes.len(),
            });
        }
        program.bytes.fill_from(image);

        Ok(Self {
            regions: [program, ram, video],
            driving: false,
            sink,
        })
    }

    /// Whether an address falls inside one of the configured regions.
    pub fn in_bounds(&self, addr: u32) -> bool {
        self.regions.iter().any(|region| region.contains(addr))
    }

    /// Shared handle to the video RAM bytes, for the video device's renderer.
    pub fn video_store(&self) -> Arc<ByteStore> {
        Arc::clone(&self.regions[2].bytes)
    }

    /// Base address of the video RAM region.
    pub const fn video_base(&self) -> u32 {
        self.regions[2].start
    }

    /// Reads one byte, enforcing region read permission unless
    /// `debug_override` is set.
    ///
    /// # Errors
    ///
    /// [`SimulationError::OutOfRegion`] outside every region;
    /// [`SimulationError::Permission`] when the region forbids reads.
    pub fn read_byte(&self, addr: u32, debug_override: bool) -> Result<u8, SimulationError> {
        let region = self
            .regions
            .iter()
            .find(|region| region.contains(addr))
            .ok_or(SimulationError::OutOfRegion { addr })?;

        if !region.allow_read && !debug_override {
            return Err(SimulationError::Permission {
                addr,
                access: AccessKind::Read,
                region: region.kind,
            });
        }
        Ok(region.bytes.get(region.offset(addr)))
    }

    /// Writes one byte, enforcing region write permission unless
    /// `debug_override` is set.
    ///
    /// # Errors
    ///
    /// [`SimulationError::OutOfRegion`] outside every region;
    /// [`SimulationError::Permission`] when the region forbids writes.
    pub fn write_byte(
        &self,
        addr: u32,
        value: u8,
        debug_override: bool,
    ) -> Result<(), SimulationError> {
        let region = self
            .regions
            .iter()
            .find(|region| region.contains(addr))
            .ok_or(SimulationError::OutOfRegion { addr })?;

        if !region.allow_write && !debug_override {
            return Err(SimulationError::Permission {
                addr,
                access: AccessKind::Write,
                region: region.kind,
            });
        }
        region.bytes.set(region.offset(addr), value);
        Ok(())
    }

    /// Handles one cycle of the bus protocol.
    ///
    /// Out-of-region addresses are assumed to be device accesses and ignored.
    /// A read assembles 1/2/4 little-endian bytes and drives the data line
    /// for this step; the line is released on the following idle step. A
    /// write decomposes the data line word the same way. Both check natural
    /// alignment for the committed byte-select.
    ///
    /// # Errors
    ///
    /// [`SimulationError::BusProtocol`] when read and write enable are both
    /// high, plus the alignment and permission errors of the byte accessors.
    pub fn step(&mut self, bus: &mut Bus) -> Result<(), SimulationError> {
        let addr = bus.address.read();
        if !self.in_bounds(addr) {
            if self.driving {
                bus.data.release(ComponentId::Memory)?;
                self.driving = false;
            }
            return Ok(());
        }

        let read_enable = bus.read_enable.read() == 1;
        let write_enable = bus.write_enable.read() == 1;

        if read_enable && write_enable {
            return Err(SimulationError::BusProtocol { addr });
        }

        if read_enable {
            let select = ByteSelect::from_line(bus.byte_select.read())?;
            if !select.is_aligned(addr) {
                return Err(SimulationError::Alignment { addr, select });
            }

            let mut data = 0u32;
            for i in 0..select.width_bytes() {
                data |= u32::from(self.read_byte(addr + i, false)?) << (8 * i);
            }

            bus.data.drive(ComponentId::Memory, data)?;
            self.driving = true;

            if self.sink.debug_enabled() {
                self.sink.emit(SimEvent {
                    source: ComponentId::Memory,
                    kind: EventKind::BusRead { addr, value: data },
                });
            }
            return Ok(());
        }

        if write_enable {
            let select = ByteSelect::from_line(bus.byte_select.read())?;
            if !select.is_aligned(addr) {
                return Err(SimulationError::Alignment { addr, select });
            }

            let data = bus.data.read();
            for i in 0..select.width_bytes() {
                self.write_byte(addr + i, (data >> (8 * i)) as u8, false)?;
            }

            if self.sink.debug_enabled() {
                self.sink.emit(SimEvent {
                    source: ComponentId::Memory,
                    kind: EventKind::BusWrite { addr, value: data },
                });
            }
            return Ok(());
        }

        if self.driving {
            bus.data.release(ComponentId::Memory)?;
            self.driving = false;
        }
        Ok(())
    }
}
