//! Fatal error taxonomy.
//!
//! Every fatal condition in the simulator maps to one variant here:
//! 1. **Protocol violations** (double drive, release of a foreign line,
//!    simultaneous read and write enable) indicate a bug in the core or a
//!    mis-ordered component.
//! 2. **Memory violations** (out-of-region, misalignment, permission)
//!    indicate a bug in the emulated program.
//! 3. **Decode violations** (unknown opcode, bad environment call).
//! 4. **Construction violations** (oversized image, malformed configuration)
//!    fail before any stepping begins.
//!
//! None of these are recovered locally; they propagate to the main loop and
//! stop the owning simulation instance. A clean halt is not an error and is
//! reported as an event instead.

use crate::common::data::{AccessKind, ByteSelect};
use crate::common::id::ComponentId;
use crate::soc::bus::line::LineName;
use crate::soc::memory::RegionKind;
use thiserror::Error;

/// Unified error type for all fatal simulation conditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// A component drove a line another component currently owns.
    #[error("{driver:?} drove the {line} line already driven by {owner:?}")]
    DoubleDrive {
        /// Line the drive was attempted on.
        line: LineName,
        /// Component that owns the line.
        owner: ComponentId,
        /// Component that attempted the drive.
        driver: ComponentId,
    },

    /// A component released a line it does not own.
    #[error("{driver:?} released the {line} line it does not own")]
    ReleaseNotOwned {
        /// Line the release was attempted on.
        line: LineName,
        /// Component that attempted the release.
        driver: ComponentId,
    },

    /// Read enable and write enable were committed high in the same cycle.
    #[error("read enable and write enable simultaneously high at {addr:#010x}")]
    BusProtocol {
        /// Address on the bus when the violation was observed.
        addr: u32,
    },

    /// The byte-select line carried a value outside its defined states.
    #[error("invalid byte select value {value} on the bus")]
    InvalidByteSelect {
        /// Raw committed line value.
        value: u32,
    },

    /// An access was not naturally aligned for its transfer width.
    #[error("unaligned {select:?} access at {addr:#010x}")]
    Alignment {
        /// Faulting address.
        addr: u32,
        /// Width the transaction requested.
        select: ByteSelect,
    },

    /// An access fell outside every configured memory region.
    #[error("access at {addr:#010x} is outside every memory region")]
    OutOfRegion {
        /// Faulting address.
        addr: u32,
    },

    /// An access violated a region's permission policy.
    #[error("{access:?} access denied at {addr:#010x} in the {region} region")]
    Permission {
        /// Faulting address.
        addr: u32,
        /// Direction of the denied access.
        access: AccessKind,
        /// Region whose policy denied the access.
        region: RegionKind,
    },

    /// The processor decoded an instruction it does not implement.
    #[error("illegal instruction {inst:#010x} near pc {pc:#010x}")]
    IllegalInstruction {
        /// Raw instruction word.
        inst: u32,
        /// Program counter after the fetch that captured the word.
        pc: u32,
    },

    /// The supplied program image does not fit its target region.
    #[error("program image of {image} bytes does not fit region of {capacity} bytes")]
    ImageTooLarge {
        /// Image size in bytes.
        image: usize,
        /// Capacity of the target region in bytes.
        capacity: usize,
    },

    /// The configuration record is malformed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A device thread could not be started.
    #[error("could not start device thread: {0}")]
    Thread(String),
}
