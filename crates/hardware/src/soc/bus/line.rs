//! Tri-state bus line.
//!
//! A line offers two things: single-driver/multiple-reader semantics, and one
//! step of buffering between a drive and its visibility to readers. A value
//! driven during cycle N is committed at the start of cycle N+1, so no
//! component ever observes another component's write within the same cycle.

use crate::common::error::SimulationError;
use crate::common::id::ComponentId;
use std::fmt;

/// Names the lines making up the bus, for ownership diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineName {
    /// 32 bit address line.
    Address,
    /// 32 bit data line.
    Data,
    /// Read enable control line (active high).
    ReadEnable,
    /// Write enable control line (active high).
    WriteEnable,
    /// Byte-select control line.
    ByteSelect,
}

impl fmt::Display for LineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Address => "address",
            Self::Data => "data",
            Self::ReadEnable => "read-enable",
            Self::WriteEnable => "write-enable",
            Self::ByteSelect => "byte-select",
        };
        f.write_str(name)
    }
}

/// One tri-state logic line.
///
/// The committed value is what readers observe; the buffered value is what
/// the current driver last wrote. [`TriStateLine::step`] propagates buffered
/// to committed once per cycle.
#[derive(Debug)]
pub struct TriStateLine {
    name: LineName,
    driver: Option<ComponentId>,
    committed: u32,
    buffered: u32,
}

impl TriStateLine {
    /// Creates a free line carrying zero.
    pub const fn new(name: LineName) -> Self {
        Self {
            name,
            driver: None,
            committed: 0,
            buffered: 0,
        }
    }

    /// Propagates the buffered value to the committed value.
    ///
    /// Ownership is unchanged; a released line keeps committing its last
    /// buffered value (it floats), which is expected behavior.
    pub fn step(&mut self) {
        self.committed = self.buffered;
    }

    /// Takes or keeps ownership of the line and buffers a new value.
    ///
    /// Re-driving by the current owner updates the buffered value. The
    /// committed value is unaffected until the next [`TriStateLine::step`].
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::DoubleDrive`] if a different component
    /// currently owns the line.
    pub fn drive(&mut self, driver: ComponentId, value: u32) -> Result<(), SimulationError> {
        if let Some(owner) = self.driver {
            if owner != driver {
                return Err(SimulationError::DoubleDrive {
                    line: self.name,
                    owner,
                    driver,
                });
            }
        }

        self.driver = Some(driver);
        self.buffered = value;
        Ok(())
    }

    /// Releases ownership of the line.
    ///
    /// The buffered value is left in place, so the committed value floats at
    /// the last driven value until a new driver takes over.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::ReleaseNotOwned`] if `driver` does not own
    /// the line, including when the line is already free.
    pub fn release(&mut self, driver: ComponentId) -> Result<(), SimulationError> {
        if self.driver != Some(driver) {
            return Err(SimulationError::ReleaseNotOwned {
                line: self.name,
                driver,
            });
        }

        self.driver = None;
        Ok(())
    }

    /// Reads the committed value, regardless of ownership.
    pub const fn read(&self) -> u32 {
        self.committed
    }

    /// Returns the component currently driving the line, if any.
    pub const fn driver(&self) -> Option<ComponentId> {
        self.driver
    }
}
