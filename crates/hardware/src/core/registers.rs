//! Register file and condition flags.

/// Number of general purpose registers, fixed by the ABI.
pub const REGISTER_COUNT: usize = 32;

/// The general purpose register file.
///
/// Register 0 is the hardwired zero register: writes are accepted but the
/// stored value is never observable through a read.
#[derive(Debug)]
pub struct RegisterFile {
    regs: [u32; REGISTER_COUNT],
}

impl RegisterFile {
    /// Creates a register file with every register cleared.
    pub const fn new() -> Self {
        Self {
            regs: [0; REGISTER_COUNT],
        }
    }

    /// Reads a register; index 0 always reads 0.
    pub const fn read(&self, index: usize) -> u32 {
        if index == 0 { 0 } else { self.regs[index] }
    }

    /// Writes a register; writes to index 0 are accepted and unobservable.
    pub const fn write(&mut self, index: usize, value: u32) {
        self.regs[index] = value;
    }

    /// Copies out every register as seen through [`RegisterFile::read`].
    pub fn snapshot(&self) -> [u32; REGISTER_COUNT] {
        let mut regs = self.regs;
        regs[0] = 0;
        regs
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Condition flags written by arithmetic and logic micro-ops.
///
/// Additions and subtractions set all four; logic ops, shifts, and
/// comparisons clear carry and overflow and set zero and sign from the
/// result. No other micro-op touches them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    /// The last result was zero.
    pub zero: bool,
    /// The last result had its sign bit set.
    pub sign: bool,
    /// The last addition carried out, or the last subtraction borrowed.
    pub carry: bool,
    /// The last addition or subtraction overflowed as a signed operation.
    pub overflow: bool,
}
