//! Processor core.
//!
//! The processor executes an rv32i subset as queued micro-operations:
//! 1. **Decode:** instruction words map to short micro-op sequences through a
//!    compile-time match over the masked opcode bits.
//! 2. **Micro-ops:** each consumes exactly one processor tick, including the
//!    injected steps of bus read/write transactions.
//! 3. **Registers:** the 32-entry file with the hardwired zero register, plus
//!    condition flags written by arithmetic and logic micro-ops.

/// Instruction field extraction and micro-op sequence decoding.
pub mod decode;

/// Micro-operation kinds and their execution.
pub mod microop;

/// Major opcode and function-field constants.
pub mod opcodes;

/// The processor itself.
pub mod processor;

/// Register file and condition flags.
pub mod registers;

pub use processor::Processor;
pub use registers::{Flags, RegisterFile};
