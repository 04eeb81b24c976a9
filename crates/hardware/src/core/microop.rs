//! Micro-operations.
//!
//! Every instruction executes as a short sequence of micro-ops, each
//! consuming exactly one processor tick. Decode produces the execute
//! micro-ops; loads, stores, and fetches additionally inject the fixed
//! transaction steps that walk the bus protocol. Micro-ops carry the
//! instruction word they translate so operand fields are read at execution
//! time; transaction steps are freestanding and carry none.

use crate::common::data::ByteSelect;
use crate::common::error::SimulationError;
use crate::common::id::ComponentId;
use crate::core::decode;
use crate::core::opcodes::{
    ENV_BREAK, ENV_HALT, FUNCT7_ALT, FUNCT7_BASE, INSTRUCTION_BYTES, SHAMT_MASK,
};
use crate::core::processor::Processor;
use crate::event::{EventKind, SimEvent};
use crate::soc::bus::Bus;

/// The kinds of micro-ops the processor executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicroOpKind {
    /// Decode the captured instruction word and queue its execute micro-ops.
    Decode,

    /// ADD or SUB, selected by funct7.
    AddSub,
    /// Bitwise XOR.
    Xor,
    /// Bitwise OR.
    Or,
    /// Bitwise AND.
    And,
    /// Shift left logical.
    Sll,
    /// Shift right logical or arithmetic, selected by funct7.
    SrlSra,
    /// Set if less than, signed.
    Slt,
    /// Set if less than, unsigned.
    Sltu,

    /// Add immediate.
    AddImm,
    /// XOR immediate.
    XorImm,
    /// OR immediate.
    OrImm,
    /// AND immediate.
    AndImm,
    /// Shift left logical by immediate.
    SllImm,
    /// Shift right logical or arithmetic by immediate.
    SrlSraImm,
    /// Set if less than immediate, signed.
    SltImm,
    /// Set if less than immediate, unsigned.
    SltuImm,

    /// Issue a byte-wide read transaction.
    LoadByte,
    /// Issue a half-wide read transaction.
    LoadHalf,
    /// Issue a word-wide read transaction.
    LoadWord,
    /// Sign extend the captured value into the destination register.
    LoadPost,
    /// Zero extend the captured value into the destination register.
    LoadPostUnsigned,

    /// Issue a byte-wide write transaction.
    StoreByte,
    /// Issue a half-wide write transaction.
    StoreHalf,
    /// Issue a word-wide write transaction.
    StoreWord,

    /// Branch if equal.
    BranchEq,
    /// Branch if not equal.
    BranchNe,
    /// Branch if less than, signed.
    BranchLt,
    /// Branch if greater or equal, signed.
    BranchGe,
    /// Branch if less than, unsigned.
    BranchLtu,
    /// Branch if greater or equal, unsigned.
    BranchGeu,

    /// Jump and link.
    Jal,
    /// Jump and link register.
    Jalr,
    /// Load upper immediate.
    Lui,
    /// Add upper immediate to the instruction address.
    Auipc,

    /// Environment call (halt or break).
    Env,

    /// Read transaction: deassert read enable.
    ReadDeassert,
    /// Read transaction: capture the data line into the temp register.
    ReadCapture,

    /// Write transaction: drive the data line with the temp register.
    WriteDrive,
    /// Write transaction: assert write enable.
    WriteAssert,
    /// Write transaction: deassert write enable and release the data line.
    WriteFinish,
}

/// One queued micro-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MicroOp {
    /// What to do.
    pub kind: MicroOpKind,
    /// Instruction word this micro-op translates; 0 for freestanding
    /// transaction steps.
    pub inst: u32,
}

impl MicroOp {
    /// A micro-op bound to the instruction word it translates.
    pub const fn new(kind: MicroOpKind, inst: u32) -> Self {
        Self { kind, inst }
    }

    /// A freestanding transaction step.
    pub const fn free(kind: MicroOpKind) -> Self {
        Self { kind, inst: 0 }
    }

    /// Executes this micro-op on the processor, consuming one tick.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::IllegalInstruction`] for undefined function
    /// codes or environment call immediates, and propagates bus line errors
    /// from transaction steps.
    pub fn execute(self, proc: &mut Processor, bus: &mut Bus) -> Result<(), SimulationError> {
        let inst = self.inst;
        match self.kind {
            MicroOpKind::Decode => {
                let word = proc.temp;
                let Some(sequence) = decode::decode(word) else {
                    return Err(SimulationError::IllegalInstruction {
                        inst: word,
                        pc: proc.pc,
                    });
                };
                for kind in sequence {
                    proc.queue.push_back(Self::new(*kind, word));
                }
                if proc.sink.debug_enabled() {
                    proc.sink.emit(SimEvent {
                        source: ComponentId::Processor,
                        kind: EventKind::Decode { inst: word },
                    });
                }
            }

            MicroOpKind::AddSub => {
                let a = proc.regs.read(decode::rs1(inst));
                let b = proc.regs.read(decode::rs2(inst));
                let result = match decode::funct7(inst) {
                    FUNCT7_BASE => proc.add_with_flags(a, b),
                    FUNCT7_ALT => proc.sub_with_flags(a, b),
                    _ => {
                        return Err(SimulationError::IllegalInstruction { inst, pc: proc.pc });
                    }
                };
                proc.regs.write(decode::rd(inst), result);
            }
            MicroOpKind::Xor => {
                let result =
                    proc.regs.read(decode::rs1(inst)) ^ proc.regs.read(decode::rs2(inst));
                proc.set_logic_flags(result);
                proc.regs.write(decode::rd(inst), result);
            }
            MicroOpKind::Or => {
                let result =
                    proc.regs.read(decode::rs1(inst)) | proc.regs.read(decode::rs2(inst));
                proc.set_logic_flags(result);
                proc.regs.write(decode::rd(inst), result);
            }
            MicroOpKind::And => {
                let result =
                    proc.regs.read(decode::rs1(inst)) & proc.regs.read(decode::rs2(inst));
                proc.set_logic_flags(result);
                proc.regs.write(decode::rd(inst), result);
            }
            MicroOpKind::Sll => {
                let shamt = proc.regs.read(decode::rs2(inst)) & SHAMT_MASK;
                let result = proc.regs.read(decode::rs1(inst)) << shamt;
                proc.set_logic_flags(result);
                proc.regs.write(decode::rd(inst), result);
            }
            MicroOpKind::SrlSra => {
                let shamt = proc.regs.read(decode::rs2(inst)) & SHAMT_MASK;
                let value = proc.regs.read(decode::rs1(inst));
                let result = match decode::funct7(inst) {
                    FUNCT7_BASE => value >> shamt,
                    FUNCT7_ALT => ((value as i32) >> shamt) as u32,
                    _ => {
                        return Err(SimulationError::IllegalInstruction { inst, pc: proc.pc });
                    }
                };
                proc.set_logic_flags(result);
                proc.regs.write(decode::rd(inst), result);
            }
            MicroOpKind::Slt => {
                let lhs = proc.regs.read(decode::rs1(inst)) as i32;
                let rhs = proc.regs.read(decode::rs2(inst)) as i32;
                let result = u32::from(lhs < rhs);
                proc.set_logic_flags(result);
                proc.regs.write(decode::rd(inst), result);
            }
            MicroOpKind::Sltu => {
                let lhs = proc.regs.read(decode::rs1(inst));
                let rhs = proc.regs.read(decode::rs2(inst));
                let result = u32::from(lhs < rhs);
                proc.set_logic_flags(result);
                proc.regs.write(decode::rd(inst), result);
            }

            MicroOpKind::AddImm => {
                let a = proc.regs.read(decode::rs1(inst));
                let result = proc.add_with_flags(a, decode::imm_i(inst) as u32);
                proc.regs.write(decode::rd(inst), result);
            }
            MicroOpKind::XorImm => {
                let result = proc.regs.read(decode::rs1(inst)) ^ decode::imm_i(inst) as u32;
                proc.set_logic_flags(result);
                proc.regs.write(decode::rd(inst), result);
            }
            MicroOpKind::OrImm => {
                let result = proc.regs.read(decode::rs1(inst)) | decode::imm_i(inst) as u32;
                proc.set_logic_flags(result);
                proc.regs.write(decode::rd(inst), result);
            }
            MicroOpKind::AndImm => {
                let result = proc.regs.read(decode::rs1(inst)) & decode::imm_i(inst) as u32;
                proc.set_logic_flags(result);
                proc.regs.write(decode::rd(inst), result);
            }
            MicroOpKind::SllImm => {
                let shamt = decode::imm_i(inst) as u32 & SHAMT_MASK;
                let result = proc.regs.read(decode::rs1(inst)) << shamt;
                proc.set_logic_flags(result);
                proc.regs.write(decode::rd(inst), result);
            }
            MicroOpKind::SrlSraImm => {
                let shamt = decode::imm_i(inst) as u32 & SHAMT_MASK;
                let value = proc.regs.read(decode::rs1(inst));
                let result = match decode::funct7(inst) {
                    FUNCT7_BASE => value >> shamt,
                    FUNCT7_ALT => ((value as i32) >> shamt) as u32,
                    _ => {
                        return Err(SimulationError::IllegalInstruction { inst, pc: proc.pc });
                    }
                };
                proc.set_logic_flags(result);
                proc.regs.write(decode::rd(inst), result);
            }
            MicroOpKind::SltImm => {
                let lhs = proc.regs.read(decode::rs1(inst)) as i32;
                let result = u32::from(lhs < decode::imm_i(inst));
                proc.set_logic_flags(result);
                proc.regs.write(decode::rd(inst), result);
            }
            MicroOpKind::SltuImm => {
                let lhs = proc.regs.read(decode::rs1(inst));
                let result = u32::from(lhs < decode::imm_i(inst) as u32);
                proc.set_logic_flags(result);
                proc.regs.write(decode::rd(inst), result);
            }

            MicroOpKind::LoadByte => {
                let addr = load_address(proc, inst);
                proc.issue_read(bus, addr, ByteSelect::Byte)?;
            }
            MicroOpKind::LoadHalf => {
                let addr = load_address(proc, inst);
                proc.issue_read(bus, addr, ByteSelect::Half)?;
            }
            MicroOpKind::LoadWord => {
                let addr = load_address(proc, inst);
                proc.issue_read(bus, addr, ByteSelect::Word)?;
            }
            MicroOpKind::LoadPost => {
                let value = match proc.select {
                    ByteSelect::Byte => proc.temp as u8 as i8 as i32 as u32,
                    ByteSelect::Half => proc.temp as u16 as i16 as i32 as u32,
                    ByteSelect::Word => proc.temp,
                };
                proc.regs.write(decode::rd(inst), value);
            }
            MicroOpKind::LoadPostUnsigned => {
                let value = match proc.select {
                    ByteSelect::Byte => proc.temp & 0xff,
                    ByteSelect::Half => proc.temp & 0xffff,
                    ByteSelect::Word => proc.temp,
                };
                proc.regs.write(decode::rd(inst), value);
            }

            MicroOpKind::StoreByte => {
                let addr = store_address(proc, inst);
                let value = proc.regs.read(decode::rs2(inst));
                proc.issue_write(bus, addr, value, ByteSelect::Byte)?;
            }
            MicroOpKind::StoreHalf => {
                let addr = store_address(proc, inst);
                let value = proc.regs.read(decode::rs2(inst));
                proc.issue_write(bus, addr, value, ByteSelect::Half)?;
            }
            MicroOpKind::StoreWord => {
                let addr = store_address(proc, inst);
                let value = proc.regs.read(decode::rs2(inst));
                proc.issue_write(bus, addr, value, ByteSelect::Word)?;
            }

            MicroOpKind::BranchEq => {
                let taken = proc.regs.read(decode::rs1(inst)) == proc.regs.read(decode::rs2(inst));
                branch(proc, inst, taken);
            }
            MicroOpKind::BranchNe => {
                let taken = proc.regs.read(decode::rs1(inst)) != proc.regs.read(decode::rs2(inst));
                branch(proc, inst, taken);
            }
            MicroOpKind::BranchLt => {
                let taken = (proc.regs.read(decode::rs1(inst)) as i32)
                    < (proc.regs.read(decode::rs2(inst)) as i32);
                branch(proc, inst, taken);
            }
            MicroOpKind::BranchGe => {
                let taken = (proc.regs.read(decode::rs1(inst)) as i32)
                    >= (proc.regs.read(decode::rs2(inst)) as i32);
                branch(proc, inst, taken);
            }
            MicroOpKind::BranchLtu => {
                let taken = proc.regs.read(decode::rs1(inst)) < proc.regs.read(decode::rs2(inst));
                branch(proc, inst, taken);
            }
            MicroOpKind::BranchGeu => {
                let taken = proc.regs.read(decode::rs1(inst)) >= proc.regs.read(decode::rs2(inst));
                branch(proc, inst, taken);
            }

            MicroOpKind::Jal => {
                let link = proc.pc;
                proc.pc = proc
                    .pc
                    .wrapping_add(decode::imm_j(inst) as u32)
                    .wrapping_sub(INSTRUCTION_BYTES);
                proc.regs.write(decode::rd(inst), link);
            }
            MicroOpKind::Jalr => {
                let link = proc.pc;
                let target = proc
                    .regs
                    .read(decode::rs1(inst))
                    .wrapping_add(decode::imm_i(inst) as u32);
                proc.pc = target;
                proc.regs.write(decode::rd(inst), link);
            }
            MicroOpKind::Lui => {
                proc.regs.write(decode::rd(inst), decode::imm_u(inst) as u32);
            }
            MicroOpKind::Auipc => {
                let base = proc.pc.wrapping_sub(INSTRUCTION_BYTES);
                proc.regs
                    .write(decode::rd(inst), base.wrapping_add(decode::imm_u(inst) as u32));
            }

            MicroOpKind::Env => match decode::imm_i(inst) {
                ENV_HALT => {
                    tracing::info!("environment call requested halt");
                    proc.halted = true;
                    proc.sink.emit(SimEvent {
                        source: ComponentId::Processor,
                        kind: EventKind::Halt,
                    });
                }
                ENV_BREAK => {
                    proc.sink.emit(SimEvent {
                        source: ComponentId::Processor,
                        kind: EventKind::Break,
                    });
                }
                _ => {
                    return Err(SimulationError::IllegalInstruction { inst, pc: proc.pc });
                }
            },

            MicroOpKind::ReadDeassert => {
                bus.read_enable.drive(ComponentId::Processor, 0)?;
            }
            MicroOpKind::ReadCapture => {
                proc.temp = bus.data.read();
                if proc.sink.debug_enabled() {
                    proc.sink.emit(SimEvent {
                        source: ComponentId::Processor,
                        kind: EventKind::Debug(format!(
                            "read routine captured {:#010x}",
                            proc.temp
                        )),
                    });
                }
            }

            MicroOpKind::WriteDrive => {
                bus.data.drive(ComponentId::Processor, proc.temp)?;
            }
            MicroOpKind::WriteAssert => {
                bus.write_enable.drive(ComponentId::Processor, 1)?;
            }
            MicroOpKind::WriteFinish => {
                bus.write_enable.drive(ComponentId::Processor, 0)?;
                bus.data.release(ComponentId::Processor)?;
            }
        }
        Ok(())
    }
}

/// Effective address of a load: rs1 plus the I immediate.
fn load_address(proc: &Processor, inst: u32) -> u32 {
    proc.regs
        .read(decode::rs1(inst))
        .wrapping_add(decode::imm_i(inst) as u32)
}

/// Effective address of a store: rs1 plus the S immediate.
fn store_address(proc: &Processor, inst: u32) -> u32 {
    proc.regs
        .read(decode::rs1(inst))
        .wrapping_add(decode::imm_s(inst) as u32)
}

/// Applies a branch outcome.
///
/// The program counter already advanced past the branch at fetch, so a taken
/// branch lands at the branch's own address plus its offset.
fn branch(proc: &mut Processor, inst: u32, taken: bool) {
    if taken {
        proc.pc = proc
            .pc
            .wrapping_add(decode::imm_b(inst) as u32)
            .wrapping_sub(INSTRUCTION_BYTES);
    }
}
