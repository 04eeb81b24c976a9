//! rv32i opcode and function-field constants.
//!
//! Major opcodes occupy the low 7 bits of every instruction word and select
//! the instruction format; funct3 and funct7 refine the operation.

/// Width of one instruction in bytes.
pub const INSTRUCTION_BYTES: u32 = 4;

/// Load instructions (LB, LH, LW, LBU, LHU).
pub const OP_LOAD: u32 = 0b000_0011;

/// Immediate arithmetic instructions (ADDI, ANDI, SLLI, ...).
pub const OP_IMM: u32 = 0b001_0011;

/// Add Upper Immediate to PC (AUIPC).
pub const OP_AUIPC: u32 = 0b001_0111;

/// Store instructions (SB, SH, SW).
pub const OP_STORE: u32 = 0b010_0011;

/// Register-register arithmetic (ADD, SUB, SLL, ...).
pub const OP_REG: u32 = 0b011_0011;

/// Load Upper Immediate (LUI).
pub const OP_LUI: u32 = 0b011_0111;

/// Conditional branch instructions (BEQ, BNE, ...).
pub const OP_BRANCH: u32 = 0b110_0011;

/// Jump and Link Register (JALR).
pub const OP_JALR: u32 = 0b110_0111;

/// Jump and Link (JAL).
pub const OP_JAL: u32 = 0b110_1111;

/// Environment instructions (ECALL, EBREAK).
pub const OP_SYSTEM: u32 = 0b111_0011;

/// funct7 selecting the base operation (ADD, SRL).
pub const FUNCT7_BASE: u32 = 0x00;

/// funct7 selecting the alternate operation (SUB, SRA).
pub const FUNCT7_ALT: u32 = 0x20;

/// Shift amounts are taken modulo the register width.
pub const SHAMT_MASK: u32 = 0x1f;

/// Environment call immediate requesting a halt.
pub const ENV_HALT: i32 = 0;

/// Environment call immediate requesting a debugger break.
pub const ENV_BREAK: i32 = 1;
