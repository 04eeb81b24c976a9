//! The processor.
//!
//! A fetch/decode/execute machine realized as a queue of micro-ops rather
//! than an explicit state enum. An empty queue is the signal to start a new
//! fetch; otherwise one micro-op executes per tick. Bus transactions are
//! injected at the head of the queue so a load's writeback always runs after
//! its capture step.
//!
//! The processor is the bus's sole instruction-stream driver: it claims the
//! address and control lines at construction and never gives them up. Only
//! the data line changes hands, between the processor (writes) and whichever
//! component answers a read.

use crate::common::data::ByteSelect;
use crate::common::error::SimulationError;
use crate::common::id::ComponentId;
use crate::core::microop::{MicroOp, MicroOpKind};
use crate::core::opcodes::INSTRUCTION_BYTES;
use crate::core::registers::{Flags, REGISTER_COUNT, RegisterFile};
use crate::event::{EventKind, EventSink, SimEvent};
use crate::soc::bus::Bus;
use std::collections::VecDeque;

/// The processor state machine.
pub struct Processor {
    pub(crate) regs: RegisterFile,
    pub(crate) pc: u32,
    /// Data channel into and out of bus transactions.
    pub(crate) temp: u32,
    /// Width latched for the transaction in flight.
    pub(crate) select: ByteSelect,
    pub(crate) flags: Flags,
    pub(crate) queue: VecDeque<MicroOp>,
    pub(crate) halted: bool,
    pub(crate) sink: EventSink,
}

impl Processor {
    /// Creates the processor and claims its bus lines.
    ///
    /// The address, read-enable, and write-enable lines are driven low and
    /// stay owned by the processor for the simulation's lifetime.
    ///
    /// # Errors
    ///
    /// Propagates a double drive if another component claimed the lines
    /// first.
    pub fn new(bus: &mut Bus, reset_pc: u32, sink: EventSink) -> Result<Self, SimulationError> {
        bus.address.drive(ComponentId::Processor, 0)?;
        bus.read_enable.drive(ComponentId::Processor, 0)?;
        bus.write_enable.drive(ComponentId::Processor, 0)?;

        Ok(Self {
            regs: RegisterFile::new(),
            pc: reset_pc,
            temp: 0,
            select: ByteSelect::Word,
            flags: Flags::default(),
            queue: VecDeque::new(),
            halted: false,
            sink,
        })
    }

    /// Executes one processor tick.
    ///
    /// Pops and executes the next micro-op, or begins a fetch when the queue
    /// is empty. A halted processor does nothing.
    ///
    /// # Errors
    ///
    /// Propagates decode and bus protocol errors; these are fatal to the
    /// owning simulation instance.
    pub fn step(&mut self, bus: &mut Bus) -> Result<(), SimulationError> {
        if self.halted {
            return Ok(());
        }

        match self.queue.pop_front() {
            None => self.fetch(bus),
            Some(op) => op.execute(self, bus),
        }
    }

    /// Begins a fetch: issues the instruction read and queues its decode.
    fn fetch(&mut self, bus: &mut Bus) -> Result<(), SimulationError> {
        if self.sink.debug_enabled() {
            self.sink.emit(SimEvent {
                source: ComponentId::Processor,
                kind: EventKind::Fetch { pc: self.pc },
            });
        }

        let pc = self.pc;
        self.issue_read(bus, pc, ByteSelect::Word)?;
        self.pc = pc.wrapping_add(INSTRUCTION_BYTES);
        self.queue.push_back(MicroOp::free(MicroOpKind::Decode));
        Ok(())
    }

    /// Issues a read transaction.
    ///
    /// Drives address, byte-select, and read-enable this tick, then injects
    /// the deassert and capture steps at the head of the queue. The captured
    /// word lands in the temp register two ticks later.
    pub(crate) fn issue_read(
        &mut self,
        bus: &mut Bus,
        addr: u32,
        select: ByteSelect,
    ) -> Result<(), SimulationError> {
        bus.address.drive(ComponentId::Processor, addr)?;
        bus.byte_select
            .drive(ComponentId::Processor, select.line_value())?;
        bus.read_enable.drive(ComponentId::Processor, 1)?;
        self.select = select;

        self.queue.push_front(MicroOp::free(MicroOpKind::ReadCapture));
        self.queue.push_front(MicroOp::free(MicroOpKind::ReadDeassert));
        Ok(())
    }

    /// Issues a write transaction.
    ///
    /// Drives address and byte-select this tick and latches the value in the
    /// temp register, then injects the data-drive, assert, and finish steps
    /// at the head of the queue.
    pub(crate) fn issue_write(
        &mut self,
        bus: &mut Bus,
        addr: u32,
        value: u32,
        select: ByteSelect,
    ) -> Result<(), SimulationError> {
        self.temp = value;
        bus.address.drive(ComponentId::Processor, addr)?;
        bus.byte_select
            .drive(ComponentId::Processor, select.line_value())?;
        self.select = select;

        self.queue.push_front(MicroOp::free(MicroOpKind::WriteFinish));
        self.queue.push_front(MicroOp::free(MicroOpKind::WriteAssert));
        self.queue.push_front(MicroOp::free(MicroOpKind::WriteDrive));
        Ok(())
    }

    /// Adds two words and records all four condition flags.
    pub(crate) fn add_with_flags(&mut self, a: u32, b: u32) -> u32 {
        let (result, carry) = a.overflowing_add(b);
        self.flags.carry = carry;
        self.flags.overflow = ((a ^ result) & (b ^ result)) >> 31 != 0;
        self.flags.zero = result == 0;
        self.flags.sign = result >> 31 != 0;
        result
    }

    /// Subtracts two words and records all four condition flags.
    pub(crate) fn sub_with_flags(&mut self, a: u32, b: u32) -> u32 {
        let (result, borrow) = a.overflowing_sub(b);
        self.flags.carry = borrow;
        self.flags.overflow = ((a ^ b) & (a ^ result)) >> 31 != 0;
        self.flags.zero = result == 0;
        self.flags.sign = result >> 31 != 0;
        result
    }

    /// Records zero and sign from a logic result; carry and overflow clear.
    pub(crate) fn set_logic_flags(&mut self, result: u32) {
        self.flags.carry = false;
        self.flags.overflow = false;
        self.flags.zero = result == 0;
        self.flags.sign = result >> 31 != 0;
    }

    /// Current program counter.
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Reads one register as the program would see it.
    pub const fn register(&self, index: usize) -> u32 {
        self.regs.read(index)
    }

    /// Copies out the whole register file.
    pub fn registers(&self) -> [u32; REGISTER_COUNT] {
        self.regs.snapshot()
    }

    /// Current condition flags.
    pub const fn flags(&self) -> Flags {
        self.flags
    }

    /// Whether the processor executed a halting environment call.
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Number of micro-ops waiting in the queue.
    pub fn pending_micro_ops(&self) -> usize {
        self.queue.len()
    }
}
