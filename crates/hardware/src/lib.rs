//! Cycle-accurate simulator core for a small bus-based rv32i micro computer.
//!
//! This crate implements the machine as a set of components sharing one bus:
//! 1. **Bus:** Tri-state lines (address, data, control) with single-driver semantics.
//! 2. **Memory:** A segmented address space (program image, RAM, video RAM) with
//!    per-region access permissions.
//! 3. **Processor:** An rv32i subset executed as queued micro-operations, with bus
//!    transactions spelled out cycle by cycle.
//! 4. **Devices:** Port-mapped peripherals (video, keyboard, timer, network, audio),
//!    some paced by real-time threads.
//! 5. **Simulation:** The orchestrator that owns the roster, drives the step loop,
//!    and republishes component events to listeners.

/// Common types shared by all components (identifiers, access kinds, errors).
pub mod common;
/// Simulation configuration (defaults, memory layout, device roster).
pub mod config;
/// Processor core (registers, decoder, micro-operations, pipeline).
pub mod core;
/// Typed simulation events and the publish/subscribe sink.
pub mod event;
/// Top-level machine assembly and the threaded simulation orchestrator.
pub mod sim;
/// Shared bus, memory space, and port-mapped devices.
pub mod soc;

/// Root configuration type; use [`Config::default()`] or deserialize from JSON.
pub use crate::config::Config;

/// Unified error type for every fatal simulation condition.
pub use crate::common::error::SimulationError;

/// One assembled machine (bus, processor, memory, devices) stepped manually.
pub use crate::sim::machine::Machine;

/// The threaded orchestrator wrapping a [`Machine`].
pub use crate::sim::simulation::Simulation;
