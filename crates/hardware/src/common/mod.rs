//! Common types shared across the simulator.
//!
//! This module provides the fundamental vocabulary the components agree on:
//! 1. **Identifiers:** [`ComponentId`] names the driver of a bus line and the
//!    source of an event.
//! 2. **Data:** [`ByteSelect`] and [`AccessKind`] describe bus transfers.
//! 3. **Errors:** [`SimulationError`] covers every fatal condition.

/// Bus transfer width and memory access direction.
pub mod data;

/// Fatal error taxonomy.
pub mod error;

/// Component identity used for line ownership and event sourcing.
pub mod id;

pub use data::{AccessKind, ByteSelect};
pub use error::SimulationError;
pub use id::ComponentId;
