//! Component identity.
//!
//! Bus lines enforce single-driver semantics by remembering *who* drives them.
//! Components are identified by value rather than by reference so ownership
//! checks stay independent of the object graph.

/// Identifies one component of a simulation instance.
///
/// Used as the driver token on tri-state lines and as the source field of
/// emitted events. Devices are numbered by their position in the configured
/// roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    /// The simulation orchestrator itself.
    Simulation,
    /// The processor.
    Processor,
    /// The memory space.
    Memory,
    /// A port-mapped device, by roster index.
    Device(u8),
}
