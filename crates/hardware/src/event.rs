//! Typed simulation events and the publish/subscribe sink.
//!
//! Components report state transitions as [`SimEvent`] values delivered
//! synchronously, in emission order, to every registered listener. The
//! [`EventSink`] is a capability handle: each component receives a clone at
//! construction and never controls the lifetime of the listeners behind it.
//!
//! High-frequency observability events (fetch, decode, bus traffic) are only
//! emitted while debugging is switched on; call sites guard on
//! [`EventSink::debug_enabled`] so the common path pays nothing for them.

use crate::common::id::ComponentId;
use crate::soc::devices::video::Frame;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Receives events from a simulation instance.
///
/// Listeners are invoked on whichever thread emitted the event, which may be
/// the main step loop or a timed device thread.
pub trait EventListener: Send + Sync {
    /// Called once per emitted event.
    fn on_event(&self, event: &SimEvent);
}

/// One event raised by a simulation component.
#[derive(Debug, Clone)]
pub struct SimEvent {
    /// Component that raised the event.
    pub source: ComponentId,
    /// What happened.
    pub kind: EventKind,
}

/// The kinds of events components can raise.
#[derive(Debug, Clone)]
pub enum EventKind {
    /// The main loop is about to perform the given cycle (debug only).
    Cycle(u64),
    /// The processor started a fetch at the given program counter (debug only).
    Fetch {
        /// Address the instruction is fetched from.
        pc: u32,
    },
    /// The processor decoded an instruction word (debug only).
    Decode {
        /// Raw instruction word.
        inst: u32,
    },
    /// A component answered a bus read (debug only).
    BusRead {
        /// Address of the transaction.
        addr: u32,
        /// Word driven onto the data line.
        value: u32,
    },
    /// A component accepted a bus write (debug only).
    BusWrite {
        /// Address of the transaction.
        addr: u32,
        /// Word taken from the data line.
        value: u32,
    },
    /// The video device produced a frame snapshot.
    Frame(Frame),
    /// The processor executed a halting environment call.
    Halt,
    /// The processor executed a break environment call; a debugger should attach.
    Break,
    /// A fatal error stopped the instance.
    Fault(String),
    /// Free-form diagnostic message (debug only).
    Debug(String),
}

/// Cloneable handle components use to publish events.
///
/// All clones share one listener list and one debug switch.
#[derive(Clone)]
pub struct EventSink {
    listeners: Arc<RwLock<Vec<Arc<dyn EventListener>>>>,
    debug: Arc<AtomicBool>,
}

impl EventSink {
    /// Creates a sink with no listeners, sharing the given debug switch.
    pub fn new(debug: Arc<AtomicBool>) -> Self {
        Self {
            listeners: Arc::new(RwLock::new(Vec::new())),
            debug,
        }
    }

    /// Whether debug-gated events should be emitted right now.
    pub fn debug_enabled(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Delivers an event to every registered listener, synchronously.
    pub fn emit(&self, event: SimEvent) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener.on_event(&event);
        }
    }

    /// Registers a listener.
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Removes a previously registered listener; unknown listeners are ignored.
    pub fn remove_listener(&self, listener: &Arc<dyn EventListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|known| !Arc::ptr_eq(known, listener));
    }
}
