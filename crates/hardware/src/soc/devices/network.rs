//! Network device.
//!
//! Offers best-effort broadcast of single words between every simulation
//! instance attached to the same [`NetworkHub`]. The port surface mirrors a
//! serial device: transmit, transmit-ready, receive, receive-ready, plus a
//! port reporting the device's own address.
//!
//! The hub is an explicit shared context created by (or handed to) the
//! orchestrator; devices receive an endpoint at construction rather than
//! looking each other up through process-wide state.

use crate::common::error::SimulationError;
use crate::common::id::ComponentId;
use crate::event::EventSink;
use crate::soc::bus::Bus;
use crate::soc::devices::{PortWindow, Ports};
use rand::seq::SliceRandom;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Words buffered per receiver beyond this are dropped.
pub const BUFFER_CAPACITY: usize = 4096;

/// Number of addresses in the hub's pool.
pub const ADDRESS_POOL_SIZE: usize = 100;

/// Transmit port index (write-only).
const PORT_TX: u32 = 0;
/// Transmit-ready port index; the hub never blocks, so it always reads 1.
const PORT_TX_READY: u32 = 1;
/// Receive port index; dequeues one word, 0 when empty.
const PORT_RX: u32 = 2;
/// Receive-ready port index.
const PORT_RX_READY: u32 = 3;
/// Address port index.
const PORT_ADDRESS: u32 = 4;

type Inbox = Arc<Mutex<VecDeque<u32>>>;

struct Member {
    address: u32,
    inbox: Inbox,
}

struct HubState {
    pool: Vec<u32>,
    next: usize,
    members: Vec<Member>,
}

/// Shared hub connecting every attached network device.
///
/// Holds the shuffled address pool and one bounded inbound queue per member.
/// Broadcasts are best effort: full queues drop the word.
pub struct NetworkHub {
    state: Mutex<HubState>,
}

impl NetworkHub {
    /// Creates a hub with a freshly shuffled address pool.
    pub fn new() -> Self {
        let mut pool: Vec<u32> = (1..=ADDRESS_POOL_SIZE as u32).collect();
        pool.shuffle(&mut rand::rng());
        Self {
            state: Mutex::new(HubState {
                pool,
                next: 0,
                members: Vec::new(),
            }),
        }
    }

    /// Attaches a new member, assigning it the next pooled address.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Config`] once the pool is exhausted.
    pub fn attach(hub: &Arc<Self>) -> Result<NetworkEndpoint, SimulationError> {
        let mut state = hub.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.next >= state.pool.len() {
            return Err(SimulationError::Config(
                "network address pool exhausted".to_owned(),
            ));
        }

        let address = state.pool[state.next];
        state.next += 1;

        let inbox: Inbox = Arc::new(Mutex::new(VecDeque::new()));
        state.members.push(Member {
            address,
            inbox: Arc::clone(&inbox),
        });

        Ok(NetworkEndpoint {
            address,
            inbox,
            hub: Arc::clone(hub),
        })
    }

    fn broadcast(&self, from: u32, word: u32) {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for member in &state.members {
            if member.address == from {
                continue;
            }
            let mut inbox = member.inbox.lock().unwrap_or_else(PoisonError::into_inner);
            if inbox.len() < BUFFER_CAPACITY {
                inbox.push_back(word);
            }
        }
    }
}

impl Default for NetworkHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One device's attachment to a hub.
pub struct NetworkEndpoint {
    address: u32,
    inbox: Inbox,
    hub: Arc<NetworkHub>,
}

impl NetworkEndpoint {
    /// Address assigned to this endpoint from the hub's pool.
    pub const fn address(&self) -> u32 {
        self.address
    }

    /// Sends one word to every other member of the hub.
    pub fn send(&self, word: u32) {
        self.hub.broadcast(self.address, word);
    }

    /// Dequeues one received word, if any.
    pub fn receive(&self) -> Option<u32> {
        self.inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Whether a received word is waiting.
    pub fn ready(&self) -> bool {
        !self
            .inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

struct NetworkPorts {
    endpoint: NetworkEndpoint,
}

impl Ports for NetworkPorts {
    fn read_port(&mut self, port: u32) -> u32 {
        match port {
            PORT_TX_READY => 1,
            PORT_RX => self.endpoint.receive().unwrap_or(0),
            PORT_RX_READY => u32::from(self.endpoint.ready()),
            PORT_ADDRESS => self.endpoint.address(),
            _ => 0,
        }
    }

    fn write_port(&mut self, port: u32, value: u32) {
        if port == PORT_TX {
            self.endpoint.send(value);
        }
    }
}

/// The network device mounted on the bus.
pub struct NetworkDevice {
    window: PortWindow,
    ports: NetworkPorts,
    sink: EventSink,
}

impl NetworkDevice {
    /// Number of bus addresses the network device claims.
    pub const PORT_COUNT: u32 = 5;

    /// Creates a network device around an attached endpoint.
    pub fn new(id: ComponentId, base: u32, endpoint: NetworkEndpoint, sink: EventSink) -> Self {
        Self {
            window: PortWindow::new(id, base, Self::PORT_COUNT),
            ports: NetworkPorts { endpoint },
            sink,
        }
    }

    /// Address assigned to this device.
    pub const fn address(&self) -> u32 {
        self.ports.endpoint.address()
    }

    /// The device's claimed address window.
    pub const fn window(&self) -> &PortWindow {
        &self.window
    }

    /// Steps the bus protocol for one cycle.
    ///
    /// # Errors
    ///
    /// Propagates line ownership violations.
    pub fn step(&mut self, bus: &mut Bus) -> Result<(), SimulationError> {
        self.window.step(bus, &mut self.ports, &self.sink)
    }
}
