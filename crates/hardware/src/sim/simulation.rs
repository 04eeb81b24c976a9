//! The simulation orchestrator.
//!
//! Owns one machine and drives it from a dedicated thread as fast as the
//! host allows, while each timed device paces itself on its own thread.
//! The orchestrator also fans component events out to external listeners and
//! exposes the read surface the debugger and user interfaces consume.
//!
//! Shutdown is cooperative: [`Simulation::poweroff`] stops timed devices
//! first, then clears the running flag the main loop checks once per cycle.
//! A halting environment call and any fatal error take the same path.

use crate::common::error::SimulationError;
use crate::config::Config;
use crate::core::registers::{Flags, REGISTER_COUNT};
use crate::event::{EventKind, EventListener, EventSink, SimEvent};
use crate::sim::machine::Machine;
use crate::soc::devices::pacing::{DeviceClock, HostClock};
use crate::soc::devices::video::Frame;
use crate::soc::devices::{KeyboardHandle, NetworkHub, TimedContext};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crate::common::id::ComponentId;

/// A running (or runnable) simulation instance.
pub struct Simulation {
    machine: Arc<Mutex<Machine>>,
    machine_name: String,
    sink: EventSink,
    running: Arc<AtomicBool>,
    devices_running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    cycle: Arc<AtomicU64>,
    fault: Arc<Mutex<Option<SimulationError>>>,
    clock: Arc<dyn DeviceClock>,
    hub: Arc<NetworkHub>,
    started: bool,
}

impl Simulation {
    /// Builds a simulation with its own network hub and the host clock.
    ///
    /// # Errors
    ///
    /// Returns configuration and image size errors; nothing runs until
    /// [`Simulation::begin`].
    pub fn new(image: &[u8], config: &Config) -> Result<Self, SimulationError> {
        Self::with_context(
            image,
            config,
            Arc::new(NetworkHub::new()),
            Arc::new(HostClock::new()),
        )
    }

    /// Builds a simulation around an explicit network hub and device clock.
    ///
    /// Passing one hub to several instances connects their network devices;
    /// passing a test clock makes device loops deterministic.
    ///
    /// # Errors
    ///
    /// Returns configuration and image size errors.
    pub fn with_context(
        image: &[u8],
        config: &Config,
        hub: Arc<NetworkHub>,
        clock: Arc<dyn DeviceClock>,
    ) -> Result<Self, SimulationError> {
        let debug = Arc::new(AtomicBool::new(config.debug));
        let sink = EventSink::new(debug);
        let machine = Machine::new(image, config, sink.clone(), &hub)?;

        tracing::info!(machine = %config.machine_name, "simulation constructed");

        Ok(Self {
            machine: Arc::new(Mutex::new(machine)),
            machine_name: config.machine_name.clone(),
            sink,
            running: Arc::new(AtomicBool::new(false)),
            devices_running: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            cycle: Arc::new(AtomicU64::new(0)),
            fault: Arc::new(Mutex::new(None)),
            clock,
            hub,
            started: false,
        })
    }

    /// Starts the timed device threads, then the main cycle loop.
    ///
    /// Calling it again on a started instance does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Thread`] if a thread could not be spawned.
    pub fn begin(&mut self) -> Result<(), SimulationError> {
        if self.started {
            return Ok(());
        }
        self.started = true;

        self.devices_running.store(true, Ordering::Release);
        self.running.store(true, Ordering::Release);

        let ctx = TimedContext {
            running: Arc::clone(&self.devices_running),
            paused: Arc::clone(&self.paused),
            clock: Arc::clone(&self.clock),
            machine_name: self.machine_name.clone(),
        };
        {
            let mut machine = self.lock_machine();
            for device in &mut machine.devices {
                device.start(&ctx)?;
            }
        }

        let machine = Arc::clone(&self.machine);
        let running = Arc::clone(&self.running);
        let devices_running = Arc::clone(&self.devices_running);
        let cycle = Arc::clone(&self.cycle);
        let fault = Arc::clone(&self.fault);
        let sink = self.sink.clone();
        let name = self.machine_name.clone();

        tracing::info!(machine = %name, "simulation starting");
        thread::Builder::new()
            .name(format!("simulation loop - {name}"))
            .spawn(move || {
                main_loop(&machine, &running, &devices_running, &cycle, &fault, &sink);
            })
            .map(drop)
            .map_err(|err| SimulationError::Thread(err.to_string()))
    }

    /// Stops the instance: timed devices first, then the main loop.
    ///
    /// Device threads are not joined; they observe the cleared flag on their
    /// next wait and exit on their own.
    pub fn poweroff(&self) {
        tracing::info!(machine = %self.machine_name, "powering off");
        self.devices_running.store(false, Ordering::Release);
        self.running.store(false, Ordering::Release);
    }

    /// Whether the main loop is (still) supposed to run.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Number of cycles the main loop has completed.
    pub fn cycle_count(&self) -> u64 {
        self.cycle.load(Ordering::Acquire)
    }

    /// Raises the advisory debug pause signal.
    ///
    /// Timed devices poll instead of chasing deadlines while paused; the
    /// main loop is unaffected.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Clears the advisory debug pause signal.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    /// Performs one forced cycle, for debugger single-stepping.
    ///
    /// # Errors
    ///
    /// Propagates component errors exactly as the main loop would.
    pub fn step(&self) -> Result<(), SimulationError> {
        self.lock_machine().step()
    }

    /// Registers an external event listener.
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        self.sink.add_listener(listener);
    }

    /// Removes a previously registered listener.
    pub fn remove_listener(&self, listener: &Arc<dyn EventListener>) {
        self.sink.remove_listener(listener);
    }

    /// The fault that stopped the instance, if any.
    pub fn fault(&self) -> Option<SimulationError> {
        self.fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current program counter.
    pub fn program_counter(&self) -> u32 {
        self.lock_machine().processor.pc()
    }

    /// Snapshot of the register file.
    pub fn registers(&self) -> [u32; REGISTER_COUNT] {
        self.lock_machine().processor.registers()
    }

    /// Current condition flags.
    pub fn flags(&self) -> Flags {
        self.lock_machine().processor.flags()
    }

    /// Number of micro-ops pending in the processor queue.
    pub fn pending_micro_ops(&self) -> usize {
        self.lock_machine().processor.pending_micro_ops()
    }

    /// Reads one memory byte with the debug override, bypassing permissions.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::OutOfRegion`] outside every region.
    pub fn read_memory(&self, addr: u32) -> Result<u8, SimulationError> {
        self.lock_machine().memory.read_byte(addr, true)
    }

    /// Writes one memory byte with the debug override, bypassing permissions.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::OutOfRegion`] outside every region.
    pub fn write_memory(&self, addr: u32, value: u8) -> Result<(), SimulationError> {
        self.lock_machine().memory.write_byte(addr, value, true)
    }

    /// Handle for feeding the keyboard device, if one is mounted.
    pub fn keyboard(&self) -> Option<KeyboardHandle> {
        self.lock_machine().keyboard_handle()
    }

    /// Forces a frame snapshot, if a video device is mounted.
    pub fn render_frame(&self) -> Option<Frame> {
        self.lock_machine().render_frame()
    }

    /// Address of the network device, if one is mounted.
    pub fn network_address(&self) -> Option<u32> {
        self.lock_machine().network_address()
    }

    /// The network hub this instance is attached to.
    pub fn network_hub(&self) -> Arc<NetworkHub> {
        Arc::clone(&self.hub)
    }

    fn lock_machine(&self) -> std::sync::MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The free-running cycle loop.
///
/// Locks the machine once per cycle so the debugger surface can interleave,
/// emits the per-cycle event while debugging, and routes a processor halt or
/// a fatal error into the poweroff sequence.
fn main_loop(
    machine: &Arc<Mutex<Machine>>,
    running: &Arc<AtomicBool>,
    devices_running: &Arc<AtomicBool>,
    cycle: &Arc<AtomicU64>,
    fault: &Arc<Mutex<Option<SimulationError>>>,
    sink: &EventSink,
) {
    while running.load(Ordering::Acquire) {
        let count = cycle.load(Ordering::Acquire);
        if sink.debug_enabled() {
            sink.emit(SimEvent {
                source: ComponentId::Simulation,
                kind: EventKind::Cycle(count),
            });
        }

        let outcome = {
            let mut machine = machine.lock().unwrap_or_else(PoisonError::into_inner);
            machine.step().map(|()| machine.processor.is_halted())
        };

        match outcome {
            Ok(false) => {}
            Ok(true) => {
                tracing::info!(cycle = count, "processor halted");
                devices_running.store(false, Ordering::Release);
                running.store(false, Ordering::Release);
            }
            Err(err) => {
                tracing::error!(cycle = count, error = %err, "simulation fault");
                sink.emit(SimEvent {
                    source: ComponentId::Simulation,
                    kind: EventKind::Fault(err.to_string()),
                });
                *fault.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
                devices_running.store(false, Ordering::Release);
                running.store(false, Ordering::Release);
            }
        }

        cycle.fetch_add(1, Ordering::AcqRel);
    }
}
