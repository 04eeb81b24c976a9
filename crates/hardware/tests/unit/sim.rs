//! Orchestrator lifecycle and debugger surface.

use crate::common::asm;
use crate::common::harness::{
    CollectingListener, RAM_BASE, is_halt, program_image, wait_until_stopped,
};
use busim_core::event::EventKind;
use busim_core::{Config, Simulation, SimulationError};
use pretty_assertions::assert_eq;
use std::time::Duration;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

fn halting_program() -> Vec<u8> {
    program_image(&[
        asm::addi(1, 0, 5),
        asm::addi(2, 0, 7),
        asm::add(3, 1, 2),
        asm::ecall(),
    ])
}

#[test]
fn environment_call_halt_stops_the_main_loop() {
    let mut sim = Simulation::new(&halting_program(), &Config::default()).unwrap();
    let listener = CollectingListener::new();
    sim.add_listener(listener.clone());

    sim.begin().unwrap();
    wait_until_stopped(&sim, STOP_TIMEOUT);

    assert!(!sim.is_running());
    assert_eq!(sim.fault(), None, "a clean halt is not an error");
    assert!(listener.saw(is_halt));
    assert_eq!(sim.registers()[3], 12);
    assert!(sim.cycle_count() > 0);
}

#[test]
fn fatal_errors_record_a_fault_and_stop() {
    let image = program_image(&[0xffff_ffff]);
    let mut sim = Simulation::new(&image, &Config::default()).unwrap();
    let listener = CollectingListener::new();
    sim.add_listener(listener.clone());

    sim.begin().unwrap();
    wait_until_stopped(&sim, STOP_TIMEOUT);

    assert!(matches!(
        sim.fault(),
        Some(SimulationError::IllegalInstruction { .. })
    ));
    assert!(listener.saw(|event| matches!(event.kind, EventKind::Fault(_))));
}

#[test]
fn poweroff_stops_a_spinning_program() {
    // an unconditional jump to itself never halts on its own
    let image = program_image(&[asm::jal(0, 0)]);
    let mut sim = Simulation::new(&image, &Config::default()).unwrap();

    sim.begin().unwrap();
    assert!(sim.is_running());
    sim.poweroff();
    assert!(!sim.is_running());
}

#[test]
fn manual_stepping_advances_the_machine() {
    let sim = Simulation::new(&halting_program(), &Config::default()).unwrap();
    assert_eq!(sim.program_counter(), 0);

    // one fetch issue is enough to advance the program counter
    sim.step().unwrap();
    assert_eq!(sim.program_counter(), 4);
    assert!(sim.pending_micro_ops() > 0);

    for _ in 0..100 {
        sim.step().unwrap();
    }
    assert_eq!(sim.registers()[3], 12);
}

#[test]
fn debug_memory_access_bypasses_permissions() {
    let sim = Simulation::new(&halting_program(), &Config::default()).unwrap();

    // the program region rejects bus writes but not the debug override
    sim.write_memory(0x200, 0xaa).unwrap();
    assert_eq!(sim.read_memory(0x200).unwrap(), 0xaa);

    assert!(matches!(
        sim.read_memory(0x00f0_0000),
        Err(SimulationError::OutOfRegion { .. })
    ));
}

#[test]
fn debug_cycle_events_are_emitted_when_enabled() {
    let mut config = Config::default();
    config.debug = true;

    let mut sim = Simulation::new(&halting_program(), &config).unwrap();
    let listener = CollectingListener::new();
    sim.add_listener(listener.clone());

    sim.begin().unwrap();
    wait_until_stopped(&sim, STOP_TIMEOUT);

    assert!(listener.saw(|event| matches!(event.kind, EventKind::Cycle(_))));
    assert!(listener.saw(|event| matches!(event.kind, EventKind::Fetch { .. })));
    assert!(listener.saw(|event| matches!(event.kind, EventKind::Decode { .. })));
}

#[test]
fn keyboard_handle_feeds_the_running_machine() {
    let image = program_image(&[
        asm::lui(1, 0x0004_0000),
        asm::lw(2, 1, 1),
        asm::lui(5, RAM_BASE),
        asm::sw(2, 5, 0),
        asm::ecall(),
    ]);
    let mut sim = Simulation::new(&image, &Config::default()).unwrap();
    sim.keyboard().unwrap().push_key(0x41);

    sim.begin().unwrap();
    wait_until_stopped(&sim, STOP_TIMEOUT);
    assert_eq!(sim.registers()[2], 0x41);
    assert_eq!(sim.read_memory(RAM_BASE).unwrap(), 0x41);
}

#[test]
fn render_frame_reflects_video_ram() {
    let sim = Simulation::new(&halting_program(), &Config::default()).unwrap();
    sim.write_memory(0x0002_0000, b'X').unwrap();

    let frame = sim.render_frame().unwrap();
    assert_eq!(frame.cells[0], b'X');
}

#[test]
fn shared_hub_connects_two_instances() {
    let first = Simulation::new(&halting_program(), &Config::default()).unwrap();
    let second = Simulation::with_context(
        &halting_program(),
        &Config::default(),
        first.network_hub(),
        std::sync::Arc::new(busim_core::soc::devices::pacing::HostClock::new()),
    )
    .unwrap();

    let a = first.network_address().unwrap();
    let b = second.network_address().unwrap();
    assert_ne!(a, b);
}

#[test]
fn begin_is_idempotent() {
    let mut sim = Simulation::new(&halting_program(), &Config::default()).unwrap();
    sim.begin().unwrap();
    sim.begin().unwrap();
    wait_until_stopped(&sim, STOP_TIMEOUT);
}
