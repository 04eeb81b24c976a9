//! Memory space regions, permissions, and bus protocol.

use crate::common::harness::{RAM_BASE, quiet_sink};
use busim_core::SimulationError;
use busim_core::common::data::{AccessKind, ByteSelect};
use busim_core::common::id::ComponentId;
use busim_core::config::MemoryConfig;
use busim_core::soc::bus::Bus;
use busim_core::soc::memory::MemorySpace;
use pretty_assertions::assert_eq;
use rstest::rstest;

/// Stand-in for the processor when driving the bus by hand.
const PROBE: ComponentId = ComponentId::Device(9);

fn default_memory() -> (Bus, MemorySpace) {
    let memory = MemorySpace::new(&MemoryConfig::default(), &[], quiet_sink()).unwrap();
    (Bus::new(), memory)
}

/// Performs one full write transaction as the bus master would.
fn bus_write(
    bus: &mut Bus,
    memory: &mut MemorySpace,
    addr: u32,
    value: u32,
    select: ByteSelect,
) -> Result<(), SimulationError> {
    bus.address.drive(PROBE, addr)?;
    bus.byte_select.drive(PROBE, select.line_value())?;
    bus.data.drive(PROBE, value)?;
    bus.write_enable.drive(PROBE, 1)?;
    bus.step();
    memory.step(bus)?;

    bus.write_enable.drive(PROBE, 0)?;
    bus.data.release(PROBE)?;
    bus.step();
    memory.step(bus)?;
    Ok(())
}

/// Performs one full read transaction and returns the captured word.
fn bus_read(
    bus: &mut Bus,
    memory: &mut MemorySpace,
    addr: u32,
    select: ByteSelect,
) -> Result<u32, SimulationError> {
    bus.address.drive(PROBE, addr)?;
    bus.byte_select.drive(PROBE, select.line_value())?;
    bus.read_enable.drive(PROBE, 1)?;
    bus.step();
    memory.step(bus)?;

    bus.read_enable.drive(PROBE, 0)?;
    bus.step();
    let value = bus.data.read();
    memory.step(bus)?;
    Ok(value)
}

#[rstest]
#[case(ByteSelect::Byte, 0xffff_ffaa, 0xaa)]
#[case(ByteSelect::Half, 0xffff_bbaa, 0xbbaa)]
#[case(ByteSelect::Word, 0xddcc_bbaa, 0xddcc_bbaa)]
fn write_then_read_returns_value_masked_to_width(
    #[case] select: ByteSelect,
    #[case] written: u32,
    #[case] expected: u32,
) {
    let (mut bus, mut memory) = default_memory();
    bus_write(&mut bus, &mut memory, RAM_BASE, written, select).unwrap();
    let value = bus_read(&mut bus, &mut memory, RAM_BASE, select).unwrap();
    assert_eq!(value, expected);
}

#[test]
fn words_are_stored_little_endian() {
    let (mut bus, mut memory) = default_memory();
    bus_write(
        &mut bus,
        &mut memory,
        RAM_BASE,
        0x1122_3344,
        ByteSelect::Word,
    )
    .unwrap();

    assert_eq!(memory.read_byte(RAM_BASE, false).unwrap(), 0x44);
    assert_eq!(memory.read_byte(RAM_BASE + 1, false).unwrap(), 0x33);
    assert_eq!(memory.read_byte(RAM_BASE + 2, false).unwrap(), 0x22);
    assert_eq!(memory.read_byte(RAM_BASE + 3, false).unwrap(), 0x11);
}

#[rstest]
#[case(ByteSelect::Word, 1)]
#[case(ByteSelect::Word, 2)]
#[case(ByteSelect::Word, 3)]
#[case(ByteSelect::Half, 1)]
#[case(ByteSelect::Half, 3)]
fn unaligned_access_is_fatal(#[case] select: ByteSelect, #[case] offset: u32) {
    let (mut bus, mut memory) = default_memory();
    let result = bus_read(&mut bus, &mut memory, RAM_BASE + offset, select);
    assert!(matches!(result, Err(SimulationError::Alignment { .. })));
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
fn byte_access_is_always_aligned(#[case] offset: u32) {
    let (mut bus, mut memory) = default_memory();
    bus_write(
        &mut bus,
        &mut memory,
        RAM_BASE + offset,
        0x5a,
        ByteSelect::Byte,
    )
    .unwrap();
    let value = bus_read(&mut bus, &mut memory, RAM_BASE + offset, ByteSelect::Byte).unwrap();
    assert_eq!(value, 0x5a);
}

#[test]
fn simultaneous_read_and_write_enable_is_fatal() {
    let (mut bus, mut memory) = default_memory();
    bus.address.drive(PROBE, RAM_BASE).unwrap();
    bus.byte_select
        .drive(PROBE, ByteSelect::Word.line_value())
        .unwrap();
    bus.read_enable.drive(PROBE, 1).unwrap();
    bus.write_enable.drive(PROBE, 1).unwrap();
    bus.step();

    let result = memory.step(&mut bus);
    assert_eq!(result, Err(SimulationError::BusProtocol { addr: RAM_BASE }));
}

#[test]
fn out_of_region_addresses_are_ignored() {
    let (mut bus, mut memory) = default_memory();
    bus.address.drive(PROBE, 0x00f0_0000).unwrap();
    bus.read_enable.drive(PROBE, 1).unwrap();
    bus.step();

    memory.step(&mut bus).unwrap();
    assert_eq!(bus.data.driver(), None, "memory must not answer device space");
}

#[test]
fn data_line_is_released_on_the_idle_step_after_a_read() {
    let (mut bus, mut memory) = default_memory();
    bus.address.drive(PROBE, RAM_BASE).unwrap();
    bus.byte_select
        .drive(PROBE, ByteSelect::Word.line_value())
        .unwrap();
    bus.read_enable.drive(PROBE, 1).unwrap();
    bus.step();
    memory.step(&mut bus).unwrap();
    assert_eq!(bus.data.driver(), Some(ComponentId::Memory));

    bus.read_enable.drive(PROBE, 0).unwrap();
    bus.step();
    memory.step(&mut bus).unwrap();
    assert_eq!(bus.data.driver(), None);
}

#[test]
fn program_region_writes_are_rejected_by_default() {
    let (mut bus, mut memory) = default_memory();
    let result = bus_write(&mut bus, &mut memory, 0x100, 0xab, ByteSelect::Byte);
    assert!(matches!(
        result,
        Err(SimulationError::Permission {
            access: AccessKind::Write,
            ..
        })
    ));
}

#[test]
fn program_region_writes_succeed_when_enabled() {
    let config = MemoryConfig {
        allow_eprom_writes: true,
        ..MemoryConfig::default()
    };
    let mut memory = MemorySpace::new(&config, &[], quiet_sink()).unwrap();
    let mut bus = Bus::new();

    bus_write(&mut bus, &mut memory, 0x100, 0xab, ByteSelect::Byte).unwrap();
    let value = bus_read(&mut bus, &mut memory, 0x100, ByteSelect::Byte).unwrap();
    assert_eq!(value, 0xab);
}

#[test]
fn vram_reads_are_rejected_when_disabled() {
    let config = MemoryConfig {
        allow_vram_reads: false,
        ..MemoryConfig::default()
    };
    let mut memory = MemorySpace::new(&config, &[], quiet_sink()).unwrap();
    let mut bus = Bus::new();

    let result = bus_read(&mut bus, &mut memory, config.vram_start, ByteSelect::Byte);
    assert!(matches!(
        result,
        Err(SimulationError::Permission {
            access: AccessKind::Read,
            ..
        })
    ));

    // the debug override still works for the excluded debugger
    assert_eq!(memory.read_byte(config.vram_start, true).unwrap(), 0);
}

#[test]
fn debug_override_bypasses_write_permission() {
    let (_, memory) = default_memory();
    memory.write_byte(0x10, 0x77, true).unwrap();
    assert_eq!(memory.read_byte(0x10, false).unwrap(), 0x77);
}

#[test]
fn image_is_loaded_into_the_program_region() {
    let image = [0xde, 0xad, 0xbe, 0xef];
    let memory = MemorySpace::new(&MemoryConfig::default(), &image, quiet_sink()).unwrap();

    assert_eq!(memory.read_byte(0, false).unwrap(), 0xde);
    assert_eq!(memory.read_byte(3, false).unwrap(), 0xef);
    assert_eq!(memory.read_byte(4, false).unwrap(), 0);
}

#[test]
fn oversized_image_is_rejected() {
    let image = vec![0u8; 0x1_0001];
    let result = MemorySpace::new(&MemoryConfig::default(), &image, quiet_sink());
    assert!(matches!(
        result,
        Err(SimulationError::ImageTooLarge {
            image: 0x1_0001,
            capacity: 0x1_0000,
        })
    ));
}

#[test]
fn in_bounds_tracks_the_configured_regions() {
    let (_, memory) = default_memory();
    assert!(memory.in_bounds(0));
    assert!(memory.in_bounds(0x0000_ffff));
    assert!(memory.in_bounds(RAM_BASE));
    assert!(memory.in_bounds(0x0002_ffff));
    assert!(!memory.in_bounds(0x0003_0000));
    assert!(!memory.in_bounds(0xffff_ffff));
}

#[test]
fn accesses_spanning_past_a_region_edge_are_fatal() {
    // shrink vram so an aligned word can start inside and run past the end
    let config = MemoryConfig {
        vram_end: 0x0002_fffd,
        ..MemoryConfig::default()
    };
    let mut memory = MemorySpace::new(&config, &[], quiet_sink()).unwrap();
    let mut bus = Bus::new();

    let result = bus_read(&mut bus, &mut memory, 0x0002_fffc, ByteSelect::Word);
    assert!(matches!(result, Err(SimulationError::OutOfRegion { .. })));
}
