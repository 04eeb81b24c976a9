//! Configuration defaults, deserialization, and validation.

use busim_core::config::{Config, DeviceConfig};
use busim_core::{Simulation, SimulationError};
use pretty_assertions::assert_eq;

#[test]
fn defaults_describe_the_stock_machine() {
    let config = Config::default();

    assert_eq!(config.machine_name, "machine");
    assert!(!config.debug);
    assert_eq!(config.processor.reset_pc, 0);
    assert_eq!(config.memory.eprom_start, 0x0000_0000);
    assert_eq!(config.memory.eprom_end, 0x0000_ffff);
    assert_eq!(config.memory.ram_start, 0x0001_0000);
    assert_eq!(config.memory.vram_end, 0x0002_ffff);
    assert!(!config.memory.allow_eprom_writes);
    assert!(config.memory.allow_vram_reads);
    assert_eq!(config.devices.len(), 5);
    config.validate().unwrap();
}

#[test]
fn empty_json_yields_the_defaults() {
    let config = Config::from_json("{}").unwrap();
    assert_eq!(config.machine_name, "machine");
    assert_eq!(config.devices.len(), 5);
    config.validate().unwrap();
}

#[test]
fn json_overrides_are_applied() {
    let config = Config::from_json(
        r#"{
            "machine_name": "testbench",
            "debug": true,
            "processor": { "reset_pc": 256 },
            "memory": { "allow_eprom_writes": true },
            "devices": [
                { "type": "keyboard", "base": 262144 },
                { "type": "timer", "base": 262146, "tick_hz": 50 }
            ]
        }"#,
    )
    .unwrap();

    assert_eq!(config.machine_name, "testbench");
    assert!(config.debug);
    assert_eq!(config.processor.reset_pc, 256);
    assert!(config.memory.allow_eprom_writes);
    assert_eq!(config.devices.len(), 2);
    assert!(matches!(
        config.devices[1],
        DeviceConfig::Timer {
            base: 262_146,
            tick_hz: 50
        }
    ));
    config.validate().unwrap();
}

#[test]
fn malformed_json_is_a_config_error() {
    assert!(matches!(
        Config::from_json("{ not json"),
        Err(SimulationError::Config(_))
    ));
    assert!(matches!(
        Config::from_json(r#"{ "devices": [ { "type": "teletype", "base": 0 } ] }"#),
        Err(SimulationError::Config(_))
    ));
}

#[test]
fn inverted_region_is_rejected() {
    let mut config = Config::default();
    config.memory.ram_end = config.memory.ram_start - 1;
    assert!(matches!(
        config.validate(),
        Err(SimulationError::Config(_))
    ));
}

#[test]
fn overlapping_regions_are_rejected() {
    let mut config = Config::default();
    config.memory.ram_start = 0x0000_8000; // collides with eprom
    assert!(matches!(
        config.validate(),
        Err(SimulationError::Config(_))
    ));
}

#[test]
fn device_window_inside_a_region_is_rejected() {
    let mut config = Config::default();
    config.devices.push(DeviceConfig::Keyboard { base: 0x0001_0000 });
    assert!(matches!(
        config.validate(),
        Err(SimulationError::Config(_))
    ));
}

#[test]
fn overlapping_device_windows_are_rejected() {
    let mut config = Config::default();
    // the stock video device claims 0x30000..0x30002
    config.devices.push(DeviceConfig::Audio { base: 0x0003_0001 });
    assert!(matches!(
        config.validate(),
        Err(SimulationError::Config(_))
    ));
}

#[test]
fn zero_frequencies_are_rejected() {
    let mut config = Config::default();
    config.devices.push(DeviceConfig::Timer {
        base: 0x0008_0000,
        tick_hz: 0,
    });
    assert!(matches!(
        config.validate(),
        Err(SimulationError::Config(_))
    ));
}

#[test]
fn construction_validates_the_configuration() {
    let mut config = Config::default();
    config.memory.ram_start = 0x0000_8000;
    let result = Simulation::new(&[], &config);
    assert!(matches!(result, Err(SimulationError::Config(_))));
}
