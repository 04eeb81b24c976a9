//! Simulation configuration.
//!
//! This module defines the configuration record a simulation is built from.
//! It provides:
//! 1. **Defaults:** the baseline machine (memory layout, device bases,
//!    device frequencies) used when fields are omitted.
//! 2. **Structures:** hierarchical config for the processor, the memory
//!    regions, and the device roster.
//! 3. **Validation:** construction-time checks that fail before any stepping
//!    begins.
//!
//! Reading configuration *files* is the embedder's job; the record arrives
//! here as a value, typically deserialized from JSON via
//! [`Config::from_json`] or built with [`Config::default`].

use crate::common::error::SimulationError;
use serde::Deserialize;

/// Default configuration constants for the simulated machine.
mod defaults {
    /// First address of the program image region.
    pub const EPROM_START: u32 = 0x0000_0000;

    /// Last address of the program image region (inclusive, 64 KiB).
    pub const EPROM_END: u32 = 0x0000_ffff;

    /// First address of the RAM region.
    pub const RAM_START: u32 = 0x0001_0000;

    /// Last address of the RAM region (inclusive, 64 KiB).
    pub const RAM_END: u32 = 0x0001_ffff;

    /// First address of the video RAM region.
    pub const VRAM_START: u32 = 0x0002_0000;

    /// Last address of the video RAM region (inclusive, 64 KiB).
    pub const VRAM_END: u32 = 0x0002_ffff;

    /// Reset value of the program counter.
    pub const RESET_PC: u32 = EPROM_START;

    /// Base bus address of the video device's ports.
    pub const VIDEO_BASE: u32 = 0x0003_0000;

    /// Base bus address of the keyboard device's ports.
    pub const KEYBOARD_BASE: u32 = 0x0004_0000;

    /// Base bus address of the timer device's port.
    pub const TIMER_BASE: u32 = 0x0005_0000;

    /// Base bus address of the network device's ports.
    pub const NETWORK_BASE: u32 = 0x0006_0000;

    /// Base bus address of the audio device's port.
    pub const AUDIO_BASE: u32 = 0x0007_0000;

    /// Video refresh rate in Hz.
    pub const FRAME_HZ: u32 = 25;

    /// Timer tick rate in Hz.
    pub const TICK_HZ: u32 = 1000;
}

/// Root configuration for one simulation instance.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Name of the machine, used for thread naming and logging.
    #[serde(default = "Config::default_machine_name")]
    pub machine_name: String,

    /// Whether debug events (cycle, fetch, decode, bus traffic) are emitted.
    #[serde(default)]
    pub debug: bool,

    /// Processor configuration.
    #[serde(default)]
    pub processor: ProcessorConfig,

    /// Memory region layout and permissions.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Device roster, stepped in declaration order.
    #[serde(default = "Config::default_devices")]
    pub devices: Vec<DeviceConfig>,
}

impl Config {
    fn default_machine_name() -> String {
        "machine".to_owned()
    }

    /// The full default roster: one of each device kind.
    fn default_devices() -> Vec<DeviceConfig> {
        vec![
            DeviceConfig::Video {
                base: defaults::VIDEO_BASE,
                frame_hz: defaults::FRAME_HZ,
            },
            DeviceConfig::Keyboard {
                base: defaults::KEYBOARD_BASE,
            },
            DeviceConfig::Timer {
                base: defaults::TIMER_BASE,
                tick_hz: defaults::TICK_HZ,
            },
            DeviceConfig::Network {
                base: defaults::NETWORK_BASE,
            },
            DeviceConfig::Audio {
                base: defaults::AUDIO_BASE,
            },
        ]
    }

    /// Deserializes a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Config`] on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        serde_json::from_str(json).map_err(|err| SimulationError::Config(err.to_string()))
    }

    /// Checks the record for contradictions.
    ///
    /// Regions must be well-formed and disjoint, device windows must not
    /// overlap each other or the memory regions, and timed device
    /// frequencies must be nonzero.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Config`] describing the first problem
    /// found.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let regions = [
            ("eprom", self.memory.eprom_start, self.memory.eprom_end),
            ("ram", self.memory.ram_start, self.memory.ram_end),
            ("vram", self.memory.vram_start, self.memory.vram_end),
        ];

        for (name, start, end) in regions {
            if start > end {
                return Err(SimulationError::Config(format!(
                    "{name} region ends ({end:#010x}) before it starts ({start:#010x})"
                )));
            }
        }

        for (i, (name_a, start_a, end_a)) in regions.iter().enumerate() {
            for (name_b, start_b, end_b) in regions.iter().skip(i + 1) {
                if start_a <= end_b && start_b <= end_a {
                    return Err(SimulationError::Config(format!(
                        "{name_a} and {name_b} regions overlap"
                    )));
                }
            }
        }

        let windows: Vec<(u32, u32)> = self
            .devices
            .iter()
            .map(|device| {
                let base = device.base();
                (base, base + device.port_count() - 1)
            })
            .collect();

        for (index, (start, end)) in windows.iter().enumerate() {
            for (name, region_start, region_end) in &regions {
                if start <= region_end && region_start <= end {
                    return Err(SimulationError::Config(format!(
                        "device {index} window overlaps the {name} region"
                    )));
                }
            }
            for (other, (other_start, other_end)) in windows.iter().enumerate().skip(index + 1) {
                if start <= other_end && other_start <= end {
                    return Err(SimulationError::Config(format!(
                        "device {index} and device {other} windows overlap"
                    )));
                }
            }
        }

        for (index, device) in self.devices.iter().enumerate() {
            match device {
                DeviceConfig::Video { frame_hz: 0, .. } => {
                    return Err(SimulationError::Config(format!(
                        "device {index}: video frame rate must be nonzero"
                    )));
                }
                DeviceConfig::Timer { tick_hz: 0, .. } => {
                    return Err(SimulationError::Config(format!(
                        "device {index}: timer tick rate must be nonzero"
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            machine_name: Self::default_machine_name(),
            debug: false,
            processor: ProcessorConfig::default(),
            memory: MemoryConfig::default(),
            devices: Self::default_devices(),
        }
    }
}

/// Processor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    /// Program counter value at reset.
    #[serde(default = "ProcessorConfig::default_reset_pc")]
    pub reset_pc: u32,
}

impl ProcessorConfig {
    const fn default_reset_pc() -> u32 {
        defaults::RESET_PC
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            reset_pc: defaults::RESET_PC,
        }
    }
}

/// Memory region layout and permission policy.
///
/// End addresses are inclusive: a region from `0x0000` to `0x00ff` contains
/// `0x00ff` and not `0x0100`.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// First address of the program image region.
    #[serde(default = "MemoryConfig::default_eprom_start")]
    pub eprom_start: u32,

    /// Last address of the program image region (inclusive).
    #[serde(default = "MemoryConfig::default_eprom_end")]
    pub eprom_end: u32,

    /// First address of the RAM region.
    #[serde(default = "MemoryConfig::default_ram_start")]
    pub ram_start: u32,

    /// Last address of the RAM region (inclusive).
    #[serde(default = "MemoryConfig::default_ram_end")]
    pub ram_end: u32,

    /// First address of the video RAM region.
    #[serde(default = "MemoryConfig::default_vram_start")]
    pub vram_start: u32,

    /// Last address of the video RAM region (inclusive).
    #[serde(default = "MemoryConfig::default_vram_end")]
    pub vram_end: u32,

    /// Whether the program may write its own image region.
    #[serde(default)]
    pub allow_eprom_writes: bool,

    /// Whether the program may read video RAM back.
    #[serde(default = "MemoryConfig::default_allow_vram_reads")]
    pub allow_vram_reads: bool,
}

impl MemoryConfig {
    const fn default_eprom_start() -> u32 {
        defaults::EPROM_START
    }

    const fn default_eprom_end() -> u32 {
        defaults::EPROM_END
    }

    const fn default_ram_start() -> u32 {
        defaults::RAM_START
    }

    const fn default_ram_end() -> u32 {
        defaults::RAM_END
    }

    const fn default_vram_start() -> u32 {
        defaults::VRAM_START
    }

    const fn default_vram_end() -> u32 {
        defaults::VRAM_END
    }

    const fn default_allow_vram_reads() -> bool {
        true
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            eprom_start: defaults::EPROM_START,
            eprom_end: defaults::EPROM_END,
            ram_start: defaults::RAM_START,
            ram_end: defaults::RAM_END,
            vram_start: defaults::VRAM_START,
            vram_end: defaults::VRAM_END,
            allow_eprom_writes: false,
            allow_vram_reads: true,
        }
    }
}

/// One entry of the device roster.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeviceConfig {
    /// Text-mode video device.
    Video {
        /// Base bus address of the cursor ports.
        base: u32,
        /// Frame refresh rate in Hz.
        #[serde(default = "DeviceConfig::default_frame_hz")]
        frame_hz: u32,
    },
    /// Buffered keyboard device.
    Keyboard {
        /// Base bus address of the status and data ports.
        base: u32,
    },
    /// Periodic timer device.
    Timer {
        /// Bus address of the tick flag port.
        base: u32,
        /// Tick rate in Hz.
        #[serde(default = "DeviceConfig::default_tick_hz")]
        tick_hz: u32,
    },
    /// Word-broadcast network device.
    Network {
        /// Base bus address of the serial-style ports.
        base: u32,
    },
    /// Audio device.
    Audio {
        /// Bus address of the (unused) port.
        base: u32,
    },
}

impl DeviceConfig {
    const fn default_frame_hz() -> u32 {
        defaults::FRAME_HZ
    }

    const fn default_tick_hz() -> u32 {
        defaults::TICK_HZ
    }

    /// Base bus address of this device's window.
    pub const fn base(&self) -> u32 {
        match self {
            Self::Video { base, .. }
            | Self::Keyboard { base }
            | Self::Timer { base, .. }
            | Self::Network { base }
            | Self::Audio { base } => *base,
        }
    }

    /// Number of bus addresses this device claims.
    pub const fn port_count(&self) -> u32 {
        match self {
            Self::Video { .. } => crate::soc::devices::VideoDevice::PORT_COUNT,
            Self::Keyboard { .. } => crate::soc::devices::KeyboardDevice::PORT_COUNT,
            Self::Timer { .. } => crate::soc::devices::TimerDevice::PORT_COUNT,
            Self::Network { .. } => crate::soc::devices::NetworkDevice::PORT_COUNT,
            Self::Audio { .. } => crate::soc::devices::AudioDevice::PORT_COUNT,
        }
    }
}
