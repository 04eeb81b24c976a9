//! Machine assembly.
//!
//! A [`Machine`] is one bus plus everything mounted on it, built from a
//! configuration record and a program image. Stepping is synchronous and
//! single-threaded here; the threaded loop lives in the orchestrator.

use crate::common::error::SimulationError;
use crate::common::id::ComponentId;
use crate::config::{Config, DeviceConfig};
use crate::core::processor::Processor;
use crate::event::EventSink;
use crate::soc::bus::Bus;
use crate::soc::devices::video::Frame;
use crate::soc::devices::{
    AudioDevice, Device, KeyboardDevice, KeyboardHandle, NetworkDevice, NetworkHub, TimerDevice,
    VideoDevice,
};
use crate::soc::memory::MemorySpace;
use std::sync::Arc;

/// One complete machine: bus, processor, memory, and the device roster.
pub struct Machine {
    /// The shared bus.
    pub bus: Bus,
    /// The processor.
    pub processor: Processor,
    /// The memory space.
    pub memory: MemorySpace,
    /// Devices, stepped in declaration order.
    pub devices: Vec<Device>,
}

impl Machine {
    /// Assembles a machine from a validated configuration and program image.
    ///
    /// The image is loaded into the program region and the processor is
    /// reset to the configured address. Network devices attach to the given
    /// hub, which may be shared between instances.
    ///
    /// # Errors
    ///
    /// Returns configuration, image size, or line ownership errors; all are
    /// fatal before the first step.
    pub fn new(
        image: &[u8],
        config: &Config,
        sink: EventSink,
        hub: &Arc<NetworkHub>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;

        let mut bus = Bus::new();
        let memory = MemorySpace::new(&config.memory, image, sink.clone())?;
        let processor = Processor::new(&mut bus, config.processor.reset_pc, sink.clone())?;

        let mut devices = Vec::with_capacity(config.devices.len());
        for (index, entry) in config.devices.iter().enumerate() {
            let id = ComponentId::Device(index as u8);
            let device = match entry {
                DeviceConfig::Video { base, frame_hz } => Device::Video(VideoDevice::new(
                    id,
                    *base,
                    *frame_hz,
                    memory.video_store(),
                    sink.clone(),
                )),
                DeviceConfig::Keyboard { base } => {
                    Device::Keyboard(KeyboardDevice::new(id, *base, sink.clone()))
                }
                DeviceConfig::Timer { base, tick_hz } => {
                    Device::Timer(TimerDevice::new(id, *base, *tick_hz, sink.clone()))
                }
                DeviceConfig::Network { base } => Device::Network(NetworkDevice::new(
                    id,
                    *base,
                    NetworkHub::attach(hub)?,
                    sink.clone(),
                )),
                DeviceConfig::Audio { base } => {
                    Device::Audio(AudioDevice::new(id, *base, sink.clone()))
                }
            };
            devices.push(device);
        }

        Ok(Self {
            bus,
            processor,
            memory,
            devices,
        })
    }

    /// Performs one simulation cycle.
    ///
    /// The bus commits buffered line values first, then the processor, the
    /// memory space, and each device step in fixed order. Every component
    /// reads the values committed this cycle and buffers its own writes for
    /// the next one.
    ///
    /// # Errors
    ///
    /// Propagates the first component error; the cycle has no effects past
    /// the failing line operation.
    pub fn step(&mut self) -> Result<(), SimulationError> {
        self.bus.step();

        self.processor.step(&mut self.bus)?;
        self.memory.step(&mut self.bus)?;

        for device in &mut self.devices {
            device.step(&mut self.bus)?;
        }
        Ok(())
    }

    /// Handle for feeding the first keyboard device, if one is mounted.
    pub fn keyboard_handle(&self) -> Option<KeyboardHandle> {
        self.devices
            .iter()
            .find_map(|device| device.as_keyboard())
            .map(KeyboardDevice::handle)
    }

    /// Forces a frame snapshot from the first video device, if one is mounted.
    pub fn render_frame(&self) -> Option<Frame> {
        self.devices
            .iter()
            .find_map(|device| device.as_video())
            .map(VideoDevice::render_frame)
    }

    /// Network address of the first network device, if one is mounted.
    pub fn network_address(&self) -> Option<u32> {
        self.devices
            .iter()
            .find_map(|device| device.as_network())
            .map(NetworkDevice::address)
    }
}
