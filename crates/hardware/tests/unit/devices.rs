//! Port-mapped devices and real-time pacing.

use crate::common::harness::{MockClock, quiet_sink};
use busim_core::common::id::ComponentId;
use busim_core::soc::bus::Bus;
use busim_core::soc::devices::pacing::Pacer;
use busim_core::soc::devices::video::{TEXT_COLS, TEXT_ROWS};
use busim_core::soc::devices::{
    KeyboardDevice, NetworkDevice, NetworkHub, TimerDevice, VideoDevice,
};
use busim_core::soc::memory::store::ByteStore;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Stand-in for the processor when driving the bus by hand.
const PROBE: ComponentId = ComponentId::Device(9);

const BASE: u32 = 0x0010_0000;

/// Reads one device port through the full bus protocol.
fn port_read<S>(bus: &mut Bus, step: &mut S, addr: u32) -> u32
where
    S: FnMut(&mut Bus),
{
    bus.address.drive(PROBE, addr).unwrap();
    bus.read_enable.drive(PROBE, 1).unwrap();
    bus.step();
    step(bus); // device drives its answer

    bus.read_enable.drive(PROBE, 0).unwrap();
    bus.step();
    let value = bus.data.read();
    step(bus); // device releases on the idle step
    value
}

/// Writes one device port through the full bus protocol.
fn port_write<S>(bus: &mut Bus, step: &mut S, addr: u32, value: u32)
where
    S: FnMut(&mut Bus),
{
    bus.address.drive(PROBE, addr).unwrap();
    bus.data.drive(PROBE, value).unwrap();
    bus.write_enable.drive(PROBE, 1).unwrap();
    bus.step();
    step(bus);

    bus.write_enable.drive(PROBE, 0).unwrap();
    bus.data.release(PROBE).unwrap();
    bus.step();
    step(bus);
}

#[test]
fn keyboard_status_and_data_follow_the_queue() {
    let mut bus = Bus::new();
    let mut keyboard = KeyboardDevice::new(ComponentId::Device(0), BASE, quiet_sink());
    keyboard.handle().push_key(75);

    let mut step = |bus: &mut Bus| keyboard.step(bus).unwrap();

    assert_eq!(port_read(&mut bus, &mut step, BASE), 1, "status: available");
    assert_eq!(port_read(&mut bus, &mut step, BASE + 1), 75, "dequeue");
    assert_eq!(port_read(&mut bus, &mut step, BASE), 0, "status: empty");
    assert_eq!(port_read(&mut bus, &mut step, BASE + 1), 0, "empty dequeue");
}

#[test]
fn keyboard_queues_keys_in_order() {
    let mut bus = Bus::new();
    let mut keyboard = KeyboardDevice::new(ComponentId::Device(0), BASE, quiet_sink());
    keyboard.handle().push_key(1);
    keyboard.handle().push_key(2);

    let mut step = |bus: &mut Bus| keyboard.step(bus).unwrap();
    assert_eq!(port_read(&mut bus, &mut step, BASE + 1), 1);
    assert_eq!(port_read(&mut bus, &mut step, BASE + 1), 2);
}

#[test]
fn devices_ignore_addresses_outside_their_window() {
    let mut bus = Bus::new();
    let mut keyboard = KeyboardDevice::new(ComponentId::Device(0), BASE, quiet_sink());
    keyboard.handle().push_key(75);

    bus.address.drive(PROBE, BASE + 2).unwrap();
    bus.read_enable.drive(PROBE, 1).unwrap();
    bus.step();
    keyboard.step(&mut bus).unwrap();

    assert_eq!(bus.data.driver(), None, "no answer outside the window");
}

#[test]
fn device_releases_the_data_line_on_the_idle_step() {
    let mut bus = Bus::new();
    let mut keyboard = KeyboardDevice::new(ComponentId::Device(0), BASE, quiet_sink());

    bus.address.drive(PROBE, BASE).unwrap();
    bus.read_enable.drive(PROBE, 1).unwrap();
    bus.step();
    keyboard.step(&mut bus).unwrap();
    assert_eq!(bus.data.driver(), Some(ComponentId::Device(0)));

    bus.read_enable.drive(PROBE, 0).unwrap();
    bus.step();
    keyboard.step(&mut bus).unwrap();
    assert_eq!(bus.data.driver(), None);
}

#[test]
fn timer_tick_flag_clears_on_read() {
    let mut bus = Bus::new();
    let mut timer = TimerDevice::new(ComponentId::Device(0), BASE, 1000, quiet_sink());
    timer.tick();

    let mut step = |bus: &mut Bus| timer.step(bus).unwrap();
    assert_eq!(port_read(&mut bus, &mut step, BASE), 1);
    assert_eq!(port_read(&mut bus, &mut step, BASE), 0, "cleared by the read");
}

#[test]
fn video_cursor_ports_feed_the_frame() {
    let mut bus = Bus::new();
    let vram = Arc::new(ByteStore::new(TEXT_COLS * TEXT_ROWS));
    vram.set(0, b'H');
    vram.set(1, b'i');

    let mut video = VideoDevice::new(ComponentId::Device(0), BASE, 25, vram, quiet_sink());
    let mut step = |bus: &mut Bus| video.step(bus).unwrap();
    port_write(&mut bus, &mut step, BASE, 5);
    port_write(&mut bus, &mut step, BASE + 1, 12);

    let frame = video.render_frame();
    assert_eq!(frame.cursor_row, 5);
    assert_eq!(frame.cursor_col, 12);
    assert_eq!(frame.cells.len(), TEXT_COLS * TEXT_ROWS);
    assert_eq!(frame.cells[0], b'H');
    assert_eq!(frame.cells[1], b'i');
}

#[test]
fn network_broadcast_reaches_everyone_but_the_sender() {
    let hub = Arc::new(NetworkHub::new());
    let a = NetworkHub::attach(&hub).unwrap();
    let b = NetworkHub::attach(&hub).unwrap();
    let c = NetworkHub::attach(&hub).unwrap();

    a.send(42);
    assert_eq!(a.receive(), None, "senders do not hear themselves");
    assert_eq!(b.receive(), Some(42));
    assert_eq!(c.receive(), Some(42));
    assert_eq!(b.receive(), None);
}

#[test]
fn network_addresses_are_unique_and_pooled() {
    let hub = Arc::new(NetworkHub::new());
    let a = NetworkHub::attach(&hub).unwrap();
    let b = NetworkHub::attach(&hub).unwrap();

    assert_ne!(a.address(), b.address());
    assert!((1..=100).contains(&a.address()));
    assert!((1..=100).contains(&b.address()));
}

#[test]
fn network_pool_exhaustion_is_a_construction_error() {
    let hub = Arc::new(NetworkHub::new());
    for _ in 0..100 {
        NetworkHub::attach(&hub).unwrap();
    }
    assert!(NetworkHub::attach(&hub).is_err());
}

#[test]
fn network_ports_speak_the_serial_protocol() {
    let hub = Arc::new(NetworkHub::new());
    let mut bus = Bus::new();
    let mut tx = NetworkDevice::new(
        ComponentId::Device(0),
        BASE,
        NetworkHub::attach(&hub).unwrap(),
        quiet_sink(),
    );
    let mut rx = NetworkDevice::new(
        ComponentId::Device(1),
        BASE + 0x10,
        NetworkHub::attach(&hub).unwrap(),
        quiet_sink(),
    );

    {
        let mut step = |bus: &mut Bus| tx.step(bus).unwrap();
        assert_eq!(port_read(&mut bus, &mut step, BASE + 1), 1, "tx always ready");
        port_write(&mut bus, &mut step, BASE, 77);
    }

    let mut step = |bus: &mut Bus| rx.step(bus).unwrap();
    assert_eq!(port_read(&mut bus, &mut step, BASE + 0x10 + 3), 1, "rx ready");
    assert_eq!(port_read(&mut bus, &mut step, BASE + 0x10 + 2), 77);
    assert_eq!(port_read(&mut bus, &mut step, BASE + 0x10 + 3), 0);
    assert_eq!(port_read(&mut bus, &mut step, BASE + 0x10 + 2), 0);
}

#[test]
fn pacer_fires_on_absolute_deadlines_under_a_mock_clock() {
    use busim_core::soc::devices::pacing::DeviceClock;

    let clock = MockClock::new();
    let running = Arc::new(AtomicBool::new(true));
    let paused = Arc::new(AtomicBool::new(false));

    let pacer = Pacer::new(
        Duration::from_millis(10),
        clock.clone(),
        running.clone(),
        paused.clone(),
    );

    let fire_times: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let clock = clock.clone();
        let running = running.clone();
        let fire_times = fire_times.clone();
        pacer.run(move || {
            let mut times = fire_times.lock().unwrap();
            times.push(clock.now());
            if times.len() == 5 {
                running.store(false, Ordering::Release);
            }
        });
    }

    let times = fire_times.lock().unwrap().clone();
    assert_eq!(times.len(), 5);
    for (index, time) in times.iter().enumerate() {
        assert_eq!(*time, Duration::from_millis(10) * index as u32);
    }
}

#[test]
fn paused_pacer_polls_instead_of_firing() {
    let clock = MockClock::new();
    let running = Arc::new(AtomicBool::new(true));
    let paused = Arc::new(AtomicBool::new(true));
    let count = Arc::new(AtomicU32::new(0));

    let pacer = Pacer::new(
        Duration::from_millis(10),
        clock.clone(),
        running.clone(),
        paused.clone(),
    );
    let handle = {
        let count = count.clone();
        thread::spawn(move || {
            pacer.run(move || {
                count.fetch_add(1, Ordering::AcqRel);
            });
        })
    };

    // work runs once before the first wait, then the pause holds the loop
    wait_for(|| count.load(Ordering::Acquire) == 1);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(
        count.load(Ordering::Acquire),
        1,
        "a paused device must not chase deadlines"
    );

    paused.store(false, Ordering::Release);
    wait_for(|| count.load(Ordering::Acquire) >= 3);

    running.store(false, Ordering::Release);
    handle.join().unwrap();
}

fn wait_for(predicate: impl Fn() -> bool) {
    for _ in 0..2_000 {
        if predicate() {
            return;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("condition not reached within the timeout");
}
