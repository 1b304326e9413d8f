//! Log output of a session, captured through the `log` facade.
//!
//! Run with `cargo test --features log`.

#![cfg(all(feature = "log", not(feature = "defmt")))]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Once;

use ble_notify::adv::AdvPayload;
use ble_notify::gatt::ServiceDef;
use ble_notify::peripheral::register;
use ble_notify::{
    BleRadio, CharacteristicId, Error, GattRegistrar, Peripheral, RadioEvent, ServiceHandles,
};
use log::{Level, LevelFilter, Log, Metadata, Record};

thread_local! {
    static LINES: RefCell<Vec<(Level, String)>> = RefCell::new(Vec::new());
}

/// Records every line on the thread that emitted it, so parallel tests
/// do not see each other's output.
struct Capture;

impl Log for Capture {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        LINES.with(|lines| {
            lines
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: Capture = Capture;
static INIT: Once = Once::new();

fn capture() {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).expect("logger already set");
        log::set_max_level(LevelFilter::Trace);
    });
    LINES.with(|lines| lines.borrow_mut().clear());
}

/// Drain the captured lines at `level` or more severe.
fn take(level: Level) -> Vec<(Level, String)> {
    LINES.with(|lines| {
        std::mem::take(&mut *lines.borrow_mut())
            .into_iter()
            .filter(|(l, _)| *l <= level)
            .collect()
    })
}

fn messages(level: Level) -> Vec<String> {
    take(level).into_iter().map(|(_, text)| text).collect()
}

struct Registrar;

impl GattRegistrar for Registrar {
    fn register(&mut self, _service: &ServiceDef) -> Result<ServiceHandles, Error> {
        Ok(ServiceHandles {
            service: 10,
            characteristics: [12, 15],
        })
    }
}

#[derive(Default)]
struct Stack {
    attributes: BTreeMap<u16, Vec<u8>>,
}

impl BleRadio for Stack {
    fn advertise(&mut self, _interval_ms: u32, _payload: &AdvPayload) -> Result<(), Error> {
        Ok(())
    }

    fn read(&mut self, value_handle: u16, buf: &mut [u8]) -> Result<usize, Error> {
        let value = self.attributes.get(&value_handle).map(Vec::as_slice).unwrap_or(&[]);
        buf[..value.len()].copy_from_slice(value);
        Ok(value.len())
    }

    fn notify(&mut self, _conn_handle: u16, _value_handle: u16, _data: &[u8]) -> Result<(), Error> {
        Ok(())
    }
}

fn start() -> Peripheral<Stack> {
    let handles = register(&mut Registrar).unwrap();
    Peripheral::new(Stack::default(), handles).unwrap()
}

fn write(device: &mut Peripheral<Stack>, handle: u16, value: &[u8]) {
    device.radio_mut().attributes.insert(handle, value.to_vec());
    device
        .handle_event(RadioEvent::Write {
            conn_handle: 0,
            attr_handle: handle,
        })
        .unwrap();
}

#[test]
fn boot_logs_registration_and_advertising() {
    capture();
    let _device = start();
    assert_eq!(
        messages(Level::Info),
        [
            "Registers done (service 10, characteristics 12 / 15)",
            "Device advertised as Awesome BLE server",
        ]
    );
}

#[test]
fn send_without_peer_logs_no_device() {
    let mut device = start();
    capture();
    device.broadcast().unwrap();
    assert_eq!(
        messages(Level::Info),
        ["No device connected", "No device connected"]
    );
}

#[test]
fn connect_and_text_write() {
    let mut device = start();
    capture();
    device
        .handle_event(RadioEvent::Connected { conn_handle: 0 })
        .unwrap();
    write(&mut device, 12, b"hello\n");
    assert_eq!(
        messages(Level::Info),
        [
            "Device connected",
            "Message in characteristic 1 received",
            "Message: hello",
        ]
    );
}

#[test]
fn undecodable_write_logs_an_error() {
    let mut device = start();
    device
        .handle_event(RadioEvent::Connected { conn_handle: 0 })
        .unwrap();
    capture();
    write(&mut device, 15, &[0xC3, 0x28]);
    assert_eq!(
        take(Level::Info),
        [
            (Level::Info, "Message in characteristic 2 received".to_string()),
            (
                Level::Error,
                "Error when converting value from characteristic 2".to_string()
            ),
        ]
    );
}

#[test]
fn broadcast_logs_each_value_sent() {
    let mut device = start();
    device
        .handle_event(RadioEvent::Connected { conn_handle: 0 })
        .unwrap();
    capture();
    device.broadcast().unwrap();
    assert_eq!(
        messages(Level::Info),
        [
            "Value sent to characteristic 1: Characteristic 1",
            "Value sent to characteristic 2: Characteristic 2",
        ]
    );
}

#[test]
fn disconnect_logs_then_readvertises() {
    let mut device = start();
    device
        .handle_event(RadioEvent::Connected { conn_handle: 0 })
        .unwrap();
    capture();
    device
        .handle_event(RadioEvent::Disconnected { conn_handle: 0 })
        .unwrap();
    assert_eq!(
        messages(Level::Info),
        [
            "Device disconnected",
            "Device advertised as Awesome BLE server",
        ]
    );
    assert_eq!(
        device.send(CharacteristicId::One, "late"),
        Ok(ble_notify::Delivery::NoPeer)
    );
    assert_eq!(messages(Level::Info), ["No device connected"]);
}
