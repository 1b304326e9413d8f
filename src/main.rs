//! ble-notify firmware entry point (nRF52840 + SoftDevice S140).
//!
//! Boot order matters: services must be registered while the SoftDevice is
//! still exclusively borrowed, i.e. before `softdevice_task` starts.

#![no_std]
#![no_main]

use core::cell::RefCell;

use ble_notify::peripheral::{self, Peripheral};
use ble_notify::softdevice::{self, SharedPeripheral, SoftdeviceRadio, SoftdeviceRegistrar};
use defmt::{info, unwrap};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_nrf::{config::Config, interrupt};
use embassy_sync::blocking_mutex::Mutex;
use nrf_softdevice::Softdevice;
use panic_probe as _;
use static_cell::StaticCell;

static PERIPHERAL: StaticCell<SharedPeripheral> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("ble-notify starting");

    // Keep embassy interrupts off the SoftDevice reserved levels (0, 1, 4).
    let mut nrf_config = Config::default();
    nrf_config.gpiote_interrupt_priority = interrupt::Priority::P2;
    nrf_config.time_interrupt_priority = interrupt::Priority::P2;
    let _peripherals = embassy_nrf::init(nrf_config);

    let sd = Softdevice::enable(&softdevice::config());
    info!("SoftDevice enabled");

    let handles = peripheral::register(&mut SoftdeviceRegistrar::new(sd))
        .unwrap_or_else(|e| defmt::panic!("GATT registration failed: {:?}", e));
    let sd: &'static Softdevice = sd;

    unwrap!(spawner.spawn(softdevice_task(sd)));

    let device = Peripheral::new(SoftdeviceRadio::new(sd), handles)
        .unwrap_or_else(|e| defmt::panic!("Failed to start advertising: {:?}", e));
    let shared: &'static SharedPeripheral = PERIPHERAL.init(Mutex::new(RefCell::new(device)));

    unwrap!(spawner.spawn(ble_task(sd, shared)));

    info!("System initialized, entering notification loop");
    softdevice::notify_loop(shared).await
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn ble_task(sd: &'static Softdevice, shared: &'static SharedPeripheral) -> ! {
    softdevice::ble_task(sd, shared).await
}
