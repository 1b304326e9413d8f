//! BLE notify peripheral for the nRF52840.
//!
//! One primary GATT service with two read/write/notify characteristics.
//! The device advertises, accepts a single central, logs whatever the
//! central writes and pushes a notification on both characteristics every
//! two seconds while connected.
//!
//! Everything except the SoftDevice adapter is plain `no_std` logic that
//! builds and tests on the host:
//!
//! Usage: `cargo test` (host) or `cargo run --release --features embedded`
//! (target, via probe-rs).
//!
//! - `adv`: hand-built legacy advertising payload
//! - `gatt`: UUIDs, properties, the service definition and its handles
//! - `event`: radio events
//! - `peripheral`: the connection/write/notify state machine and the
//!   traits the BLE stack implements
//! - `softdevice`: the S140 implementation of those traits (`embedded` only)

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to the other modules.
mod fmt;

pub mod adv;
pub mod config;
pub mod error;
pub mod event;
pub mod gatt;
pub mod peripheral;

#[cfg(feature = "embedded")]
pub mod softdevice;

pub use error::{BleError, Error};
pub use event::RadioEvent;
pub use gatt::{CharacteristicId, ServiceHandles};
pub use peripheral::{BleRadio, Delivery, EventOutcome, GattRegistrar, Peripheral};
