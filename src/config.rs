//! Application-wide constants and compile-time configuration.
//!
//! Device identity, GATT UUIDs, timing parameters and SoftDevice sizing
//! live here so they can be tuned in one place.

use uuid::{uuid, Uuid};

// Identity

/// Name broadcast in the advertising payload (Complete Local Name).
pub const DEVICE_NAME: &str = "Awesome BLE server";

// GATT

/// Primary service UUID.
pub const SERVICE_UUID: Uuid = uuid!("4fafc201-1fb5-459e-8fcc-c5c9c331914b");

/// First read/write/notify characteristic.
pub const CHARACTERISTIC_1_UUID: Uuid = uuid!("beb5483e-36e1-4688-b7f5-ea07361b26a8");

/// Second read/write/notify characteristic.
pub const CHARACTERISTIC_2_UUID: Uuid = uuid!("a2bdef65-f783-490d-b6ed-5ec887c85958");

/// Largest value a characteristic holds, and the largest notification we send.
/// Fits in a single notification at the default ATT MTU of 23 plus headroom
/// for a negotiated MTU.
pub const MAX_VALUE_LEN: usize = 64;

// Timing

/// Advertising interval (ms).
pub const ADV_INTERVAL_MS: u32 = 100;

/// Period of the notification loop (seconds).
pub const NOTIFY_PERIOD_SECS: u64 = 2;

/// Payload pushed to characteristic 1 on every notification tick.
pub const NOTIFY_PAYLOAD_1: &str = "Characteristic 1";

/// Payload pushed to characteristic 2 on every notification tick.
pub const NOTIFY_PAYLOAD_2: &str = "Characteristic 2";

// SoftDevice sizing

/// ATT MTU offered to the peer.
pub const ATT_MTU: u16 = 247;

/// GATT attribute table size in bytes (one service, two characteristics
/// with CCCDs fits easily; the rest covers the GAP/GATT services).
pub const ATTR_TAB_SIZE: u32 = 1408;

/// Only one central may be connected at a time.
pub const MAX_CONNECTIONS: u8 = 1;
