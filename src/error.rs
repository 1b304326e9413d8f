//! Unified error type for ble-notify.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging and `Display` for host logging.

use core::fmt;

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The BLE stack rejected an operation.
    Ble(BleError),

    /// Flags + local name do not fit a 31-byte legacy advertising payload.
    AdvertisingPayloadTooLong,

    /// A value does not fit `config::MAX_VALUE_LEN`.
    ValueTooLong,
}

/// Subset of BLE stack errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    /// Raw error code from the SoftDevice.
    Raw(u32),
    /// Service or characteristic registration failed.
    Register,
    /// Advertising could not be started.
    Advertise,
    /// Reading a local attribute value failed.
    Read,
    /// Notification could not be queued (peer gone, or CCCD not enabled).
    Notify,
}

// Convenience conversions

impl From<BleError> for Error {
    fn from(e: BleError) -> Self {
        Error::Ble(e)
    }
}

impl fmt::Display for BleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BleError::Raw(code) => write!(f, "softdevice error {:#x}", code),
            BleError::Register => f.write_str("GATT registration failed"),
            BleError::Advertise => f.write_str("advertising failed"),
            BleError::Read => f.write_str("attribute read failed"),
            BleError::Notify => f.write_str("notification failed"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Ble(e) => write!(f, "BLE: {}", e),
            Error::AdvertisingPayloadTooLong => f.write_str("advertising payload exceeds 31 bytes"),
            Error::ValueTooLong => f.write_str("value exceeds maximum attribute length"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ble_error_converts_into_error() {
        let e: Error = BleError::Notify.into();
        assert_eq!(e, Error::Ble(BleError::Notify));
    }

    #[test]
    fn display_includes_raw_code() {
        let e = Error::Ble(BleError::Raw(0x3401));
        assert_eq!(e.to_string(), "BLE: softdevice error 0x3401");
    }
}
