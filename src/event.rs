//! Events the BLE stack delivers to the peripheral.

/// A radio event, as seen by the peripheral state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioEvent {
    /// A central connected.
    Connected { conn_handle: u16 },
    /// The link to a central was closed.
    Disconnected { conn_handle: u16 },
    /// A central wrote to the local attribute at `attr_handle`.
    Write { conn_handle: u16, attr_handle: u16 },
}

impl RadioEvent {
    /// Connection the event belongs to.
    pub fn conn_handle(&self) -> u16 {
        match *self {
            RadioEvent::Connected { conn_handle }
            | RadioEvent::Disconnected { conn_handle }
            | RadioEvent::Write { conn_handle, .. } => conn_handle,
        }
    }
}
