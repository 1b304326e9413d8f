//! Event-driven GATT peripheral.
//!
//! Holds the registered handles and the single connection, reacts to
//! connect / disconnect / write events and pushes notifications. The BLE
//! stack itself sits behind two traits so the same state machine runs on
//! the SoftDevice and against a test double on the host.
//!
//! ## Event handling
//!
//! - **Connected**: remember the connection handle.
//! - **Disconnected**: forget it and advertise again.
//! - **Write**: find the characteristic by value handle, read its current
//!   value, decode UTF-8 and log it. Read or decode failures are logged and
//!   the message is dropped.

use heapless::String;

use crate::adv::AdvPayload;
use crate::config::{ADV_INTERVAL_MS, DEVICE_NAME, MAX_VALUE_LEN, NOTIFY_PAYLOAD_1, NOTIFY_PAYLOAD_2};
use crate::error::Error;
use crate::event::RadioEvent;
use crate::gatt::{CharacteristicId, ServiceDef, ServiceHandles, SERVICE};

/// Registers GATT services with the stack.
///
/// Kept apart from [`BleRadio`] because the SoftDevice only accepts
/// registrations while it is exclusively borrowed, before it starts running.
pub trait GattRegistrar {
    fn register(&mut self, service: &ServiceDef) -> Result<ServiceHandles, Error>;
}

/// Runtime operations the peripheral needs from the BLE stack.
pub trait BleRadio {
    /// Start (or restart) connectable advertising with a raw payload.
    fn advertise(&mut self, interval_ms: u32, payload: &AdvPayload) -> Result<(), Error>;

    /// Copy the current value of a local attribute into `buf`.
    /// Returns the number of bytes written.
    fn read(&mut self, value_handle: u16, buf: &mut [u8]) -> Result<usize, Error>;

    /// Send a notification for `value_handle` on connection `conn_handle`.
    fn notify(&mut self, conn_handle: u16, value_handle: u16, data: &[u8]) -> Result<(), Error>;
}

/// Register this device's service and return its handles.
pub fn register<G: GattRegistrar>(registrar: &mut G) -> Result<ServiceHandles, Error> {
    let handles = registrar.register(&SERVICE)?;
    info!(
        "Registers done (service {}, characteristics {} / {})",
        handles.service,
        handles.characteristics[0],
        handles.characteristics[1]
    );
    Ok(handles)
}

/// Decoded text received on a characteristic.
pub type Message = String<MAX_VALUE_LEN>;

/// Which branch an event took.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventOutcome {
    Connected,
    Disconnected,
    /// A write was read back and decoded.
    Message {
        characteristic: CharacteristicId,
        text: Message,
    },
    /// A write was read back but could not be read or decoded.
    Discarded { characteristic: CharacteristicId },
    /// A write to a handle that is not one of our characteristic values.
    Ignored,
}

/// Result of a `send` that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Delivery {
    Sent,
    /// Nobody is connected; nothing was sent.
    NoPeer,
}

/// Payloads pushed on every notification tick, in order.
const BROADCAST: [(CharacteristicId, &str); 2] = [
    (CharacteristicId::One, NOTIFY_PAYLOAD_1),
    (CharacteristicId::Two, NOTIFY_PAYLOAD_2),
];

pub struct Peripheral<R: BleRadio> {
    radio: R,
    handles: ServiceHandles,
    adv: AdvPayload,
    connection: Option<u16>,
}

impl<R: BleRadio> Peripheral<R> {
    /// Build the advertising payload and start advertising.
    pub fn new(radio: R, handles: ServiceHandles) -> Result<Self, Error> {
        let adv = AdvPayload::new(DEVICE_NAME)?;
        let mut peripheral = Self {
            radio,
            handles,
            adv,
            connection: None,
        };
        peripheral.advertise()?;
        Ok(peripheral)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Handle of the connected central, if any.
    pub fn connection(&self) -> Option<u16> {
        self.connection
    }

    pub fn handles(&self) -> &ServiceHandles {
        &self.handles
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Dispatch one radio event.
    ///
    /// Only a failed re-advertise after a disconnect is reported as an
    /// error; the connection state is updated regardless.
    pub fn handle_event(&mut self, event: RadioEvent) -> Result<EventOutcome, Error> {
        debug!("Radio event on connection {}", event.conn_handle());
        match event {
            RadioEvent::Connected { conn_handle } => {
                if let Some(previous) = self.connection.replace(conn_handle) {
                    warn!("Connection {} replaced by {}", previous, conn_handle);
                }
                info!("Device connected");
                Ok(EventOutcome::Connected)
            }
            RadioEvent::Disconnected { .. } => {
                self.connection = None;
                info!("Device disconnected");
                self.advertise()?;
                Ok(EventOutcome::Disconnected)
            }
            RadioEvent::Write { attr_handle, .. } => Ok(self.on_write(attr_handle)),
        }
    }

    /// Notify `payload` on one characteristic if a central is connected.
    pub fn send(&mut self, id: CharacteristicId, payload: &str) -> Result<Delivery, Error> {
        let Some(conn_handle) = self.connection else {
            info!("No device connected");
            return Ok(Delivery::NoPeer);
        };
        if payload.len() > MAX_VALUE_LEN {
            return Err(Error::ValueTooLong);
        }

        self.radio
            .notify(conn_handle, self.handles.value_handle(id), payload.as_bytes())?;
        info!("Value sent to characteristic {}: {}", id.number(), payload);
        Ok(Delivery::Sent)
    }

    /// Send the configured payload on every characteristic.
    ///
    /// Every characteristic is attempted; the first failure is returned.
    pub fn broadcast(&mut self) -> Result<(), Error> {
        let mut result = Ok(());
        for (id, payload) in BROADCAST {
            if let Err(e) = self.send(id, payload) {
                warn!("Notification on characteristic {} failed: {:?}", id.number(), e);
                result = result.and(Err(e));
            }
        }
        result
    }

    fn advertise(&mut self) -> Result<(), Error> {
        self.radio.advertise(ADV_INTERVAL_MS, &self.adv)?;
        info!("Device advertised as {}", self.adv.local_name().unwrap_or(""));
        Ok(())
    }

    fn on_write(&mut self, attr_handle: u16) -> EventOutcome {
        let Some(id) = self.handles.characteristic_for(attr_handle) else {
            debug!("Write to handle {} ignored", attr_handle);
            return EventOutcome::Ignored;
        };
        info!("Message in characteristic {} received", id.number());

        match self.read_text(id) {
            Some(text) => {
                info!("Message: {}", text.as_str());
                EventOutcome::Message {
                    characteristic: id,
                    text,
                }
            }
            None => {
                error!("Error when converting value from characteristic {}", id.number());
                EventOutcome::Discarded { characteristic: id }
            }
        }
    }

    fn read_text(&mut self, id: CharacteristicId) -> Option<Message> {
        let mut buf = [0u8; MAX_VALUE_LEN];
        let len = match self.radio.read(self.handles.value_handle(id), &mut buf) {
            Ok(len) => len.min(buf.len()),
            Err(e) => {
                warn!("Reading characteristic {} failed: {:?}", id.number(), e);
                return None;
            }
        };

        let text = core::str::from_utf8(&buf[..len]).ok()?.trim();
        let mut message = Message::new();
        message.push_str(text).ok()?;
        Some(message)
    }
}
