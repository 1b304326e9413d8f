//! Nordic SoftDevice S140 backend.
//!
//! Implements [`GattRegistrar`] and [`BleRadio`] on top of `nrf-softdevice`
//! and drives the peripheral from the SoftDevice's async API:
//!
//! 1. `ble_task` waits for an advertise request, advertises connectable and
//!    turns the resulting link into a `Connected` event.
//! 2. The GATT server runs on the link; every write becomes a `Write` event.
//! 3. When the link drops, a `Disconnected` event is delivered, which queues
//!    the next advertise request.
//!
//! The peripheral is shared between `ble_task` and the notification loop
//! behind a blocking critical-section mutex; each access is a few
//! SoftDevice calls long.

use core::cell::RefCell;
use core::mem;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{Attribute, Metadata, Properties as SdProperties};
use nrf_softdevice::ble::gatt_server::{self, RegisterError, WriteOp};
use nrf_softdevice::ble::peripheral as sd_peripheral;
use nrf_softdevice::ble::{Connection, Uuid};
use nrf_softdevice::{raw, Softdevice};

use crate::adv::AdvPayload;
use crate::config::{ATTR_TAB_SIZE, ATT_MTU, DEVICE_NAME, MAX_CONNECTIONS, MAX_VALUE_LEN, NOTIFY_PERIOD_SECS};
use crate::error::{BleError, Error};
use crate::event::RadioEvent;
use crate::gatt::{le_bytes, Properties, ServiceDef, ServiceHandles};
use crate::peripheral::{BleRadio, GattRegistrar, Peripheral};

/// The peripheral as shared between tasks.
pub type SharedPeripheral = Mutex<CriticalSectionRawMutex, RefCell<Peripheral<SoftdeviceRadio>>>;

/// Pending advertise request, consumed by `ble_task`.
struct AdvRequest {
    /// Interval in 0.625 ms units.
    interval: u32,
    payload: AdvPayload,
}

static ADVERTISE: Signal<CriticalSectionRawMutex, AdvRequest> = Signal::new();

/// SoftDevice configuration: one peripheral link, no central role.
pub fn config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: MAX_CONNECTIONS,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: ATT_MTU }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: ATTR_TAB_SIZE,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: MAX_CONNECTIONS,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            // SAFETY: all-zero is "no access" for a security mode struct.
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Registration
// ═══════════════════════════════════════════════════════════════════════════

/// Registers services while the SoftDevice is still exclusively borrowed.
pub struct SoftdeviceRegistrar<'a> {
    sd: &'a mut Softdevice,
}

impl<'a> SoftdeviceRegistrar<'a> {
    pub fn new(sd: &'a mut Softdevice) -> Self {
        Self { sd }
    }
}

impl GattRegistrar for SoftdeviceRegistrar<'_> {
    fn register(&mut self, service: &ServiceDef) -> Result<ServiceHandles, Error> {
        let uuid = Uuid::new_128(&le_bytes(&service.uuid));
        let mut sb = ServiceBuilder::new(self.sd, uuid).map_err(register_error)?;

        let mut characteristics = [0u16; 2];
        for def in &service.characteristics {
            // Values are stored by the SoftDevice; writes land there before
            // the write event reaches us.
            let attr = Attribute::new(&[0u8; 0][..]).variable_len(MAX_VALUE_LEN as u16);
            let metadata = Metadata::new(sd_properties(def.properties));
            let handles = sb
                .add_characteristic(Uuid::new_128(&le_bytes(&def.uuid)), attr, metadata)
                .map_err(register_error)?
                .build();

            debug!(
                "Characteristic {}: value {} cccd {}",
                def.id.number(),
                handles.value_handle,
                handles.cccd_handle
            );
            characteristics[def.id.index()] = handles.value_handle;
        }

        let service_handle = sb.build();
        Ok(ServiceHandles {
            service: service_handle.handle(),
            characteristics,
        })
    }
}

fn register_error(e: RegisterError) -> Error {
    match e {
        RegisterError::Raw(code) => BleError::Raw(code as u32).into(),
        #[allow(unreachable_patterns)]
        _ => BleError::Register.into(),
    }
}

fn sd_properties(props: Properties) -> SdProperties {
    let mut out = SdProperties::new();
    if props.contains(Properties::READ) {
        out = out.read();
    }
    if props.contains(Properties::WRITE) {
        out = out.write();
    }
    if props.contains(Properties::NOTIFY) {
        out = out.notify();
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════
// Radio
// ═══════════════════════════════════════════════════════════════════════════

/// Runtime half of the backend. Holds the live connection, if any, since
/// the SoftDevice notifies on a `Connection` rather than a bare handle.
pub struct SoftdeviceRadio {
    sd: &'static Softdevice,
    conn: Option<Connection>,
}

impl SoftdeviceRadio {
    pub fn new(sd: &'static Softdevice) -> Self {
        Self { sd, conn: None }
    }

    fn attach(&mut self, conn: Connection) {
        self.conn = Some(conn);
    }

    fn detach(&mut self) {
        self.conn = None;
    }
}

impl BleRadio for SoftdeviceRadio {
    fn advertise(&mut self, interval_ms: u32, payload: &AdvPayload) -> Result<(), Error> {
        ADVERTISE.signal(AdvRequest {
            interval: interval_ms * 1000 / 625,
            payload: payload.clone(),
        });
        Ok(())
    }

    fn read(&mut self, value_handle: u16, buf: &mut [u8]) -> Result<usize, Error> {
        gatt_server::get_value(self.sd, value_handle, buf).map_err(|_| BleError::Read.into())
    }

    fn notify(&mut self, conn_handle: u16, value_handle: u16, data: &[u8]) -> Result<(), Error> {
        let conn = self
            .conn
            .as_ref()
            .filter(|c| c.handle() == Some(conn_handle))
            .ok_or(Error::Ble(BleError::Notify))?;
        gatt_server::notify_value(conn, value_handle, data).map_err(|_| BleError::Notify.into())
    }
}

/// GATT server that reports the handle of every write.
struct WriteRouter;

impl gatt_server::Server for WriteRouter {
    type Event = u16;

    fn on_write(
        &self,
        _conn: &Connection,
        handle: u16,
        _op: WriteOp,
        _offset: usize,
        _data: &[u8],
    ) -> Option<Self::Event> {
        Some(handle)
    }
}

fn with_peripheral<T>(
    shared: &SharedPeripheral,
    f: impl FnOnce(&mut Peripheral<SoftdeviceRadio>) -> T,
) -> T {
    shared.lock(|cell| f(&mut cell.borrow_mut()))
}

// ═══════════════════════════════════════════════════════════════════════════
// Tasks
// ═══════════════════════════════════════════════════════════════════════════

/// Advertise, serve one connection, repeat.
pub async fn ble_task(sd: &'static Softdevice, shared: &'static SharedPeripheral) -> ! {
    let mut request = ADVERTISE.wait().await;

    loop {
        let config = sd_peripheral::Config {
            interval: request.interval,
            ..Default::default()
        };
        let adv = sd_peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: request.payload.as_bytes(),
            scan_data: &[],
        };

        let conn = match sd_peripheral::advertise_connectable(sd, adv, &config).await {
            Ok(conn) => conn,
            Err(e) => {
                error!("BLE advertising failed: {:?}", defmt::Debug2Format(&e));
                Timer::after(Duration::from_secs(1)).await;
                continue;
            }
        };
        let conn_handle = conn.handle().unwrap_or(raw::BLE_CONN_HANDLE_INVALID as u16);

        with_peripheral(shared, |p| {
            p.radio_mut().attach(conn.clone());
            p.handle_event(RadioEvent::Connected { conn_handle })
        })
        .ok();

        // Returns when the connection is gone.
        let reason = gatt_server::run(&conn, &WriteRouter, |attr_handle| {
            with_peripheral(shared, |p| {
                p.handle_event(RadioEvent::Write {
                    conn_handle,
                    attr_handle,
                })
            })
            .ok();
        })
        .await;
        debug!("gatt_server run exited: {:?}", defmt::Debug2Format(&reason));

        let readvertised = with_peripheral(shared, |p| {
            p.radio_mut().detach();
            p.handle_event(RadioEvent::Disconnected { conn_handle })
        });
        if let Err(e) = readvertised {
            error!("Re-advertising failed: {:?}", e);
        }

        request = ADVERTISE.wait().await;
    }
}

/// Push the configured payloads every `NOTIFY_PERIOD_SECS`.
pub async fn notify_loop(shared: &'static SharedPeripheral) -> ! {
    loop {
        if let Err(e) = with_peripheral(shared, |p| p.broadcast()) {
            warn!("Notification tick incomplete: {:?}", e);
        }
        Timer::after(Duration::from_secs(NOTIFY_PERIOD_SECS)).await;
    }
}
