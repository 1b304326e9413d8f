//! GATT model: UUIDs, characteristic properties, the service this device
//! exposes and the handles the stack hands back after registration.

use core::fmt;
use core::ops::BitOr;

use uuid::Uuid;

use crate::config::{CHARACTERISTIC_1_UUID, CHARACTERISTIC_2_UUID, SERVICE_UUID};

/// Byte order the SoftDevice expects for a vendor-specific 128-bit UUID:
/// the canonical (big-endian) bytes reversed.
pub fn le_bytes(uuid: &Uuid) -> [u8; 16] {
    let mut le = *uuid.as_bytes();
    le.reverse();
    le
}

/// Characteristic property bits (Bluetooth Core Vol 3, Part G, 3.3.1.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Properties(u8);

impl Properties {
    pub const READ: Self = Self(0x02);
    pub const WRITE: Self = Self(0x08);
    pub const NOTIFY: Self = Self(0x10);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for Properties {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Logical identity of the two characteristics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CharacteristicId {
    One,
    Two,
}

impl CharacteristicId {
    pub const ALL: [CharacteristicId; 2] = [CharacteristicId::One, CharacteristicId::Two];

    /// Position in `ServiceDef::characteristics` / `ServiceHandles::characteristics`.
    pub const fn index(self) -> usize {
        match self {
            CharacteristicId::One => 0,
            CharacteristicId::Two => 1,
        }
    }

    /// 1-based number used in log messages.
    pub const fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

impl fmt::Display for CharacteristicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharacteristicDef {
    pub id: CharacteristicId,
    pub uuid: Uuid,
    pub properties: Properties,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceDef {
    pub uuid: Uuid,
    pub characteristics: [CharacteristicDef; 2],
}

const READ_WRITE_NOTIFY: Properties = Properties::READ
    .union(Properties::WRITE)
    .union(Properties::NOTIFY);

/// The single primary service this device registers.
pub const SERVICE: ServiceDef = ServiceDef {
    uuid: SERVICE_UUID,
    characteristics: [
        CharacteristicDef {
            id: CharacteristicId::One,
            uuid: CHARACTERISTIC_1_UUID,
            properties: READ_WRITE_NOTIFY,
        },
        CharacteristicDef {
            id: CharacteristicId::Two,
            uuid: CHARACTERISTIC_2_UUID,
            properties: READ_WRITE_NOTIFY,
        },
    ],
};

/// Attribute handles returned by registration. Valid for the process
/// lifetime once registration succeeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceHandles {
    pub service: u16,
    /// Value handles, indexed by `CharacteristicId::index`.
    pub characteristics: [u16; 2],
}

impl ServiceHandles {
    pub fn value_handle(&self, id: CharacteristicId) -> u16 {
        self.characteristics[id.index()]
    }

    /// Which characteristic owns `handle`, by value-handle comparison.
    pub fn characteristic_for(&self, handle: u16) -> Option<CharacteristicId> {
        CharacteristicId::ALL
            .into_iter()
            .find(|id| self.value_handle(*id) == handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_uuid_bytes() {
        assert_eq!(
            *SERVICE.uuid.as_bytes(),
            [
                0x4f, 0xaf, 0xc2, 0x01, 0x1f, 0xb5, 0x45, 0x9e, 0x8f, 0xcc, 0xc5, 0xc9, 0xc3,
                0x31, 0x91, 0x4b
            ]
        );
    }

    #[test]
    fn little_endian_is_reversed() {
        let le = le_bytes(&SERVICE.characteristics[0].uuid);
        assert_eq!(le[0], 0xa8);
        assert_eq!(le[1], 0x26);
        assert_eq!(le[15], 0xbe);

        let mut back = le;
        back.reverse();
        assert_eq!(&back, CHARACTERISTIC_1_UUID.as_bytes());
    }

    #[test]
    fn display_matches_canonical_text() {
        assert_eq!(
            SERVICE.uuid.to_string(),
            "4fafc201-1fb5-459e-8fcc-c5c9c331914b"
        );
        assert_eq!(
            SERVICE.characteristics[1].uuid.hyphenated().to_string(),
            "a2bdef65-f783-490d-b6ed-5ec887c85958"
        );
    }

    #[test]
    fn service_characteristics_are_read_write_notify() {
        for def in SERVICE.characteristics {
            assert!(def.properties.contains(Properties::READ));
            assert!(def.properties.contains(Properties::WRITE));
            assert!(def.properties.contains(Properties::NOTIFY));
            assert_eq!(def.properties.bits(), 0x1A);
        }
        assert_eq!(SERVICE.characteristics[0].id, CharacteristicId::One);
        assert_eq!(SERVICE.characteristics[1].id, CharacteristicId::Two);
    }

    #[test]
    fn properties_bitor() {
        let p = Properties::READ | Properties::NOTIFY;
        assert!(p.contains(Properties::READ));
        assert!(!p.contains(Properties::WRITE));
        assert!(Properties::empty().contains(Properties::empty()));
    }

    #[test]
    fn characteristic_lookup_by_handle() {
        let handles = ServiceHandles {
            service: 12,
            characteristics: [14, 17],
        };
        assert_eq!(handles.characteristic_for(14), Some(CharacteristicId::One));
        assert_eq!(handles.characteristic_for(17), Some(CharacteristicId::Two));
        // CCCD of characteristic 1 and the service handle are not value handles.
        assert_eq!(handles.characteristic_for(15), None);
        assert_eq!(handles.characteristic_for(12), None);
    }

    #[test]
    fn characteristic_numbers() {
        assert_eq!(CharacteristicId::One.number(), 1);
        assert_eq!(CharacteristicId::Two.to_string(), "2");
    }
}
