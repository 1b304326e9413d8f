//! Legacy advertising payload, built by hand.
//!
//! Layout (two AD structures):
//! ```text
//! 02 01 02            Flags: LE General Discoverable
//! LL 09 <name...>     Complete Local Name, LL = len(name) + 1
//! ```
//!
//! The whole payload must fit the 31-byte legacy advertising PDU.

use crate::error::Error;
use heapless::Vec;

/// Maximum legacy advertising payload length.
pub const MAX_ADV_LEN: usize = 31;

/// AD type: Flags.
pub const AD_TYPE_FLAGS: u8 = 0x01;
/// AD type: Shortened Local Name.
pub const AD_TYPE_SHORT_NAME: u8 = 0x08;
/// AD type: Complete Local Name.
pub const AD_TYPE_COMPLETE_NAME: u8 = 0x09;

/// Flags bit: LE General Discoverable Mode.
pub const FLAG_LE_GENERAL_DISCOVERABLE: u8 = 0x02;

/// Raw advertising payload for this peripheral.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdvPayload {
    bytes: Vec<u8, MAX_ADV_LEN>,
}

impl AdvPayload {
    /// Build flags + complete local name.
    pub fn new(name: &str) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        push_structure(&mut bytes, AD_TYPE_FLAGS, &[FLAG_LE_GENERAL_DISCOVERABLE])?;
        push_structure(&mut bytes, AD_TYPE_COMPLETE_NAME, name.as_bytes())?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Complete or shortened local name carried in the payload, if any.
    pub fn local_name(&self) -> Option<&str> {
        structures(&self.bytes)
            .find(|ad| ad.ad_type == AD_TYPE_COMPLETE_NAME || ad.ad_type == AD_TYPE_SHORT_NAME)
            .and_then(|ad| core::str::from_utf8(ad.data).ok())
    }
}

fn push_structure(buf: &mut Vec<u8, MAX_ADV_LEN>, ad_type: u8, data: &[u8]) -> Result<(), Error> {
    // The length byte covers the type byte plus the data.
    let len = u8::try_from(data.len() + 1).map_err(|_| Error::AdvertisingPayloadTooLong)?;
    buf.push(len).map_err(|_| Error::AdvertisingPayloadTooLong)?;
    buf.push(ad_type).map_err(|_| Error::AdvertisingPayloadTooLong)?;
    buf.extend_from_slice(data)
        .map_err(|_| Error::AdvertisingPayloadTooLong)
}

/// One AD structure inside an advertising payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdStructure<'a> {
    pub ad_type: u8,
    pub data: &'a [u8],
}

/// Iterate the AD structures of a raw payload.
///
/// Stops at a zero-length structure or at one that runs past the end
/// of the buffer.
pub fn structures(data: &[u8]) -> Structures<'_> {
    Structures { data, pos: 0 }
}

pub struct Structures<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Structures<'a> {
    type Item = AdStructure<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.pos;
        if i >= self.data.len() {
            return None;
        }
        let len = self.data[i] as usize;
        if len == 0 || i + len >= self.data.len() {
            self.pos = self.data.len();
            return None;
        }
        self.pos = i + len + 1;
        Some(AdStructure {
            ad_type: self.data[i + 1],
            data: &self.data[i + 2..i + 1 + len],
        })
    }
}
