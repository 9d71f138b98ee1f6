use crate::ds18b20::Resolution;
use crate::{crc, Error};
use byteorder::{ByteOrder, LittleEndian};
use core::fmt::Debug;

/// How far a value read from the scratchpad can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integrity {
    /// CRC checked and correct
    Verified,
    /// CRC checking is disabled for this device
    Unchecked,
    /// CRC checked and wrong, the data may still be usable
    Corrupted { computed: u8, received: u8 },
}

impl Integrity {
    pub fn is_corrupted(&self) -> bool {
        matches!(self, Integrity::Corrupted { .. })
    }

    /// Turns a corrupted read into [`Error::CrcMismatch`]
    pub fn ensure_not_corrupted<E: Debug>(&self) -> Result<(), Error<E>> {
        match *self {
            Integrity::Corrupted { computed, received } => {
                Err(Error::CrcMismatch(computed, received))
            }
            _ => Ok(()),
        }
    }
}

/// DS18B20 register image, always transferred as a whole.
///
/// | byte | content                         |
/// |------|---------------------------------|
/// | 0, 1 | temperature LSB, MSB            |
/// | 2, 3 | alarm trigger high, low         |
/// | 4    | configuration, resolution R1:R0 |
/// | 5..8 | reserved                        |
/// | 8    | CRC-8 of bytes 0..8             |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Scratchpad {
    raw: [u8; Self::BYTES],
}

impl From<[u8; Scratchpad::BYTES]> for Scratchpad {
    fn from(raw: [u8; Scratchpad::BYTES]) -> Self {
        Scratchpad { raw }
    }
}

impl AsRef<[u8]> for Scratchpad {
    fn as_ref(&self) -> &[u8] {
        &self.raw
    }
}

impl Scratchpad {
    pub const BYTES: usize = 9;

    /// Temperature register value after power-up, 85 degC
    pub const POWER_ON_TEMPERATURE: [u8; 2] = [0x50, 0x05];

    /// Reserved byte 6 as it reads before the first conversion
    pub const POWER_ON_RESERVED: u8 = 0x0C;

    pub fn temperature_bytes(&self) -> (u8, u8) {
        (self.raw[0], self.raw[1])
    }

    /// Unmasked temperature register in 1/16 degC
    pub fn raw_temperature(&self) -> i16 {
        LittleEndian::read_i16(&self.raw[0..2])
    }

    pub fn trigger_high(&self) -> i8 {
        self.raw[2] as i8
    }

    pub fn trigger_low(&self) -> i8 {
        self.raw[3] as i8
    }

    pub fn configuration(&self) -> u8 {
        self.raw[4]
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::from_config(self.configuration())
    }

    pub fn reserved(&self) -> [u8; 3] {
        [self.raw[5], self.raw[6], self.raw[7]]
    }

    pub fn crc(&self) -> u8 {
        self.raw[8]
    }

    pub fn crc_is_valid(&self) -> bool {
        crc::crc8_check(&self.raw)
    }

    pub fn integrity(&self) -> Integrity {
        if self.crc_is_valid() {
            Integrity::Verified
        } else {
            Integrity::Corrupted {
                computed: crc::crc8(0, &self.raw[..8]),
                received: self.crc(),
            }
        }
    }

    /// The device still holds its reset value: 85 degC together with the
    /// reserved byte it only carries until a conversion has run.
    pub fn is_power_on_default(&self) -> bool {
        self.raw[0..2] == Self::POWER_ON_TEMPERATURE && self.raw[6] == Self::POWER_ON_RESERVED
    }
}
