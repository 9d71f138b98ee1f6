use crate::{crc, Command, Error, OneWire};
use core::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    ops::{Deref, DerefMut},
    str::FromStr,
};
use embedded_hal::delay::DelayNs;

/// 64-bit ROM code: family code, 48-bit serial number, CRC-8 of the first seven bytes
#[derive(Debug, Clone, Copy, PartialOrd, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Address {
    raw: [u8; Self::BYTES as usize],
}

impl Default for Address {
    fn default() -> Self {
        Self::from([0; Self::BYTES as usize])
    }
}

impl From<[u8; Self::BYTES as usize]> for Address {
    fn from(raw: [u8; Self::BYTES as usize]) -> Self {
        Address { raw }
    }
}

impl From<Address> for [u8; Address::BYTES as usize] {
    fn from(addr: Address) -> [u8; Address::BYTES as usize] {
        addr.raw
    }
}

impl Deref for Address {
    type Target = [u8; Self::BYTES as usize];

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl DerefMut for Address {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.raw
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        self.deref() as _
    }
}

impl AsMut<[u8]> for Address {
    fn as_mut(&mut self) -> &mut [u8] {
        self.deref_mut() as _
    }
}

impl Address {
    /// The length of device address in bytes
    pub const BYTES: u8 = 8;

    /// The length of device address in bits
    pub const BITS: u8 = Self::BYTES * 8;

    pub const fn from_bytes(raw: [u8; Self::BYTES as usize]) -> Self {
        Address { raw }
    }

    /// Builds a ROM code from family and serial, appending the CRC byte
    pub fn new(family_code: u8, serial: [u8; 6]) -> Self {
        let mut raw = [0u8; Self::BYTES as usize];
        raw[0] = family_code;
        raw[1..7].copy_from_slice(&serial);
        raw[7] = crc::crc8(0, &raw[..7]);
        Address { raw }
    }

    pub fn family_code(&self) -> u8 {
        self[0]
    }

    pub fn serial(&self) -> [u8; 6] {
        let mut serial = [0u8; 6];
        serial.copy_from_slice(&self[1..7]);
        serial
    }

    pub fn crc(&self) -> u8 {
        self[7]
    }

    /// An all-zero code is never sent by a device
    pub fn is_unused(&self) -> bool {
        self.raw.iter().all(|b| *b == 0)
    }

    pub fn is_valid(&self) -> bool {
        !self.is_unused() && crc::crc8_check(self.as_ref())
    }

    pub fn ensure_correct_crc8<E: Debug>(&self) -> Result<(), Error<E>> {
        let computed = crc::crc8(0, &self[..7]);
        if computed != self.crc() {
            Err(Error::CrcMismatch(computed, self.crc()))
        } else {
            Ok(())
        }
    }
}

/// Error type
#[derive(Debug, PartialEq, Eq)]
pub enum AddressError {
    NotEnough,
    Invalid,
}

fn hex_to_u8(c: char) -> Option<u8> {
    c.to_digit(16).map(|d| d as u8)
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut addr = Address::default();
        let mut chars = s.chars().filter(|c| !c.is_whitespace() && *c != ':');

        for i in 0..Self::BYTES as usize {
            match (chars.next(), chars.next()) {
                (Some(h), Some(l)) => match (hex_to_u8(h), hex_to_u8(l)) {
                    (Some(h), Some(l)) => {
                        addr[i] = (h << 4) | l;
                    }
                    _ => return Err(AddressError::Invalid),
                },
                _ => return Err(AddressError::NotEnough),
            }
        }

        Ok(addr)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self[0], self[1], self[2], self[3], self[4], self[5], self[6], self[7],
        )
    }
}

impl Address {
    /// Reads the ROM code of the only device on the bus.
    ///
    /// With more than one device every one of them answers at once and the
    /// result is the wired-AND of their codes, which fails the CRC check.
    /// An all-zero code passes the CRC but means the line was held low for
    /// the whole read, reported as [`Error::WireFault`].
    pub fn read_single<B: OneWire>(
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<Self, Error<B::PortError>> {
        bus.reset(delay)?;
        bus.write_command(delay, Command::ReadRom)?;
        let address = bus.read_rom_code(delay)?;
        if address.is_unused() {
            return Err(Error::WireFault);
        }
        address.ensure_correct_crc8::<B::PortError>()?;
        Ok(address)
    }
}
