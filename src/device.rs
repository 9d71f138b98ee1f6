use crate::{Address, Error, OneWire};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use log::error;

/// How a device is picked out on the bus before each function command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// The device is alone on the bus, Skip ROM reaches it
    Solo,
    /// The bus is shared, Match ROM with this code selects the device
    Rom(Address),
}

impl Addressing {
    pub fn is_solo(&self) -> bool {
        matches!(self, Addressing::Solo)
    }

    pub fn rom_code(&self) -> Option<&Address> {
        match self {
            Addressing::Solo => None,
            Addressing::Rom(address) => Some(address),
        }
    }
}

impl From<Address> for Addressing {
    fn from(address: Address) -> Self {
        Addressing::Rom(address)
    }
}

/// Generic device interface
pub trait Device: Sized {
    /// Device family code
    const FAMILY_CODE: u8;

    /// Get device addressing mode
    fn addressing(&self) -> &Addressing;

    /// Instantiate device using addressing without checks
    fn from_addressing_unchecked(addressing: Addressing) -> Self;

    /// Instantiate device from ROM code, rejecting other families
    fn from_address<E: Sized + Debug>(address: Address) -> Result<Self, Error<E>> {
        if address.family_code() != Self::FAMILY_CODE {
            Err(Error::FamilyCodeMismatch(
                Self::FAMILY_CODE,
                address.family_code(),
            ))
        } else {
            Ok(Self::from_addressing_unchecked(Addressing::Rom(address)))
        }
    }

    /// Reset, then Skip ROM or Match ROM depending on the addressing mode.
    ///
    /// Returns `Ok(false)` without touching the bus any further when no
    /// device answered the reset.
    fn address_device<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<bool, Error<B::PortError>> {
        if !bus.reset_presence(delay)? {
            error!("no device answered the reset pulse");
            return Ok(false);
        }
        match self.addressing() {
            Addressing::Solo => bus.skip(delay)?,
            Addressing::Rom(address) => bus.select(delay, address)?,
        }
        Ok(true)
    }
}
