use crate::{Address, Command, Error, OpCode};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;

/// Transactions on a OneWire bus.
///
/// Implementors provide the reset and bit/byte slots; the ROM-level
/// sequencing on top of them is shared. Nothing here checks that a reset
/// saw a device before bytes are clocked out: callers must look at the
/// presence flag first, as [`crate::Device::address_device`] does.
pub trait OneWire {
    type PortError: Debug;

    /// Sends a reset pulse, `Ok(false)` if no device answered with a presence pulse
    fn reset_presence(&mut self, delay: &mut impl DelayNs)
        -> Result<bool, Error<Self::PortError>>;

    fn write_bit(
        &mut self,
        delay: &mut impl DelayNs,
        high: bool,
    ) -> Result<(), Error<Self::PortError>>;

    fn read_bit(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<Self::PortError>>;

    /// Writes eight bits, least significant first
    fn write_byte(&mut self, delay: &mut impl DelayNs, byte: u8)
        -> Result<(), Error<Self::PortError>>;

    /// Reads eight bits, least significant first
    fn read_byte(&mut self, delay: &mut impl DelayNs) -> Result<u8, Error<Self::PortError>>;

    /// Whether devices on this bus draw power from the data line
    fn parasite_mode(&self) -> bool;

    /// Like [`OneWire::reset_presence`] but treats a missing device as an error
    fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<Self::PortError>> {
        if self.reset_presence(delay)? {
            Ok(())
        } else {
            Err(Error::NoPresence)
        }
    }

    fn write_command(
        &mut self,
        delay: &mut impl DelayNs,
        cmd: impl OpCode,
    ) -> Result<(), Error<Self::PortError>> {
        self.write_byte(delay, cmd.op_code())
    }

    fn write_bytes(
        &mut self,
        delay: &mut impl DelayNs,
        bytes: &[u8],
    ) -> Result<(), Error<Self::PortError>> {
        for b in bytes {
            self.write_byte(delay, *b)?;
        }
        Ok(())
    }

    fn read_bytes(
        &mut self,
        delay: &mut impl DelayNs,
        dst: &mut [u8],
    ) -> Result<(), Error<Self::PortError>> {
        for d in dst {
            *d = self.read_byte(delay)?;
        }
        Ok(())
    }

    fn write_rom_code(
        &mut self,
        delay: &mut impl DelayNs,
        addr: &Address,
    ) -> Result<(), Error<Self::PortError>> {
        self.write_bytes(delay, addr.as_ref())
    }

    /// Reads the 8 raw ROM bytes, the CRC byte is not checked here
    fn read_rom_code(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> Result<Address, Error<Self::PortError>> {
        let mut address = Address::default();
        self.read_bytes(delay, address.as_mut())?;
        Ok(address)
    }

    /// Addresses every device, must follow a reset
    fn skip(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<Self::PortError>> {
        self.write_command(delay, Command::SkipRom)
    }

    /// Addresses the device with the given ROM code, must follow a reset
    fn select(
        &mut self,
        delay: &mut impl DelayNs,
        addr: &Address,
    ) -> Result<(), Error<Self::PortError>> {
        self.write_command(delay, Command::MatchRom)?;
        self.write_rom_code(delay, addr)
    }

    fn reset_skip_write_only(
        &mut self,
        delay: &mut impl DelayNs,
        write: &[u8],
    ) -> Result<(), Error<Self::PortError>> {
        self.reset(delay)?;
        self.skip(delay)?;
        self.write_bytes(delay, write)
    }

    fn reset_write_read(
        &mut self,
        delay: &mut impl DelayNs,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Error<Self::PortError>> {
        self.reset(delay)?;
        self.write_bytes(delay, write)?;
        self.read_bytes(delay, read)
    }
}
