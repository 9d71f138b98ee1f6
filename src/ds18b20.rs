use byteorder::{ByteOrder, LittleEndian};
use embedded_hal::delay::DelayNs;
use log::{debug, error, trace, warn};

use crate::{Address, Addressing, Device, Error, Integrity, OneWire, OpCode, Scratchpad, Sensor};

#[derive(Clone, Copy, Debug)]
#[repr(u8)]
pub enum Command {
    Convert = 0x44,
    WriteScratchpad = 0x4e,
    ReadScratchpad = 0xBE,
    ReadPowerSupply = 0xB4,
}

impl OpCode for Command {
    fn op_code(&self) -> u8 {
        *self as _
    }
}

/// Conversion time at 12 bit, every bit less halves it
pub const MAX_CONVERSION_MS: u32 = 750;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Resolution {
    Bits9 = 9,
    Bits10 = 10,
    Bits11 = 11,
    Bits12 = 12,
}

impl Resolution {
    pub const ALL: [Resolution; 4] = [
        Resolution::Bits9,
        Resolution::Bits10,
        Resolution::Bits11,
        Resolution::Bits12,
    ];

    pub fn bits(&self) -> u8 {
        *self as u8
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            9 => Some(Resolution::Bits9),
            10 => Some(Resolution::Bits10),
            11 => Some(Resolution::Bits11),
            12 => Some(Resolution::Bits12),
            _ => None,
        }
    }

    /// Configuration register value, R1:R0 in bits 6:5, the low five bits read as ones
    pub fn config_byte(&self) -> u8 {
        (((self.bits() - 9) & 0x03) << 5) | 0x1F
    }

    pub fn from_config(config: u8) -> Self {
        match (config >> 5) & 0x03 {
            0 => Resolution::Bits9,
            1 => Resolution::Bits10,
            2 => Resolution::Bits11,
            _ => Resolution::Bits12,
        }
    }

    pub fn conversion_shift(&self) -> u8 {
        12 - self.bits()
    }

    pub fn conversion_time_ms(&self) -> u32 {
        MAX_CONVERSION_MS >> self.conversion_shift()
    }

    /// Clears the temperature LSB bits left undefined at this resolution
    pub fn lsb_mask(&self) -> u8 {
        !((1u8 << self.conversion_shift()) - 1)
    }
}

/// A decoded temperature together with the state of the read it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    /// Signed 1/16 degC steps, undefined low bits already cleared
    pub ticks: i16,
    pub resolution: Resolution,
    pub integrity: Integrity,
}

impl Reading {
    pub fn celsius(&self) -> f32 {
        ticks_to_celsius(self.ticks)
    }

    /// Integer degrees and ten-thousandths, see [`split_temp`]
    pub fn split(&self) -> (i16, i16) {
        split_temp(self.ticks)
    }
}

/// Masks the LSB per resolution and joins both bytes as two's complement ticks
pub fn decode_temperature(lsb: u8, msb: u8, resolution: Resolution) -> i16 {
    LittleEndian::read_i16(&[lsb & resolution.lsb_mask(), msb])
}

pub fn ticks_to_celsius(ticks: i16) -> f32 {
    ticks as f32 / 16_f32
}

/// Split raw ticks to two parts: integer and fraction N
/// Original value may be calculated as: integer + fraction/10000
pub fn split_temp(ticks: i16) -> (i16, i16) {
    let ticks = ticks as i32;
    if ticks >= 0 {
        ((ticks >> 4) as i16, ((ticks & 0xF) * 625) as i16)
    } else {
        let abs = -ticks;
        (-(abs >> 4) as i16, (-625 * (abs & 0xF)) as i16)
    }
}

/// DS18B20 temperature sensor on a (possibly shared) bus.
///
/// The descriptor never owns the bus; every operation borrows it, and
/// callers sharing one bus between tasks have to serialise the calls.
#[derive(Debug, Clone, Copy)]
pub struct Ds18b20 {
    addressing: Addressing,
    use_crc: bool,
    resolution: Option<Resolution>,
}

impl From<Ds18b20> for Addressing {
    fn from(device: Ds18b20) -> Self {
        device.addressing
    }
}

impl Ds18b20 {
    /// Descriptor with unknown resolution, see [`Ds18b20::init`]
    pub fn new(addressing: Addressing) -> Self {
        Ds18b20 {
            addressing,
            use_crc: false,
            resolution: None,
        }
    }

    pub fn solo() -> Self {
        Self::new(Addressing::Solo)
    }

    /// Creates the descriptor and probes its current resolution
    pub fn initialize<B: OneWire>(
        addressing: Addressing,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Self {
        let mut device = Self::new(addressing);
        device.init(bus, delay);
        device
    }

    /// Reads the configured resolution from the device. A failed probe
    /// leaves it unknown; later reads then report their own errors.
    pub fn init<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Option<Resolution> {
        self.resolution = match self.read_resolution(bus, delay) {
            Ok(resolution) => {
                debug!("probed resolution: {} bits", resolution.bits());
                Some(resolution)
            }
            Err(e) => {
                warn!("resolution probe failed: {}", e);
                None
            }
        };
        self.resolution
    }

    pub fn with_crc(mut self, use_crc: bool) -> Self {
        self.use_crc = use_crc;
        self
    }

    pub fn set_use_crc(&mut self, use_crc: bool) {
        self.use_crc = use_crc;
    }

    pub fn use_crc(&self) -> bool {
        self.use_crc
    }

    /// Last resolution probed or written, `None` until one succeeded
    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    fn select<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error<B::PortError>> {
        if self.address_device(bus, delay)? {
            Ok(())
        } else {
            Err(Error::NoPresence)
        }
    }

    /// Reads all 9 bytes. A CRC failure is reported through [`Integrity`],
    /// not as an error, so the caller decides whether to use the data.
    pub fn read_scratchpad<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<(Scratchpad, Integrity), Error<B::PortError>> {
        self.select(bus, delay)?;
        bus.write_command(delay, Command::ReadScratchpad)?;
        let mut raw = [0u8; Scratchpad::BYTES];
        bus.read_bytes(delay, &mut raw)?;
        let scratchpad = Scratchpad::from(raw);

        let integrity = if self.use_crc {
            let integrity = scratchpad.integrity();
            if let Integrity::Corrupted { computed, received } = integrity {
                error!(
                    "scratchpad crc mismatch: computed {:02x}, received {:02x}",
                    computed, received
                );
            }
            integrity
        } else {
            // closes the read transaction
            bus.reset_presence(delay)?;
            Integrity::Unchecked
        };
        trace!("scratchpad: {:02x?}", scratchpad.as_ref());
        Ok((scratchpad, integrity))
    }

    /// Writes the three host-writable bytes: TH, TL and configuration
    pub fn write_scratchpad<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        trigger_high: i8,
        trigger_low: i8,
        config: u8,
    ) -> Result<(), Error<B::PortError>> {
        self.select(bus, delay)?;
        bus.write_command(delay, Command::WriteScratchpad)?;
        bus.write_bytes(delay, &[trigger_high as u8, trigger_low as u8, config])
    }

    pub fn set_resolution<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        resolution: Resolution,
    ) -> Result<(), Error<B::PortError>> {
        // the alarm bytes are rewritten as read, a corrupted read is still the best we have
        let (scratchpad, integrity) = self.read_scratchpad(bus, delay)?;
        if integrity.is_corrupted() {
            warn!("rewriting alarm triggers from a corrupted scratchpad");
        }
        self.write_scratchpad(
            bus,
            delay,
            scratchpad.trigger_high(),
            scratchpad.trigger_low(),
            resolution.config_byte(),
        )?;
        self.resolution = Some(resolution);
        debug!("resolution set to {} bits", resolution.bits());
        Ok(())
    }

    /// Like [`Ds18b20::set_resolution`] for an untyped bit count
    pub fn set_resolution_bits<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        bits: u8,
    ) -> Result<(), Error<B::PortError>> {
        let resolution = Resolution::from_bits(bits).ok_or_else(|| {
            error!("invalid resolution: {} bits", bits);
            Error::InvalidResolution(bits)
        })?;
        self.set_resolution(bus, delay, resolution)
    }

    /// Changes the alarm triggers and keeps the configuration byte
    pub fn set_alarm_triggers<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        trigger_high: i8,
        trigger_low: i8,
    ) -> Result<(), Error<B::PortError>> {
        let (scratchpad, integrity) = self.read_scratchpad(bus, delay)?;
        integrity.ensure_not_corrupted::<B::PortError>()?;
        self.write_scratchpad(
            bus,
            delay,
            trigger_high,
            trigger_low,
            scratchpad.configuration(),
        )
    }

    pub fn read_resolution<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<Resolution, Error<B::PortError>> {
        let (scratchpad, _) = self.read_scratchpad(bus, delay)?;
        Ok(scratchpad.resolution())
    }

    /// Reads the ROM code of a solo device. Shared-bus descriptors get
    /// [`Error::NotSolo`] without any bus traffic, since every device
    /// would answer at once.
    pub fn read_rom<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<Address, Error<B::PortError>> {
        if !self.addressing.is_solo() {
            warn!("read_rom called on a descriptor that shares the bus");
            return Err(Error::NotSolo);
        }
        Address::read_single(bus, delay)
    }

    /// Starts a conversion without waiting for it
    pub fn trigger_conversion<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error<B::PortError>> {
        self.select(bus, delay)?;
        bus.write_command(delay, Command::Convert)
    }

    /// Starts a conversion on every device on the bus at once
    pub fn convert_all<B: OneWire>(
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error<B::PortError>> {
        bus.reset_skip_write_only(delay, &[Command::Convert.op_code()])?;
        if bus.parasite_mode() {
            trace!("parasite powered bus, line must stay high during conversion");
        }
        Ok(())
    }

    /// Worst-case conversion time for the current resolution, the 12 bit
    /// time while it is unknown
    pub fn conversion_time_ms(&self) -> u32 {
        self.resolution
            .map_or(MAX_CONVERSION_MS, |resolution| resolution.conversion_time_ms())
    }

    /// Blocks for the conversion time and returns it in milliseconds
    pub fn wait_for_conversion(&self, delay: &mut impl DelayNs) -> u32 {
        let wait_ms = self.conversion_time_ms();
        delay.delay_ms(wait_ms);
        wait_ms
    }

    pub fn read_temperature<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<Reading, Error<B::PortError>> {
        let (scratchpad, integrity) = self.read_scratchpad(bus, delay)?;
        if scratchpad.is_power_on_default() {
            warn!("read power-on value (85.0), device not configured");
            return Err(Error::NotConfigured);
        }
        let resolution = self
            .resolution
            .unwrap_or_else(|| scratchpad.resolution());
        let (lsb, msb) = scratchpad.temperature_bytes();
        Ok(Reading {
            ticks: decode_temperature(lsb, msb, resolution),
            resolution,
            integrity,
        })
    }

    /// Convert, wait and read in one blocking round trip
    pub fn convert_and_read_temperature<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<Reading, Error<B::PortError>> {
        self.trigger_conversion(bus, delay)?;
        self.wait_for_conversion(delay);
        self.read_temperature(bus, delay)
    }

    /// Whether any device on the bus runs on parasite power (it pulls the
    /// read slot low after Read Power Supply)
    pub fn check_parasitic_power<B: OneWire>(
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<bool, Error<B::PortError>> {
        bus.reset(delay)?;
        bus.skip(delay)?;
        bus.write_command(delay, Command::ReadPowerSupply)?;
        Ok(!bus.read_bit(delay)?)
    }
}

impl Device for Ds18b20 {
    const FAMILY_CODE: u8 = 0x28;

    fn addressing(&self) -> &Addressing {
        &self.addressing
    }

    fn from_addressing_unchecked(addressing: Addressing) -> Self {
        Self::new(addressing)
    }
}

impl Sensor for Ds18b20 {
    fn start_measurement<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<u32, Error<B::PortError>> {
        self.trigger_conversion(bus, delay)?;
        Ok(self.conversion_time_ms())
    }

    fn read_measurement<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<f32, Error<B::PortError>> {
        let reading = self.read_temperature(bus, delay)?;
        reading.integrity.ensure_not_corrupted::<B::PortError>()?;
        Ok(reading.celsius())
    }

    fn read_measurement_raw<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<i16, Error<B::PortError>> {
        self.read_temperature(bus, delay).map(|reading| reading.ticks)
    }
}
