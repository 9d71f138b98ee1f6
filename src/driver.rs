use crate::{Error, IoWire, OneWire};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use log::trace;

/// Slot timings in microseconds, standard speed by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub reset_low_us: u32,
    /// Number of line samples taken right after releasing the reset pulse
    pub presence_polls: u8,
    pub presence_poll_us: u32,
    pub reset_recovery_us: u32,
    pub write_one_low_us: u32,
    pub write_one_recovery_us: u32,
    pub write_zero_low_us: u32,
    pub write_zero_recovery_us: u32,
    pub read_low_us: u32,
    /// Delay between releasing the line and sampling it, must end within 15us of the falling edge
    pub read_sample_us: u32,
    pub read_recovery_us: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            reset_low_us: 480,
            presence_polls: 7,
            presence_poll_us: 10,
            reset_recovery_us: 410,
            write_one_low_us: 10,
            write_one_recovery_us: 55,
            write_zero_low_us: 65,
            write_zero_recovery_us: 5,
            read_low_us: 3,
            read_sample_us: 10,
            read_recovery_us: 53,
        }
    }
}

/// Polls the idle line this many times, 2us apart, before giving up on a reset
const WIRE_HIGH_POLLS: u16 = 125;

/// Bit-banged bus master over one open-drain line.
///
/// Every reset pulse and bit slot runs inside a critical section so that
/// another task or interrupt cannot stretch it past the protocol windows.
pub struct Driver<W: IoWire> {
    io_wire: W,
    timing: Timing,
    pub(crate) parasite_mode: bool,
}

impl<E: Debug, W: IoWire<Error = E>> Driver<W> {
    pub fn new(io_wire: W, parasite_mode: bool) -> Self {
        Driver {
            io_wire,
            timing: Timing::default(),
            parasite_mode,
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Gives the line back, ending the bus lifetime
    pub fn into_inner(self) -> W {
        self.io_wire
    }

    fn ensure_wire_high(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        for _ in 0..WIRE_HIGH_POLLS {
            if self.io_wire.is_high()? {
                return Ok(());
            }
            delay.delay_us(2);
        }
        Err(Error::WireFault)
    }

    /// Pulls the line low for `low_us`, releases it and optionally samples it
    /// `sample_us` later, all without being preempted.
    #[inline(always)]
    fn slot(
        &mut self,
        delay: &mut impl DelayNs,
        low_us: u32,
        sample_us: Option<u32>,
    ) -> Result<bool, E> {
        let io_wire = &mut self.io_wire;
        critical_section::with(|_| -> Result<bool, E> {
            io_wire.pull_low()?;
            delay.delay_us(low_us);
            io_wire.release()?;
            match sample_us {
                Some(us) => {
                    delay.delay_us(us);
                    io_wire.is_high()
                }
                None => Ok(true),
            }
        })
    }
}

impl<E: Debug, W: IoWire<Error = E>> OneWire for Driver<W> {
    type PortError = E;

    /// Performs a reset and listens for a presence pulse
    /// Returns Err(WireFault) if the wire seems to be shortened,
    /// Ok(true) if presence pulse has been received and Ok(false)
    /// if no other device was detected but the wire seems to be ok
    fn reset_presence(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<E>> {
        self.io_wire.release()?;
        self.ensure_wire_high(delay)?;

        let timing = self.timing;
        let io_wire = &mut self.io_wire;
        let presence = critical_section::with(|_| -> Result<bool, E> {
            io_wire.pull_low()?;
            delay.delay_us(timing.reset_low_us);
            io_wire.release()?;

            let mut presence = false;
            for _ in 0..timing.presence_polls {
                delay.delay_us(timing.presence_poll_us);
                presence |= io_wire.is_low()?;
            }
            Ok(presence)
        })?;
        delay.delay_us(timing.reset_recovery_us);

        trace!("reset, presence: {}", presence);
        Ok(presence)
    }

    fn write_bit(&mut self, delay: &mut impl DelayNs, high: bool) -> Result<(), Error<E>> {
        let (low_us, recovery_us) = if high {
            (self.timing.write_one_low_us, self.timing.write_one_recovery_us)
        } else {
            (self.timing.write_zero_low_us, self.timing.write_zero_recovery_us)
        };
        self.slot(delay, low_us, None)?;
        delay.delay_us(recovery_us);
        Ok(())
    }

    fn read_bit(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<E>> {
        let timing = self.timing;
        let bit = self.slot(delay, timing.read_low_us, Some(timing.read_sample_us))?;
        delay.delay_us(timing.read_recovery_us);
        Ok(bit)
    }

    fn write_byte(&mut self, delay: &mut impl DelayNs, byte: u8) -> Result<(), Error<E>> {
        let mut byte = byte;
        for _ in 0..8 {
            self.write_bit(delay, (byte & 0x01) == 0x01)?;
            byte >>= 1;
        }
        Ok(())
    }

    fn read_byte(&mut self, delay: &mut impl DelayNs) -> Result<u8, Error<E>> {
        let mut byte = 0_u8;
        for _ in 0..8 {
            byte >>= 1;
            if self.read_bit(delay)? {
                byte |= 0x80;
            }
        }
        Ok(byte)
    }

    fn parasite_mode(&self) -> bool {
        self.parasite_mode
    }
}
