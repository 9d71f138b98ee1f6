//! Byte-level stand-in for a single DS18B20 on a bus, for host tests.
//!
//! The simulator follows the ROM/function command sequence the real device
//! expects and records every slot on the wire. Any bit or byte slot issued
//! after a reset that saw no presence pulse panics the test.

use crate::{crc, Address, Error, OneWire};
use embedded_hal::delay::DelayNs;
use std::vec::Vec;

/// One recorded bus event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
    Reset(bool),
    Write(u8),
    Read(u8),
    WriteBit(bool),
    ReadBit(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimFault;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Rom,
    Match { index: usize, matched: bool },
    Function,
    ReadRom(usize),
    ReadScratchpad(usize),
    WriteScratchpad(usize),
    PowerSupply,
    Done,
}

pub struct SimBus {
    present: bool,
    parasite: bool,
    rom: Address,
    scratchpad: [u8; 9],
    ticks: i16,
    state: State,
    silenced: bool,
    corrupt_reads: usize,
    fail_reads: bool,
    conversions: usize,
    log: Vec<Wire>,
}

impl SimBus {
    pub const ROM: Address = Address::from_bytes([0x28, 0xff, 0x64, 0x1e, 0x83, 0x16, 0x03, 0x49]);

    /// Scratchpad right after power-up: 85 degC, TH 75, TL 70, 12 bit
    pub const POWER_ON: [u8; 8] = [0x50, 0x05, 0x4b, 0x46, 0x7f, 0xff, 0x0c, 0x10];

    pub fn new() -> Self {
        let mut scratchpad = [0u8; 9];
        scratchpad[..8].copy_from_slice(&Self::POWER_ON);
        scratchpad[8] = crc::crc8(0, &Self::POWER_ON);
        SimBus {
            present: true,
            parasite: false,
            rom: Self::ROM,
            scratchpad,
            ticks: 0x0191,
            state: State::Idle,
            silenced: false,
            corrupt_reads: 0,
            fail_reads: false,
            conversions: 0,
            log: Vec::new(),
        }
    }

    pub fn absent() -> Self {
        SimBus {
            present: false,
            ..Self::new()
        }
    }

    pub fn with_rom(mut self, rom: Address) -> Self {
        self.rom = rom;
        self
    }

    /// Temperature the next conversion measures, in 1/16 degC
    pub fn with_ticks(mut self, ticks: i16) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn with_parasite(mut self, parasite: bool) -> Self {
        self.parasite = parasite;
        self
    }

    /// Flips a temperature bit in the next `count` scratchpad reads
    pub fn with_corrupted_reads(mut self, count: usize) -> Self {
        self.corrupt_reads = count;
        self
    }

    pub fn with_failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }

    pub fn log(&self) -> &[Wire] {
        &self.log
    }

    pub fn scratchpad(&self) -> &[u8; 9] {
        &self.scratchpad
    }

    pub fn conversions(&self) -> usize {
        self.conversions
    }

    fn resolution_bits(&self) -> u8 {
        ((self.scratchpad[4] >> 5) & 0x03) + 9
    }

    fn seal(&mut self) {
        self.scratchpad[8] = crc::crc8(0, &self.scratchpad[..8]);
    }

    fn convert(&mut self) {
        // bits below the configured resolution are undefined, fill them with noise
        let undefined = (1u16 << (12 - self.resolution_bits())) - 1;
        let raw = self.ticks as u16 | undefined;
        let [lsb, msb] = raw.to_le_bytes();
        self.scratchpad[0] = lsb;
        self.scratchpad[1] = msb;
        self.scratchpad[6] = 0x10 - (lsb & 0x0f);
        self.seal();
        self.conversions += 1;
    }

    fn check_traffic(&self) {
        if self.silenced {
            panic!("bus slot issued after a reset without presence");
        }
    }
}

impl OneWire for SimBus {
    type PortError = SimFault;

    fn reset_presence(&mut self, _delay: &mut impl DelayNs) -> Result<bool, Error<SimFault>> {
        self.log.push(Wire::Reset(self.present));
        self.silenced = !self.present;
        self.state = if self.present { State::Rom } else { State::Idle };
        Ok(self.present)
    }

    fn write_bit(&mut self, _delay: &mut impl DelayNs, high: bool) -> Result<(), Error<SimFault>> {
        self.check_traffic();
        self.log.push(Wire::WriteBit(high));
        Ok(())
    }

    fn read_bit(&mut self, _delay: &mut impl DelayNs) -> Result<bool, Error<SimFault>> {
        self.check_traffic();
        let bit = match self.state {
            // parasite powered devices pull the slot low
            State::PowerSupply => !self.parasite,
            _ => true,
        };
        self.log.push(Wire::ReadBit(bit));
        Ok(bit)
    }

    fn write_byte(&mut self, _delay: &mut impl DelayNs, byte: u8) -> Result<(), Error<SimFault>> {
        self.check_traffic();
        self.log.push(Wire::Write(byte));
        self.state = match self.state {
            State::Rom => match byte {
                0xCC => State::Function,
                0x55 => State::Match {
                    index: 0,
                    matched: true,
                },
                0x33 => State::ReadRom(0),
                _ => State::Done,
            },
            State::Match { index, matched } => {
                let matched = matched && self.rom[index] == byte;
                if index + 1 < Address::BYTES as usize {
                    State::Match {
                        index: index + 1,
                        matched,
                    }
                } else if matched {
                    State::Function
                } else {
                    State::Done
                }
            }
            State::Function => match byte {
                0x44 => {
                    self.convert();
                    State::Done
                }
                0xBE => State::ReadScratchpad(0),
                0x4E => State::WriteScratchpad(0),
                0xB4 => State::PowerSupply,
                _ => State::Done,
            },
            State::WriteScratchpad(index) => {
                self.scratchpad[2 + index] = byte;
                self.seal();
                if index < 2 {
                    State::WriteScratchpad(index + 1)
                } else {
                    State::Done
                }
            }
            state => state,
        };
        Ok(())
    }

    fn read_byte(&mut self, _delay: &mut impl DelayNs) -> Result<u8, Error<SimFault>> {
        self.check_traffic();
        if self.fail_reads {
            return Err(Error::PortError(SimFault));
        }
        let (byte, state) = match self.state {
            State::ReadRom(index) if index < Address::BYTES as usize => {
                (self.rom[index], State::ReadRom(index + 1))
            }
            State::ReadScratchpad(index) if index < 9 => {
                let mut byte = self.scratchpad[index];
                if index == 0 && self.corrupt_reads > 0 {
                    byte ^= 0x02;
                }
                if index == 8 && self.corrupt_reads > 0 {
                    self.corrupt_reads -= 1;
                }
                (byte, State::ReadScratchpad(index + 1))
            }
            // nobody drives the line, the pull-up reads as ones
            state => (0xFF, state),
        };
        self.state = state;
        self.log.push(Wire::Read(byte));
        Ok(byte)
    }

    fn parasite_mode(&self) -> bool {
        self.parasite
    }
}
