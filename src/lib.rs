#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]

mod address;
mod bus;
mod command;
pub mod crc;
mod device;
mod driver;
#[cfg(feature = "ds18b20")]
pub mod ds18b20;
mod iowire;
#[cfg(feature = "monitor")]
pub mod monitor;
mod result;
#[cfg(feature = "ds18b20")]
mod scratchpad;
mod sensor;
#[cfg(test)]
mod sim;

pub use address::{Address, AddressError};
pub use bus::OneWire;
pub use command::{Command, OpCode};
pub use crc::compute_partial_crc8;
pub use device::{Addressing, Device};
pub use driver::{Driver, Timing};
pub use iowire::IoWire;
pub use result::{Error, ErrorKind};
#[cfg(feature = "ds18b20")]
pub use scratchpad::{Integrity, Scratchpad};
pub use sensor::Sensor;
