//! Dallas/Maxim CRC-8 (X^8 + X^5 + X^4 + 1), processed LSB first.
//!
//! Both the ROM code and the DS18B20 scratchpad end in a CRC byte over the
//! preceding bytes, so folding the whole buffer including that byte yields 0
//! when nothing was corrupted on the wire.

/// Reflected form of polynomial 0x31.
const POLYNOMIAL: u8 = 0x8C;

/// Folds a single bit into the running CRC.
#[inline]
pub fn crc8_bit(crc: u8, bit: bool) -> u8 {
    let mix = (crc & 0x01) ^ bit as u8;
    let crc = crc >> 1;
    if mix != 0x00 {
        crc ^ POLYNOMIAL
    } else {
        crc
    }
}

/// Folds one byte into the running CRC, least significant bit first.
pub fn crc8_byte(crc: u8, byte: u8) -> u8 {
    let mut crc = crc;
    let mut byte = byte;
    for _ in 0..8 {
        crc = crc8_bit(crc, byte & 0x01 != 0);
        byte >>= 1;
    }
    crc
}

/// Folds a buffer into the running CRC.
pub fn crc8(crc: u8, data: &[u8]) -> u8 {
    data.iter().fold(crc, |crc, byte| crc8_byte(crc, *byte))
}

pub fn compute_partial_crc8(crc: u8, data: &[u8]) -> u8 {
    crc8(crc, data)
}

/// Whether `data` ends in the CRC of everything before it.
pub fn crc8_check(data: &[u8]) -> bool {
    !data.is_empty() && crc8(0, data) == 0
}
