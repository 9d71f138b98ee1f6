use core::fmt::{Debug, Display, Formatter, Result as FmtResult};

/// Error type
#[derive(Debug, Clone, PartialEq)]
pub enum Error<E: Sized + Debug> {
    /// Wire not high before reset
    WireFault,
    /// No presence on wire
    NoPresence,
    /// Computed and received CRC-8 differ
    CrcMismatch(u8, u8),
    /// Expected and actual family code
    FamilyCodeMismatch(u8, u8),
    /// Resolution outside of 9..=12 bits
    InvalidResolution(u8),
    /// ROM read requested on a descriptor that shares the bus
    NotSolo,
    /// Scratchpad still holds the power-on value
    NotConfigured,
    PortError(E),
}

impl<E: Sized + Debug> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::PortError(e)
    }
}

/// Coarse error classes, used by callers to pick a recovery strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No device answered the reset pulse.
    DeviceAbsent,
    /// Data arrived but failed its CRC-8.
    ChecksumInvalid,
    /// The line or the pin driver misbehaved mid-transaction.
    TransportFailure,
    /// The caller asked for something the device cannot do.
    InvalidArgument,
    /// The device was read before any conversion took place.
    NotConfigured,
}

impl<E: Sized + Debug> Error<E> {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoPresence => ErrorKind::DeviceAbsent,
            Error::CrcMismatch(..) => ErrorKind::ChecksumInvalid,
            Error::WireFault | Error::PortError(_) => ErrorKind::TransportFailure,
            Error::FamilyCodeMismatch(..) | Error::InvalidResolution(_) | Error::NotSolo => {
                ErrorKind::InvalidArgument
            }
            Error::NotConfigured => ErrorKind::NotConfigured,
        }
    }

    /// Only checksum errors are worth retrying without re-initialising anything.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::ChecksumInvalid)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_str(match self {
            ErrorKind::DeviceAbsent => "device absent",
            ErrorKind::ChecksumInvalid => "checksum invalid",
            ErrorKind::TransportFailure => "transport failure",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::NotConfigured => "device not configured",
        })
    }
}

impl<E: Sized + Debug> Display for Error<E> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Error::WireFault => f.write_str("wire stuck low"),
            Error::NoPresence => f.write_str("no presence pulse"),
            Error::CrcMismatch(computed, received) => write!(
                f,
                "crc mismatch: computed {:02x}, received {:02x}",
                computed, received
            ),
            Error::FamilyCodeMismatch(expected, actual) => write!(
                f,
                "family code mismatch: expected {:02x}, got {:02x}",
                expected, actual
            ),
            Error::InvalidResolution(bits) => write!(f, "invalid resolution: {} bits", bits),
            Error::NotSolo => f.write_str("rom read requires a solo device"),
            Error::NotConfigured => f.write_str("power-on scratchpad, no conversion yet"),
            Error::PortError(e) => write!(f, "port error: {:?}", e),
        }
    }
}
