pub trait OpCode {
    fn op_code(&self) -> u8;
}

/// ROM commands, issued right after a reset to pick the device(s) that
/// listen to the following function command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Address one device by its ROM code (8 bytes follow)
    MatchRom = 0x55,
    /// Address every device on the bus
    SkipRom = 0xCC,
    /// Ask the only device on the bus for its ROM code
    ReadRom = 0x33,
}

impl OpCode for Command {
    fn op_code(&self) -> u8 {
        *self as _
    }
}

impl OpCode for u8 {
    fn op_code(&self) -> u8 {
        *self
    }
}
