use embedded_hal::digital::{Error, ErrorType, InputPin, OutputPin};

/// One open-drain line shared by every device on the bus.
///
/// The line idles high through the external pull-up; the master only ever
/// pulls it low or lets go.
pub trait IoWire {
    type Error: Error;

    /// Is the line high?
    fn is_high(&mut self) -> Result<bool, Self::Error>;

    /// Is the line low?
    fn is_low(&mut self) -> Result<bool, Self::Error>;

    /// Pulls the line low
    fn pull_low(&mut self) -> Result<(), Self::Error>;

    /// Stops driving the line so the pull-up (or a device) decides its level
    ///
    /// *NOTE* the line may still read low afterwards, e.g. while a device is
    /// answering with a presence pulse or a zero bit
    fn release(&mut self) -> Result<(), Self::Error>;
}

/// Single open-drain pin, both sensed and driven
impl<IO> IoWire for (IO,)
where
    IO: ErrorType + OutputPin + InputPin,
{
    type Error = IO::Error;

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }

    fn pull_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }
}

/// Separate sense and drive pins wired to the same line
impl<E, I, O> IoWire for (I, O)
where
    E: Error,
    I: ErrorType<Error = E> + InputPin,
    O: ErrorType<Error = E> + OutputPin,
{
    type Error = E;

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }

    fn pull_low(&mut self) -> Result<(), Self::Error> {
        self.1.set_low()
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.1.set_high()
    }
}
