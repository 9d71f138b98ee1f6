use crate::{Device, Error, OneWire};
use embedded_hal::delay::DelayNs;

pub trait Sensor: Device {
    /// returns the milliseconds required to wait until the measurement finished
    fn start_measurement<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<u32, Error<B::PortError>>;

    /// returns the measured value, refusing data that failed its checksum
    fn read_measurement<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<f32, Error<B::PortError>>;

    fn read_measurement_raw<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<i16, Error<B::PortError>>;

    /// start, wait, read
    fn measure<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<f32, Error<B::PortError>> {
        let wait_ms = self.start_measurement(bus, delay)?;
        delay.delay_ms(wait_ms);
        self.read_measurement(bus, delay)
    }
}
