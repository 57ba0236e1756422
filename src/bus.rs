use embedded_hal::i2c as hal_i2c;

use crate::Error;

/// Blanket trait for types implementing `i2c::I2c`
pub trait I2cBus: hal_i2c::I2c {
    /// Error reported by the bus implementation.
    type BusError: From<<Self as hal_i2c::ErrorType>::Error>;
}

impl<T, E> I2cBus for T
where
    T: hal_i2c::I2c<Error = E>,
{
    type BusError = E;
}

/// The CH423 has no register pointer: every command is its own I2C address
/// and carries exactly one data byte.
pub(crate) trait I2cExt {
    type BusError;

    fn write_cmd<C: Into<u8>>(&mut self, cmd: C, value: u8) -> Result<(), Error<Self::BusError>>;
    fn read_cmd<C: Into<u8>>(&mut self, cmd: C) -> Result<u8, Error<Self::BusError>>;
}

impl<I2C: I2cBus> I2cExt for I2C {
    type BusError = I2C::BusError;

    fn write_cmd<C: Into<u8>>(&mut self, cmd: C, value: u8) -> Result<(), Error<Self::BusError>> {
        self.write(cmd.into(), &[value])
            .map_err(|e| Error::Bus(e.into()))
    }

    fn read_cmd<C: Into<u8>>(&mut self, cmd: C) -> Result<u8, Error<Self::BusError>> {
        let mut buf = [0x00];
        self.read(cmd.into(), &mut buf)
            .map_err(|e| Error::Bus(e.into()))?;
        Ok(buf[0])
    }
}
