use core::fmt;

use embedded_hal::digital as hal_digital;

/// Errors reported by the CH423 driver.
///
/// Range errors are raised before any bus transaction takes place, so a call
/// failing with [`Error::InvalidPinIndex`] or [`Error::InvalidLevelValue`] has
/// had no effect on either the chip or the driver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Pin index outside the range of the addressed group.
    InvalidPinIndex(u8),
    /// Level does not fit the register(s) it is written to.
    InvalidLevelValue(u32),
    /// The underlying I2C transaction failed.
    Bus(E),
}

impl<E> Error<E> {
    /// The transport error, if this is a bus failure.
    pub fn bus_error(&self) -> Option<&E> {
        match self {
            Error::Bus(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPinIndex(pin) => write!(f, "pin index {} out of range", pin),
            Error::InvalidLevelValue(level) => write!(f, "level {:#x} out of range", level),
            Error::Bus(e) => write!(f, "i2c bus error: {:?}", e),
        }
    }
}

impl<E: fmt::Debug> hal_digital::Error for Error<E> {
    fn kind(&self) -> hal_digital::ErrorKind {
        hal_digital::ErrorKind::Other
    }
}
