//! Acquisition core of a three channel RTD temperature logger.
//!
//! A cooperative control loop calls [`acquisition::MeasurementController::run`]
//! once per tick. The controller picks a channel, hands a
//! [`acquisition::MeasurementQuery`] to the ADC driver owning it and feeds
//! finished conversions to the [`acquisition::MeasurementProcessor`], which
//! keeps a rolling window of raw codes per channel and converts their mean to
//! resistance and temperature.
#![cfg_attr(not(test), no_std)]

use embedded_hal::{digital, spi};

pub mod acquisition;
pub mod hardware;
pub mod sensor;
pub mod settings;
pub mod time;

#[cfg(test)]
pub mod testing;

pub use settings::{NUM_ADCS, NUM_CHANNELS};

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("ADC not initialized")]
    NotInitialized,
    #[error("ADC channel {0} not initialized")]
    ChannelNotInitialized(u8),
    #[error("Invalid ADC channel {0}")]
    InvalidChannel(u8),
    #[error("Invalid ADC {0}")]
    InvalidAdc(u8),
    #[error("Invalid channel {0}")]
    InvalidGlobalChannel(usize),
    #[error("Response without readings")]
    MissingReadings,
    #[error("Too many readings requested: {0}")]
    TooManyReadings(u32),
    #[error("SPI Error {0}")]
    Spi(spi::ErrorKind),
    #[error("Pin Error {0}")]
    Pin(digital::ErrorKind),
}

impl Error {
    pub(crate) fn pin<E: digital::Error>(e: E) -> Self {
        Self::Pin(e.kind())
    }
}

impl From<ads124s08::Error> for Error {
    fn from(value: ads124s08::Error) -> Self {
        match value {
            ads124s08::Error::Bus(kind) => Self::Spi(kind),
        }
    }
}

impl From<ads1148::Error> for Error {
    fn from(value: ads1148::Error) -> Self {
        match value {
            ads1148::Error::Bus(kind) => Self::Spi(kind),
        }
    }
}
