use embedded_hal::spi::SpiDevice;

use crate::{
    acquisition::{Readings, MAX_READINGS},
    Error,
};

/// The conversion result register of a chip, read through one SPI device.
pub trait ResultRegister {
    fn read_result(&mut self) -> Result<i32, Error>;
}

impl<B: SpiDevice<u8>> ResultRegister for ads124s08::Ads124s08<B> {
    fn read_result(&mut self) -> Result<i32, Error> {
        Ok(self.read_data()?)
    }
}

impl<B: SpiDevice<u8>> ResultRegister for ads1148::Ads1148<B> {
    fn read_result(&mut self) -> Result<i32, Error> {
        Ok(self.read_data()?)
    }
}

/// One analog input of an ADC.
///
/// Unusable until [`Channel::initialize`] hands it its SPI device.
#[derive(Debug)]
pub struct Channel<R> {
    id: u8,
    register: Option<R>,
}

impl<R: ResultRegister> Channel<R> {
    pub const fn new(id: u8) -> Self {
        Self { id, register: None }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn initialize(&mut self, register: R) {
        self.register = Some(register);
    }

    pub fn is_initialized(&self) -> bool {
        self.register.is_some()
    }

    /// Read the result register `n` times.
    pub fn measure(&mut self, n: u32) -> Result<Readings, Error> {
        let register = self
            .register
            .as_mut()
            .ok_or(Error::ChannelNotInitialized(self.id))?;
        if n as usize > MAX_READINGS {
            return Err(Error::TooManyReadings(n));
        }
        let mut readings = Readings::new();
        for _ in 0..n {
            readings
                .push(register.read_result()?)
                .map_err(|_| Error::TooManyReadings(n))?;
        }
        Ok(readings)
    }
}
