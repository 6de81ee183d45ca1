#![cfg_attr(not(test), no_std)]

use core::cell::RefCell;
use embedded_hal::digital::{ErrorType, OutputPin};

/// Chip select line of a single chip handed out to several SPI devices.
///
/// Each of the devices (the register interface and every input channel of an
/// ADC) owns a `SharedPin`, so each can bracket its own transactions while the
/// board has one physical CS wire per chip. Only one device drives the line
/// at a time since the bus is used sequentially.
pub struct SharedPin<'a, P> {
    cs: &'a RefCell<P>,
}

impl<'a, P> SharedPin<'a, P> {
    pub fn new(cs: &'a RefCell<P>) -> Self {
        Self { cs }
    }
}

impl<P: ErrorType> ErrorType for SharedPin<'_, P> {
    type Error = P::Error;
}

impl<P: OutputPin> OutputPin for SharedPin<'_, P> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        // assert
        self.cs.borrow_mut().set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        // deassert
        self.cs.borrow_mut().set_high()
    }
}
