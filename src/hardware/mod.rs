//! ADC drivers.
//!
//! Each driver advances one conversion per [`Adc::measure`] call without
//! blocking beyond its own SPI transactions. Chip select is handled by the
//! [`SpiDevice`](embedded_hal::spi::SpiDevice) implementations which release
//! it at the end of every transaction, also on error.
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};

use crate::{
    acquisition::{MeasurementQuery, MeasurementResponse},
    settings::AdcModel,
    time::{Clock, Instant},
    Error,
};

pub mod ads1148;
pub mod ads124s08;
pub mod channel;

pub use ads1148::Ads1148Adc;
pub use ads124s08::Ads124s08Adc;
pub use channel::{Channel, ResultRegister};

/// Uniform contract of the ADC drivers.
pub trait Adc {
    /// Advance the query in progress, or start `query` if there is none.
    ///
    /// While a query is in progress any other query is ignored and the
    /// response describes the one in progress.
    fn measure(
        &mut self,
        query: &MeasurementQuery,
    ) -> Result<MeasurementResponse, Error>;

    fn query_in_progress(&self) -> Option<&MeasurementQuery>;
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum State {
    Idle,
    /// Inputs reconfigured, analog front end settling.
    Configuring { since: Instant },
    /// Conversion running since `since`, waiting for DRDY.
    Waiting { since: Instant },
}

/// The ADC populating the board, chosen once at startup.
pub enum AnyAdc<D, P, I, C> {
    Ads1148(Ads1148Adc<D, P, I, C>),
    Ads124s08(Ads124s08Adc<D, P, I, C>),
}

impl<D, P, I, C> AnyAdc<D, P, I, C>
where
    D: SpiDevice<u8>,
    P: OutputPin,
    I: InputPin,
    C: Clock,
{
    pub fn new(
        model: AdcModel,
        id: u8,
        start: P,
        reset: P,
        drdy: I,
        clock: C,
    ) -> Self {
        match model {
            AdcModel::Ads1148 => {
                Self::Ads1148(Ads1148Adc::new(id, start, reset, drdy, clock))
            }
            AdcModel::Ads124s08 => Self::Ads124s08(Ads124s08Adc::new(
                id, start, reset, drdy, clock,
            )),
        }
    }

    /// Run the power-up sequence.
    ///
    /// `device` is called once for the register interface and once per input
    /// channel. All returned devices select the same chip.
    pub fn initialize(
        &mut self,
        device: impl FnMut() -> D,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error> {
        match self {
            Self::Ads1148(adc) => adc.initialize(device, delay),
            Self::Ads124s08(adc) => adc.initialize(device, delay),
        }
    }
}

impl<D, P, I, C> Adc for AnyAdc<D, P, I, C>
where
    D: SpiDevice<u8>,
    P: OutputPin,
    I: InputPin,
    C: Clock,
{
    fn measure(
        &mut self,
        query: &MeasurementQuery,
    ) -> Result<MeasurementResponse, Error> {
        match self {
            Self::Ads1148(adc) => adc.measure(query),
            Self::Ads124s08(adc) => adc.measure(query),
        }
    }

    fn query_in_progress(&self) -> Option<&MeasurementQuery> {
        match self {
            Self::Ads1148(adc) => adc.query_in_progress(),
            Self::Ads124s08(adc) => adc.query_in_progress(),
        }
    }
}

impl<D, P, I, C> From<Ads1148Adc<D, P, I, C>> for AnyAdc<D, P, I, C> {
    fn from(value: Ads1148Adc<D, P, I, C>) -> Self {
        Self::Ads1148(value)
    }
}

impl<D, P, I, C> From<Ads124s08Adc<D, P, I, C>> for AnyAdc<D, P, I, C> {
    fn from(value: Ads124s08Adc<D, P, I, C>) -> Self {
        Self::Ads124s08(value)
    }
}
