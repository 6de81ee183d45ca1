//! ADS1148 RTD front end.
//!
//! Two ratiometric RTD inputs. START is held high so the chip converts
//! continuously; the SYNC at the end of every reconfiguration restarts the
//! conversion and DRDY signals its result.
use arbitrary_int::{u2, u3, u4};
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};

use ads1148::{
    rate, Ads1148, Config, Gain, Idac0, Idac1, IdacCurrent, Mux0, Mux1, Sys0,
};

use super::{Adc, Channel, State};
use crate::{
    acquisition::{MeasurementQuery, MeasurementResponse, Status},
    sensor::ProbeType,
    time::{elapsed, Clock},
    Error,
};

pub const NUM_CHANNELS: usize = 2;

/// Register set written at power-up and used as the base of every
/// per-query configuration.
pub fn default_config() -> Config {
    Config {
        mux0: Mux0::new_with_raw_value(0)
            .with_mux_sp(u3::new(1))
            .with_mux_sn(u3::new(2)),
        vbias: 0,
        // internal oscillator, reference on, REF0 pair
        mux1: Mux1::new_with_raw_value(0).with_vrefcon(u2::new(1)),
        sys0: Sys0::new_with_raw_value(0)
            .with_pga(Gain::G4)
            .with_dr(rate::SPS_20),
        idac0: Idac0::new_with_raw_value(0).with_imag(IdacCurrent::Ua1000),
        idac1: Idac1::new_with_raw_value(0)
            .with_i1dir(u4::new(0))
            .with_i2dir(u4::new(3)),
    }
}

/// Register set for a query.
///
/// Channel 0 measures AIN1/AIN2 with excitation on AIN0/AIN3, channel 1
/// AIN5/AIN6 with excitation on AIN4/AIN7.
pub fn configuration(query: &MeasurementQuery) -> Result<Config, Error> {
    let mut config = default_config();
    match query.adc_channel_id {
        0 => {}
        1 => {
            config.mux0 = config
                .mux0
                .with_mux_sp(u3::new(5))
                .with_mux_sn(u3::new(6));
            config.idac1 = config
                .idac1
                .with_i1dir(u4::new(4))
                .with_i2dir(u4::new(7));
        }
        ch => return Err(Error::InvalidChannel(ch)),
    }
    let (gain, current) = match query.probe {
        ProbeType::Pt100 => (Gain::G16, IdacCurrent::Ua500),
        ProbeType::Pt1000 => (Gain::G2, IdacCurrent::Ua250),
        ProbeType::Ntc => (Gain::G1, IdacCurrent::Ua1000),
    };
    config.sys0 = config.sys0.with_pga(gain);
    config.idac0 = config.idac0.with_imag(current);
    if query.attributes.chopped {
        config.idac1 = config.idac1.chopped();
    }
    Ok(config)
}

pub struct Ads1148Adc<D, P, I, C> {
    id: u8,
    start: P,
    reset: P,
    drdy: I,
    clock: C,
    device: Option<Ads1148<D>>,
    channels: [Channel<Ads1148<D>>; NUM_CHANNELS],
    state: State,
    query: Option<MeasurementQuery>,
}

impl<D, P, I, C> Ads1148Adc<D, P, I, C>
where
    D: SpiDevice<u8>,
    P: OutputPin,
    I: InputPin,
    C: Clock,
{
    pub fn new(id: u8, start: P, reset: P, drdy: I, clock: C) -> Self {
        Self {
            id,
            start,
            reset,
            drdy,
            clock,
            device: None,
            channels: core::array::from_fn(|i| Channel::new(i as u8)),
            state: State::Idle,
            query: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.device.is_some()
    }

    /// Power-up sequence: hardware reset, RESET command, leave continuous
    /// read mode, default registers and SYNC.
    pub fn initialize(
        &mut self,
        mut device: impl FnMut() -> D,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error> {
        self.start.set_high().map_err(Error::pin)?;
        delay.delay_ms(1);
        self.reset.set_low().map_err(Error::pin)?;
        delay.delay_ms(10);
        self.reset.set_high().map_err(Error::pin)?;

        let mut dev = Ads1148::new(device());
        dev.reset()?;
        delay.delay_ms(10);
        dev.stop_continuous()?;
        delay.delay_ms(5);
        dev.configure(&default_config())?;

        for channel in self.channels.iter_mut() {
            channel.initialize(Ads1148::new(device()));
        }
        self.device = Some(dev);
        self.state = State::Idle;
        self.query = None;
        log::info!("ADS1148 {} initialized", self.id);
        Ok(())
    }
}

impl<D, P, I, C> Adc for Ads1148Adc<D, P, I, C>
where
    D: SpiDevice<u8>,
    P: OutputPin,
    I: InputPin,
    C: Clock,
{
    fn measure(
        &mut self,
        incoming: &MeasurementQuery,
    ) -> Result<MeasurementResponse, Error> {
        let Some(device) = self.device.as_mut() else {
            return Err(Error::NotInitialized);
        };
        if incoming.adc_id != self.id {
            return Err(Error::InvalidAdc(incoming.adc_id));
        }
        if incoming.num_of_readings != 1 {
            log::warn!(
                "ADS1148 {}: refusing {} readings",
                self.id,
                incoming.num_of_readings
            );
            return Ok(MeasurementResponse::refused(
                "ADS1148 takes exactly one reading per query",
            ));
        }

        let Some(query) = self.query else {
            device.configure(&configuration(incoming)?)?;
            self.query = Some(*incoming);
            self.state = State::Waiting {
                since: self.clock.now(),
            };
            log::debug!(
                "ADS1148 {}: configured channel {}",
                self.id,
                incoming.adc_channel_id
            );
            return Ok(MeasurementResponse::new(*incoming, Status::Accept));
        };

        if self.drdy.is_low().map_err(Error::pin)? {
            let readings = self.channels[query.adc_channel_id as usize]
                .measure(query.num_of_readings)?;
            if let State::Waiting { since } = self.state {
                log::trace!(
                    "ADS1148 {}: conversion took {} ms",
                    self.id,
                    elapsed(self.clock.now(), since).to_millis()
                );
            }
            self.query = None;
            self.state = State::Idle;
            return Ok(MeasurementResponse::data_ready(query, readings));
        }

        Ok(MeasurementResponse::new(query, Status::WaitingForConversion))
    }

    fn query_in_progress(&self) -> Option<&MeasurementQuery> {
        self.query.as_ref()
    }
}
