//! ADS124S08 RTD front end.
//!
//! Three ratiometric RTD inputs, each with its own pair of IDAC outputs.
//! The chip runs single shot conversions with global chop. After the input
//! multiplexer has been switched the reference and excitation need
//! [`SETTLE_TIME`] before a conversion is started with the START command.
use arbitrary_int::{u2, u4};
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};

use ads124s08::{
    rate, Ads124s08, Config, DataRate, Gain, IdacCurrent, IdacMag, IdacMux,
    InpMux, Pga, PgaEnable, Ref, Sys,
};

use super::{Adc, Channel, State};
use crate::{
    acquisition::{MeasurementQuery, MeasurementResponse, Status},
    sensor::ProbeType,
    time::{elapsed, Clock, Duration},
    Error,
};

pub const NUM_CHANNELS: usize = 3;

/// Minimum time between reconfiguration and START. Must be exceeded.
pub const SETTLE_TIME: Duration = Duration::millis(275);

/// Register block written at power-up and used as the base of every
/// per-query configuration.
pub fn default_config() -> Config {
    Config {
        inpmux: InpMux::new_with_raw_value(0)
            .with_muxp(u4::new(1))
            .with_muxn(u4::new(2)),
        pga: Pga::new_with_raw_value(0)
            .with_pga_en(PgaEnable::Enabled)
            .with_gain(Gain::G4),
        datarate: DataRate::new_with_raw_value(0)
            .with_global_chop(true)
            .with_single_shot(true)
            .with_low_latency(true)
            .with_dr(rate::SPS_10),
        // REF0 pair, buffered, internal reference always on
        reference: Ref::new_with_raw_value(0).with_refcon(u2::new(2)),
        idacmag: IdacMag::new_with_raw_value(0)
            .with_imag(IdacCurrent::Ua500.into()),
        idacmux: IdacMux::new_with_raw_value(0)
            .with_i1mux(u4::new(3))
            .with_i2mux(u4::new(0)),
        vbias: 0,
        sys: Sys::default(),
    }
}

/// Register block for a query: input pair of the channel, gain and
/// excitation of the probe.
///
/// Channel `n` measures AIN(4n+1)/AIN(4n+2) with excitation on AIN(4n+3)
/// and AIN(4n).
pub fn configuration(query: &MeasurementQuery) -> Result<Config, Error> {
    let ch = query.adc_channel_id;
    if ch as usize >= NUM_CHANNELS {
        return Err(Error::InvalidChannel(ch));
    }
    let base = 4 * ch;
    let mut config = default_config();
    config.inpmux = config
        .inpmux
        .with_muxp(u4::new(base + 1))
        .with_muxn(u4::new(base + 2));
    config.idacmux = config
        .idacmux
        .with_i1mux(u4::new(base + 3))
        .with_i2mux(u4::new(base));
    let (gain, current) = match query.probe {
        ProbeType::Pt100 => (Gain::G16, IdacCurrent::Ua500),
        ProbeType::Pt1000 => (Gain::G2, IdacCurrent::Ua250),
        ProbeType::Ntc => (Gain::G1, IdacCurrent::Ua500),
    };
    config.pga = config.pga.with_gain(gain);
    config.idacmag = config.idacmag.with_imag(current.into());
    Ok(config)
}

pub struct Ads124s08Adc<D, P, I, C> {
    id: u8,
    start: P,
    reset: P,
    drdy: I,
    clock: C,
    device: Option<Ads124s08<D>>,
    channels: [Channel<Ads124s08<D>>; NUM_CHANNELS],
    state: State,
    query: Option<MeasurementQuery>,
}

impl<D, P, I, C> Ads124s08Adc<D, P, I, C>
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

    /// Power-up sequence: hardware reset, RESET command, default register
    /// block. Conversions are started by command, START is held low.
    pub fn initialize(
        &mut self,
        mut device: impl FnMut() -> D,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error> {
        self.start.set_low().map_err(Error::pin)?;
        delay.delay_ms(1);
        self.reset.set_low().map_err(Error::pin)?;
        delay.delay_ms(10);
        self.reset.set_high().map_err(Error::pin)?;

        let mut dev = Ads124s08::new(device());
        dev.reset()?;
        delay.delay_ms(10);
        dev.configure(&default_config())?;

        for channel in self.channels.iter_mut() {
            channel.initialize(Ads124s08::new(device()));
        }
        self.device = Some(dev);
        self.state = State::Idle;
        self.query = None;
        log::info!("ADS124S08 {} initialized", self.id);
        Ok(())
    }

    fn device(&mut self) -> Result<&mut Ads124s08<D>, Error> {
        self.device.as_mut().ok_or(Error::NotInitialized)
    }
}

impl<D, P, I, C> Adc for Ads124s08Adc<D, P, I, C>
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
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }
        if incoming.adc_id != self.id {
            return Err(Error::InvalidAdc(incoming.adc_id));
        }
        if incoming.num_of_readings != 1 {
            log::warn!(
                "ADS124S08 {}: refusing {} readings",
                self.id,
                incoming.num_of_readings
            );
            return Ok(MeasurementResponse::refused(
                "ADS124S08 takes exactly one reading per query",
            ));
        }

        let Some(query) = self.query else {
            let config = configuration(incoming)?;
            self.device()?.configure(&config)?;
            self.query = Some(*incoming);
            self.state = State::Configuring {
                since: self.clock.now(),
            };
            log::debug!(
                "ADS124S08 {}: configured channel {}",
                self.id,
                incoming.adc_channel_id
            );
            return Ok(MeasurementResponse::new(*incoming, Status::Accept));
        };

        if let State::Configuring { since } = self.state {
            if elapsed(self.clock.now(), since) <= SETTLE_TIME {
                return Ok(MeasurementResponse::new(
                    query,
                    Status::ConversionTimeout,
                ));
            }
            self.device()?.start()?;
            self.state = State::Waiting {
                since: self.clock.now(),
            };
        }

        if self.drdy.is_low().map_err(Error::pin)? {
            let readings = self.channels[query.adc_channel_id as usize]
                .measure(query.num_of_readings)?;
            if let State::Waiting { since } = self.state {
                log::trace!(
                    "ADS124S08 {}: conversion took {} ms",
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
