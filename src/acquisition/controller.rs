use super::{
    MeasurementProcessor, MeasurementQuery, QueryAttributes, Results, Status,
};
use crate::{
    hardware::Adc,
    settings::{Settings, NUM_ADCS, NUM_CHANNELS},
    time::{elapsed, Clock, Duration, Instant},
    Error,
};

/// Round robin measurement scheduler.
///
/// Every [`run`](Self::run) looks at one channel and advances the cursor to
/// the next one, regardless of the outcome, so each channel is looked at once
/// every `NUM_CHANNELS` ticks. A channel is skipped when it is disabled, when
/// it completed the previous measurement or when its minimum interval since
/// its last completed measurement has not elapsed.
///
/// Skipping the previous channel also applies when it is the only enabled
/// one: acquisition then stops after its first measurement.
///
/// A channel whose query was refused is not queried again until the next
/// [`reload`](Self::reload).
pub struct MeasurementController<A, C> {
    settings: Settings,
    adcs: [A; NUM_ADCS],
    processor: MeasurementProcessor,
    clock: C,
    last_measurement: [Option<Instant>; NUM_CHANNELS],
    results: [Option<Results>; NUM_CHANNELS],
    cursor: usize,
    last_measured: Option<usize>,
    refused: [bool; NUM_CHANNELS],
}

impl<A: Adc, C: Clock> MeasurementController<A, C> {
    pub fn new(settings: Settings, adcs: [A; NUM_ADCS], clock: C) -> Self {
        Self {
            settings,
            adcs,
            processor: MeasurementProcessor::new(),
            clock,
            last_measurement: [None; NUM_CHANNELS],
            results: Default::default(),
            cursor: 0,
            last_measured: None,
            refused: [false; NUM_CHANNELS],
        }
    }

    /// One scheduling step.
    pub fn run(&mut self) -> Result<(), Error> {
        let channel = self.cursor;
        self.cursor = (self.cursor + 1) % NUM_CHANNELS;
        self.handle_channel(channel)
    }

    fn handle_channel(&mut self, channel: usize) -> Result<(), Error> {
        let config = &self.settings.channels[channel];
        if !*config.enabled || self.refused[channel] {
            return Ok(());
        }
        if self.last_measured == Some(channel) {
            return Ok(());
        }
        if let Some(last) = self.last_measurement[channel] {
            if elapsed(self.clock.now(), last)
                < Duration::millis(*config.min_interval_ms)
            {
                return Ok(());
            }
        }

        // Channels map 1:1 to the inputs of the first ADC.
        let query = MeasurementQuery {
            global_channel_id: channel,
            adc_id: 0,
            adc_channel_id: channel as u8,
            probe: *config.probe,
            num_of_readings: *config.readings_per_query,
            attributes: QueryAttributes {
                chopped: *config.chopped,
            },
        };
        let adc = self
            .adcs
            .get_mut(query.adc_id as usize)
            .ok_or(Error::InvalidAdc(query.adc_id))?;
        // Never start a new query on an ADC with one in flight: keep
        // polling the outstanding one instead.
        let query = adc.query_in_progress().copied().unwrap_or(query);
        let response = adc.measure(&query)?;

        match response.status {
            Status::DataReady => {
                let done = response
                    .query_in_progress
                    .as_ref()
                    .ok_or(Error::MissingReadings)?
                    .global_channel_id;
                self.processor
                    .process_measurement(&response, &self.settings)?;
                self.results.clone_from(self.processor.results());
                self.last_measurement[done] = Some(self.clock.now());
                self.last_measured = Some(done);
                log::trace!("channel {done} done");
            }
            Status::Refuse => {
                self.refused[query.global_channel_id] = true;
                log::warn!(
                    "channel {}: query refused: {}",
                    query.global_channel_id,
                    response.message.unwrap_or("")
                );
            }
            _ => {}
        }
        Ok(())
    }

    /// Latest results snapshot, `None` for channels never measured.
    pub fn current_results(&self) -> &[Option<Results>; NUM_CHANNELS] {
        &self.results
    }

    /// Serialize the results snapshot as a JSON array.
    pub fn results_json(
        &self,
        buf: &mut [u8],
    ) -> Result<usize, serde_json_core::ser::Error> {
        serde_json_core::to_slice(&self.results, buf)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings. Effective from the next scheduling step.
    pub fn reload(&mut self, settings: Settings) {
        self.processor.resize(&settings);
        self.settings = settings;
        self.refused = [false; NUM_CHANNELS];
        log::info!("Settings reloaded");
    }

    pub fn adcs(&self) -> &[A; NUM_ADCS] {
        &self.adcs
    }

    pub fn processor(&self) -> &MeasurementProcessor {
        &self.processor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        acquisition::{MeasurementResponse, Readings},
        sensor::{self, REFERENCE_RESISTANCE},
        testing::isclose,
        time::ManualClock,
    };
    use embedded_hal::spi::ErrorKind;

    /// Answers every channel independently: `Accept` then `DataReady`, or
    /// `DataReady` right away when `immediate`.
    #[derive(Default)]
    struct Stub {
        immediate: bool,
        pending: [bool; NUM_CHANNELS],
        codes: [i32; NUM_CHANNELS],
        visits: Vec<usize>,
        fail: bool,
    }

    impl Adc for Stub {
        fn measure(
            &mut self,
            query: &MeasurementQuery,
        ) -> Result<MeasurementResponse, Error> {
            if self.fail {
                return Err(Error::Spi(ErrorKind::Other));
            }
            let ch = query.adc_channel_id as usize;
            self.visits.push(ch);
            if query.num_of_readings != 1 {
                return Ok(MeasurementResponse::refused("one reading only"));
            }
            if self.immediate || self.pending[ch] {
                self.pending[ch] = false;
                let readings = Readings::from_slice(&[self.codes[ch]]).unwrap();
                return Ok(MeasurementResponse::data_ready(*query, readings));
            }
            self.pending[ch] = true;
            Ok(MeasurementResponse::new(*query, Status::Accept))
        }

        fn query_in_progress(&self) -> Option<&MeasurementQuery> {
            None
        }
    }

    /// One conversion at a time: `Accept`, then `DataReady` on the next call.
    #[derive(Default)]
    struct Serial {
        query: Option<MeasurementQuery>,
        polled: Vec<usize>,
    }

    impl Adc for Serial {
        fn measure(
            &mut self,
            query: &MeasurementQuery,
        ) -> Result<MeasurementResponse, Error> {
            self.polled.push(query.global_channel_id);
            match self.query.take() {
                Some(q) => {
                    assert_eq!(&q, query);
                    let readings = Readings::from_slice(&[1 << 22]).unwrap();
                    Ok(MeasurementResponse::data_ready(q, readings))
                }
                None => {
                    self.query = Some(*query);
                    Ok(MeasurementResponse::new(*query, Status::Accept))
                }
            }
        }

        fn query_in_progress(&self) -> Option<&MeasurementQuery> {
            self.query.as_ref()
        }
    }

    fn celsius(code: i32, reference_offset: f64) -> f64 {
        sensor::pt100_celsius(sensor::resistance(
            code as f64,
            16,
            REFERENCE_RESISTANCE + reference_offset,
            0.0,
        ))
    }

    #[test]
    fn fills_all_channels() {
        let clock = ManualClock::default();
        let codes = [1 << 22, 3 << 20, 5 << 20];
        let stub = Stub {
            codes,
            ..Default::default()
        };
        let mut mc =
            MeasurementController::new(Settings::default(), [stub], &clock);
        assert!(mc.current_results().iter().all(Option::is_none));
        for _ in 0..2 * NUM_CHANNELS {
            mc.run().unwrap();
            clock.advance(1);
        }
        for (result, code) in mc.current_results().iter().zip(codes) {
            let result = result.as_ref().unwrap();
            assert_eq!(result.avg_reading, code as f64);
            assert!(isclose(result.celsius, celsius(code, 0.3), 0.0, 1e-9));
        }
    }

    #[test]
    fn visits_every_channel_once_per_round() {
        let clock = ManualClock::default();
        let stub = Stub {
            immediate: true,
            ..Default::default()
        };
        let mut mc =
            MeasurementController::new(Settings::default(), [stub], &clock);
        for _ in 0..4 * NUM_CHANNELS {
            mc.run().unwrap();
        }
        assert_eq!(mc.adcs()[0].visits, [0, 1, 2].repeat(4));

        let mut settings = Settings::default();
        *settings.channels[1].enabled = false;
        let stub = Stub {
            immediate: true,
            ..Default::default()
        };
        let mut mc = MeasurementController::new(settings, [stub], &clock);
        for _ in 0..2 * NUM_CHANNELS {
            mc.run().unwrap();
        }
        assert_eq!(mc.adcs()[0].visits, [0, 2, 0, 2]);
        assert!(mc.current_results()[1].is_none());
    }

    #[test]
    fn single_channel_stalls_after_first_read() {
        let clock = ManualClock::default();
        let mut settings = Settings::default();
        *settings.channels[1].enabled = false;
        *settings.channels[2].enabled = false;
        let stub = Stub {
            immediate: true,
            ..Default::default()
        };
        let mut mc = MeasurementController::new(settings, [stub], &clock);
        for _ in 0..10 * NUM_CHANNELS {
            mc.run().unwrap();
            clock.advance(100);
        }
        assert_eq!(mc.adcs()[0].visits, [0]);
    }

    #[test]
    fn respects_minimum_interval() {
        let clock = ManualClock::new(u32::MAX - 50);
        let mut settings = Settings::default();
        for ch in settings.channels.iter_mut() {
            *ch.min_interval_ms = 100;
        }
        let stub = Stub {
            immediate: true,
            ..Default::default()
        };
        let mut mc = MeasurementController::new(settings, [stub], &clock);
        for _ in 0..NUM_CHANNELS {
            mc.run().unwrap();
        }
        assert_eq!(mc.adcs()[0].visits, [0, 1, 2]);

        // across the counter wrap
        clock.advance(99);
        for _ in 0..NUM_CHANNELS {
            mc.run().unwrap();
        }
        assert_eq!(mc.adcs()[0].visits.len(), 3);

        clock.advance(1);
        for _ in 0..NUM_CHANNELS {
            mc.run().unwrap();
        }
        assert_eq!(mc.adcs()[0].visits, [0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn polls_outstanding_query() {
        let clock = ManualClock::default();
        let mut mc = MeasurementController::new(
            Settings::default(),
            [Serial::default()],
            &clock,
        );
        mc.run().unwrap();
        assert!(mc.current_results()[0].is_none());
        // cursor is at channel 1 but channel 0 is still converting
        mc.run().unwrap();
        assert!(mc.current_results()[0].is_some());
        assert!(mc.current_results()[1].is_none());
        // channel 2 accepted, channel 0 skipped as just measured, then
        // channel 2 completes on channel 1's turn
        mc.run().unwrap();
        mc.run().unwrap();
        assert!(mc.current_results()[2].is_none());
        mc.run().unwrap();
        assert!(mc.current_results()[2].is_some());
        assert!(mc.current_results()[1].is_none());
        assert_eq!(mc.adcs()[0].polled, [0, 0, 2, 2]);
    }

    #[test]
    fn reload_applies_on_next_step() {
        let clock = ManualClock::default();
        let stub = Stub {
            immediate: true,
            codes: [4 << 20; NUM_CHANNELS],
            ..Default::default()
        };
        let mut mc =
            MeasurementController::new(Settings::default(), [stub], &clock);
        mc.run().unwrap();

        let mut settings = mc.settings().clone();
        *settings.channels[1].enabled = false;
        *settings.channels[2].calibration.reference_offset = 1.7;
        *settings.channels[2].name = "bath".try_into().unwrap();
        mc.reload(settings);
        mc.run().unwrap();
        mc.run().unwrap();
        assert_eq!(mc.adcs()[0].visits, [0, 2]);
        let result = mc.current_results()[2].as_ref().unwrap();
        assert_eq!(result.name.as_str(), "bath");
        assert!(isclose(result.celsius, celsius(4 << 20, 1.7), 0.0, 1e-9));
    }

    #[test]
    fn refused_channel_is_not_requeried() {
        let clock = ManualClock::default();
        let mut settings = Settings::default();
        *settings.channels[0].readings_per_query = 2;
        *settings.channels[2].enabled = false;
        let mut mc =
            MeasurementController::new(settings, [Stub::default()], &clock);
        for _ in 0..5 * NUM_CHANNELS {
            mc.run().unwrap();
            clock.advance(1);
        }
        let queried = mc.adcs()[0].visits.iter().filter(|&&ch| ch == 0);
        assert_eq!(queried.count(), 1);
        assert!(mc.current_results()[0].is_none());
        assert!(mc.current_results()[1].is_some());

        // new settings may change the request shape
        let mut settings = mc.settings().clone();
        *settings.channels[0].readings_per_query = 1;
        mc.reload(settings);
        for _ in 0..2 * NUM_CHANNELS {
            mc.run().unwrap();
            clock.advance(1);
        }
        assert!(mc.current_results()[0].is_some());
    }

    #[test]
    fn errors_propagate() {
        let clock = ManualClock::default();
        let stub = Stub {
            fail: true,
            ..Default::default()
        };
        let mut mc =
            MeasurementController::new(Settings::default(), [stub], &clock);
        assert_eq!(mc.run(), Err(Error::Spi(ErrorKind::Other)));
        mc.adcs[0].fail = false;
        mc.run().unwrap();
        assert_eq!(mc.adcs()[0].visits, [1]);
    }

    #[test]
    fn snapshot_json() {
        let clock = ManualClock::default();
        let stub = Stub {
            immediate: true,
            ..Default::default()
        };
        let mut mc =
            MeasurementController::new(Settings::default(), [stub], &clock);
        let mut buf = [0u8; 1024];
        let len = mc.results_json(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"[null,null,null]");
        mc.run().unwrap();
        let len = mc.results_json(&mut buf).unwrap();
        assert!(buf[..len].starts_with(br#"[{"_name":"CH0""#));
    }
}
