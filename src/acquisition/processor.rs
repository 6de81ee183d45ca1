use heapless::{Deque, String};
use serde::Serialize;

use super::{MeasurementResponse, Status};
use crate::{
    sensor::{self, ProbeType, REFERENCE_RESISTANCE},
    settings::{Settings, NUM_CHANNELS, WINDOW_CAPACITY},
    Error,
};

/// Latest computed values of a channel.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Results {
    #[serde(rename = "_name")]
    pub name: String<16>,
    pub verbose_name: String<32>,
    pub probe: ProbeType,
    pub avg_reading: f64,
    #[serde(rename = "resistance_Om")]
    pub resistance: f64,
    #[serde(rename = "temperature_C")]
    pub celsius: f64,
    #[serde(rename = "temperature_K")]
    pub kelvin: f64,
    #[serde(rename = "temperature_F")]
    pub fahrenheit: f64,
}

type Window = Deque<i32, WINDOW_CAPACITY>;

/// Per channel rolling window of raw codes and the values computed from it.
#[derive(Debug)]
pub struct MeasurementProcessor {
    windows: [Window; NUM_CHANNELS],
    results: [Option<Results>; NUM_CHANNELS],
}

impl Default for MeasurementProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementProcessor {
    pub fn new() -> Self {
        Self {
            windows: core::array::from_fn(|_| Deque::new()),
            results: Default::default(),
        }
    }

    /// Store the readings of a completed conversion and recompute the
    /// channel's values from the whole window.
    pub fn process_measurement(
        &mut self,
        response: &MeasurementResponse,
        settings: &Settings,
    ) -> Result<(), Error> {
        let (Status::DataReady, Some(query), Some(readings)) = (
            response.status,
            response.query_in_progress.as_ref(),
            response.readings.as_ref(),
        ) else {
            return Err(Error::MissingReadings);
        };
        let id = query.global_channel_id;
        let config = settings
            .channels
            .get(id)
            .ok_or(Error::InvalidGlobalChannel(id))?;

        let size = config.window();
        let window = &mut self.windows[id];
        for &reading in readings.iter() {
            if window.is_full() {
                window.pop_front();
            }
            window.push_back(reading).ok();
        }
        while window.len() > size {
            window.pop_front();
        }
        if window.is_empty() {
            return Ok(());
        }

        let avg_reading = window.iter().map(|&r| r as f64).sum::<f64>()
            / window.len() as f64;
        let probe = *config.probe;
        let resistance = sensor::resistance(
            avg_reading,
            probe.gain(),
            REFERENCE_RESISTANCE + *config.calibration.reference_offset,
            *config.calibration.resistance_offset,
        );
        let celsius = probe.celsius(resistance);
        self.results[id] = Some(Results {
            name: (*config.name).clone(),
            verbose_name: (*config.verbose_name).clone(),
            probe,
            avg_reading,
            resistance,
            celsius,
            kelvin: sensor::celsius_to_kelvin(celsius),
            fahrenheit: sensor::celsius_to_fahrenheit(celsius),
        });
        log::debug!("channel {id}: R = {resistance} Ω, T = {celsius} °C");
        Ok(())
    }

    /// Trim the windows (oldest first) to the window sizes of `settings`.
    pub fn resize(&mut self, settings: &Settings) {
        for (window, config) in self.windows.iter_mut().zip(&settings.channels)
        {
            while window.len() > config.window() {
                window.pop_front();
            }
        }
    }

    /// Raw codes in the window of `channel`, oldest first.
    pub fn readings(
        &self,
        channel: usize,
    ) -> Option<impl Iterator<Item = &i32> + '_> {
        self.windows.get(channel).map(|window| window.iter())
    }

    pub fn results(&self) -> &[Option<Results>; NUM_CHANNELS] {
        &self.results
    }
}
