//! Run-time acquisition settings.
//!
//! The settings tree is owned by the configuration front end (serial console,
//! Modbus, HTTP) and handed to the
//! [`MeasurementController`](crate::acquisition::MeasurementController) as a
//! whole on every change. Channel entries are index stable: the index is the
//! global channel id and reordering them reassigns the rolling windows.
use core::fmt::Write;
use heapless::String;
use miniconf::{Leaf, Tree};
use serde::{Deserialize, Serialize};

use crate::sensor::ProbeType;

/// Number of RTD channels on the board.
pub const NUM_CHANNELS: usize = 3;

/// Number of SPI ADCs on the board.
pub const NUM_ADCS: usize = 1;

/// Maximum rolling window length per channel.
pub const WINDOW_CAPACITY: usize = 64;

/// Supported ADC chip populating the board.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdcModel {
    /// 16 bit codes. The resistance conversion uses the 24 bit full scale
    /// of the ADS124S08, so readings of this part are not calibrated.
    Ads1148,
    #[default]
    Ads124s08,
}

#[derive(Clone, Debug, PartialEq, Tree)]
pub struct Calibration {
    /// Offset added to the nominal reference resistance (Ω)
    pub reference_offset: Leaf<f64>,
    /// Offset added to the computed probe resistance (Ω)
    pub resistance_offset: Leaf<f64>,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            reference_offset: 0.3.into(),
            resistance_offset: 0.0.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Tree)]
pub struct ChannelConfig {
    pub name: Leaf<String<16>>,
    pub verbose_name: Leaf<String<32>>,
    pub enabled: Leaf<bool>,
    pub probe: Leaf<ProbeType>,
    /// Raw readings requested per query
    pub readings_per_query: Leaf<u32>,
    /// Minimum time between completed measurements (ms)
    pub min_interval_ms: Leaf<u32>,
    /// Rolling window length. Clamped to `1..=WINDOW_CAPACITY`.
    pub window_size: Leaf<u32>,
    pub calibration: Calibration,
    /// Swap the excitation current outputs (ADS1148 only)
    pub chopped: Leaf<bool>,
}

impl ChannelConfig {
    pub fn new(index: usize) -> Self {
        let mut name = String::<16>::new();
        // CH0..CH9 always fits
        write!(&mut name, "CH{index}").ok();
        Self {
            verbose_name: String::<32>::try_from(name.as_str())
                .unwrap_or_default()
                .into(),
            name: name.into(),
            enabled: true.into(),
            probe: ProbeType::Pt100.into(),
            readings_per_query: 1u32.into(),
            min_interval_ms: 0u32.into(),
            window_size: 1u32.into(),
            calibration: Calibration::default(),
            chopped: false.into(),
        }
    }

    /// Effective rolling window length.
    pub fn window(&self) -> usize {
        (*self.window_size as usize).clamp(1, WINDOW_CAPACITY)
    }
}

#[derive(Clone, Debug, PartialEq, Tree)]
pub struct Settings {
    pub adc: Leaf<AdcModel>,
    pub channels: [ChannelConfig; NUM_CHANNELS],
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            adc: AdcModel::default().into(),
            channels: core::array::from_fn(ChannelConfig::new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(*s.adc, AdcModel::Ads124s08);
        for (i, ch) in s.channels.iter().enumerate() {
            assert_eq!(ch.name.as_str(), ["CH0", "CH1", "CH2"][i]);
            assert_eq!(ch.verbose_name.as_str(), ch.name.as_str());
            assert!(*ch.enabled);
            assert_eq!(*ch.probe, ProbeType::Pt100);
            assert_eq!(*ch.readings_per_query, 1);
            assert_eq!(*ch.min_interval_ms, 0);
            assert_eq!(ch.window(), 1);
            assert_eq!(*ch.calibration.reference_offset, 0.3);
            assert_eq!(*ch.calibration.resistance_offset, 0.0);
        }
    }

    #[test]
    fn window_is_clamped() {
        let mut ch = ChannelConfig::new(0);
        *ch.window_size = 0;
        assert_eq!(ch.window(), 1);
        *ch.window_size = 10;
        assert_eq!(ch.window(), 10);
        *ch.window_size = u32::MAX;
        assert_eq!(ch.window(), WINDOW_CAPACITY);
    }
}
