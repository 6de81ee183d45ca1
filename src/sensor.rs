//! RTD probe models: resistance from ADC codes and temperature from resistance.
use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Nominal value of the ratiometric reference resistor.
pub const REFERENCE_RESISTANCE: f64 = 2000.0;

/// Full scale of the ratiometric measurement at unity gain.
const FULL_SCALE: f64 = (1u32 << 22) as f64;

/// Callendar-Van Dusen coefficients (IEC 60751).
const A: f64 = 3.9083e-3;
const B: f64 = -5.7750e-7;

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
pub enum ProbeType {
    #[default]
    Pt100,
    Pt1000,
    /// Not supported for conversion: temperatures come out as NaN.
    #[serde(rename = "NTC")]
    #[strum(serialize = "NTC")]
    Ntc,
}

struct Model {
    gain: u8,
    celsius: fn(f64) -> f64,
}

const MODELS: [Model; 3] = [
    Model {
        gain: 16,
        celsius: pt100_celsius,
    },
    Model {
        gain: 2,
        celsius: pt1000_celsius,
    },
    Model {
        gain: 1,
        celsius: unsupported_celsius,
    },
];

impl ProbeType {
    fn model(self) -> &'static Model {
        &MODELS[self as usize]
    }

    /// PGA gain the ADC uses for this probe.
    pub fn gain(self) -> u8 {
        self.model().gain
    }

    pub fn celsius(self, resistance: f64) -> f64 {
        (self.model().celsius)(resistance)
    }
}

/// Low resistance polynomial approximation, in terms of a 100 Ω element.
fn low_range(r: f64) -> f64 {
    -242.09 + 2.2276 * r + 2.5178e-3 * r.powi(2) - 5.8620e-6 * r.powi(3)
}

/// Inverse of the quadratic Callendar-Van Dusen equation (T >= 0 °C form).
fn cvd(r0: f64, r: f64) -> f64 {
    (-r0 * A + (r0.powi(2) * A.powi(2) - 4.0 * r0 * B * (r0 - r)).sqrt())
        / (2.0 * r0 * B)
}

pub fn pt100_celsius(r: f64) -> f64 {
    if r < 90.0 {
        low_range(r)
    } else {
        cvd(100.0, r)
    }
}

pub fn pt1000_celsius(r: f64) -> f64 {
    if r < 900.0 {
        low_range(r / 10.0)
    } else {
        cvd(1000.0, r)
    }
}

fn unsupported_celsius(_r: f64) -> f64 {
    f64::NAN
}

/// Resistance of the probe from an (averaged) ADC code.
///
/// `reference` is the effective reference resistance (nominal plus
/// calibration offset), `offset` the additive lead resistance correction.
/// `reading` is scaled against the 2^22 code scale of the 24 bit ADS124S08.
/// ADS1148 codes are not rescaled.
pub fn resistance(reading: f64, gain: u8, reference: f64, offset: f64) -> f64 {
    reference * (reading / (gain as f64 * FULL_SCALE)) + offset
}

pub fn celsius_to_kelvin(t: f64) -> f64 {
    t + 273.15
}

pub fn celsius_to_fahrenheit(t: f64) -> f64 {
    t * 1.8 + 32.0
}
