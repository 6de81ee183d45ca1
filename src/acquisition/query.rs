//! Measurement queries and the responses ADC drivers answer them with.
use crate::sensor::ProbeType;

/// Maximum number of raw readings a single response carries.
pub const MAX_READINGS: usize = 16;

pub type Readings = heapless::Vec<i32, MAX_READINGS>;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryAttributes {
    /// Swap the excitation current outputs for this conversion.
    pub chopped: bool,
}

/// What to measure. Built fresh for every scheduling decision.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MeasurementQuery {
    pub global_channel_id: usize,
    pub adc_id: u8,
    pub adc_channel_id: u8,
    pub probe: ProbeType,
    pub num_of_readings: u32,
    pub attributes: QueryAttributes,
}

/// Progress of a query.
///
/// A query is answered by `Accept`, then any number of `WaitingForConversion`
/// or `ConversionTimeout`, then `DataReady`. `Refuse` is returned instead of
/// `Accept` for queries the driver cannot serve.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Accept,
    WaitingForConversion,
    DataReady,
    Refuse,
    /// The input is still settling after reconfiguration. Not an error.
    ConversionTimeout,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::DataReady | Self::Refuse)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementResponse {
    pub query_in_progress: Option<MeasurementQuery>,
    pub status: Status,
    pub readings: Option<Readings>,
    pub message: Option<&'static str>,
}

impl MeasurementResponse {
    pub fn new(query: MeasurementQuery, status: Status) -> Self {
        Self {
            query_in_progress: Some(query),
            status,
            readings: None,
            message: None,
        }
    }

    pub fn refused(message: &'static str) -> Self {
        Self {
            query_in_progress: None,
            status: Status::Refuse,
            readings: None,
            message: Some(message),
        }
    }

    pub fn data_ready(query: MeasurementQuery, readings: Readings) -> Self {
        Self {
            query_in_progress: Some(query),
            status: Status::DataReady,
            readings: Some(readings),
            message: None,
        }
    }
}
