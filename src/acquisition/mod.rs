mod controller;
mod processor;
mod query;

pub use controller::MeasurementController;
pub use processor::{MeasurementProcessor, Results};
pub use query::{
    MeasurementQuery, MeasurementResponse, QueryAttributes, Readings, Status,
    MAX_READINGS,
};
