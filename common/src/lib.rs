pub mod board;
pub mod calibration;
pub mod config;
pub mod counter;
pub mod display;
pub mod duty_cycle;
pub mod error;
pub mod icons;
pub mod render;
pub mod telemetry;
pub mod topics;
pub mod zone;

#[cfg(test)]
mod testing;

pub use board::{
    Acquisition, AdcChannel, AdcReading, Board, Clock, RetainedMemory, StatusLed, Uplink,
    WakeButton, WakeCause,
};
pub use config::{NodeConfig, SOFTWARE_VERSION};
pub use counter::CycleCounter;
pub use display::{DisplayController, Orientation};
pub use duty_cycle::{DeepSleep, DutyCycleController, Measurement, Phase, Step};
pub use error::{AcquisitionError, DisplayError, NetworkError, PersistenceError};
pub use icons::{glyph_for, IconGlyph, IconId};
pub use telemetry::TelemetryRecord;
pub use topics::*;
pub use zone::{classify, classify_reading, Classification, MoistureStatus, MoistureZone};
