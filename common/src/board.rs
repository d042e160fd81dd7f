use core::{fmt, time::Duration};

use embedded_hal::i2c::I2c;

use crate::error::{AcquisitionError, NetworkError, PersistenceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdcChannel {
    Battery,
    Sensor,
}

impl AdcChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Battery => "battery",
            Self::Sensor => "sensor",
        }
    }
}

impl fmt::Display for AdcChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdcReading {
    pub raw: i32,
    pub voltage: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeCause {
    PowerOn,
    DeepSleep,
}

pub trait Acquisition {
    fn read_channel(&mut self, channel: AdcChannel) -> Result<AdcReading, AcquisitionError>;
}

pub trait RetainedMemory {
    fn load(&mut self) -> Result<Vec<u8>, PersistenceError>;
    fn store(&mut self, bytes: &[u8]) -> Result<(), PersistenceError>;
}

pub trait Uplink {
    fn connect(&mut self, timeout: Duration) -> Result<(), NetworkError>;
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), NetworkError>;
    fn disconnect(&mut self);
}

pub trait WakeButton {
    /// `true` while the button is held. Platforms translate the active-low line.
    fn is_pressed(&mut self) -> Result<bool, AcquisitionError>;
}

pub trait StatusLed {
    fn set(&mut self, on: bool);
}

pub trait Clock {
    fn delay(&mut self, duration: Duration);
    fn epoch_seconds(&self) -> i64;
}

pub trait Board: Acquisition + RetainedMemory + Uplink + WakeButton + StatusLed + Clock {
    type DisplayBus: I2c;

    fn wake_cause(&self) -> WakeCause;

    /// Hands out the display bus once; `None` runs the node headless.
    fn take_display_bus(&mut self) -> Option<Self::DisplayBus>;

    fn park(&mut self);

    fn blink(&mut self, times: u32, period: Duration) {
        for _ in 0..times {
            self.set(true);
            self.delay(period);
            self.set(false);
            self.delay(period);
        }
    }
}
