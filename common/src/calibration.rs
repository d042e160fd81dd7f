use core::time::Duration;

use crate::{
    board::{AdcChannel, AdcReading},
    config::CalibrationConfig,
};

pub const BATTERY_FALLBACK: AdcReading = AdcReading {
    raw: 0,
    voltage: 3.7,
};
pub const SENSOR_FALLBACK: AdcReading = AdcReading {
    raw: 2000,
    voltage: 1.5,
};

pub const SAMPLES_PER_READING: usize = 10;
pub const SAMPLE_SPACING: Duration = Duration::from_millis(10);
pub const SENSOR_WARMUP: Duration = Duration::from_millis(100);

pub fn fallback_reading(channel: AdcChannel) -> AdcReading {
    match channel {
        AdcChannel::Battery => BATTERY_FALLBACK,
        AdcChannel::Sensor => SENSOR_FALLBACK,
    }
}

impl CalibrationConfig {
    pub fn divider_factor(&self, channel: AdcChannel) -> f32 {
        match channel {
            AdcChannel::Battery => self.battery_voltage_factor,
            AdcChannel::Sensor => self.sensor_voltage_factor,
        }
    }

    pub fn raw_to_voltage(&self, channel: AdcChannel, raw: i32) -> f32 {
        let pin_volts = raw as f32 * (self.adc_reference_volts / f32::from(self.adc_full_scale));
        pin_volts * self.divider_factor(channel)
    }

    pub fn reading(&self, channel: AdcChannel, raw: i32) -> AdcReading {
        AdcReading {
            raw,
            voltage: self.raw_to_voltage(channel, raw),
        }
    }

    pub fn sensor_percent(&self, raw: i32) -> u8 {
        let span = (self.moisture_dry - self.moisture_wet) as f32;
        if span <= 0.0 {
            return 0;
        }
        let percent = (self.moisture_dry - raw) as f32 / span * 100.0;
        truncate_percent(percent)
    }

    pub fn battery_percent(&self, voltage: f32) -> u8 {
        let span = self.battery_max - self.battery_min;
        if span <= 0.0 {
            return 0;
        }
        let percent = (voltage - self.battery_min) / span * 100.0;
        truncate_percent(percent)
    }
}

/// Mean of a sample burst, truncated toward zero.
pub fn average_raw(samples: &[i32]) -> Option<i32> {
    if samples.is_empty() {
        return None;
    }
    let sum: i64 = samples.iter().copied().map(i64::from).sum();
    i32::try_from(sum / samples.len() as i64).ok()
}

fn truncate_percent(percent: f32) -> u8 {
    if percent.is_nan() {
        return 0;
    }
    percent.trunc().clamp(0.0, 100.0) as u8
}
