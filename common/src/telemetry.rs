use serde::Serialize;

use crate::{board::AdcReading, config::CalibrationConfig, zone::MoistureStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub devicename: String,
    pub timestamp: i64,
    pub measurement_count: u32,
    pub software_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryInfo {
    pub b_voltage: f64,
    pub b_adc: i32,
    pub b_percent: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorInfo {
    pub s_voltage: f64,
    pub s_adc: i32,
    pub s_percent: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    pub device: DeviceInfo,
    pub battery: BatteryInfo,
    pub sensor: SensorInfo,
    pub s_moisture_status: MoistureStatus,
}

pub struct RecordContext<'a> {
    pub devicename: &'a str,
    pub software_version: &'a str,
    pub timestamp: i64,
    pub measurement_count: u32,
}

impl TelemetryRecord {
    pub fn new(
        context: RecordContext<'_>,
        calibration: &CalibrationConfig,
        battery: AdcReading,
        sensor: AdcReading,
        status: MoistureStatus,
    ) -> Self {
        Self {
            device: DeviceInfo {
                devicename: context.devicename.to_string(),
                timestamp: context.timestamp,
                measurement_count: context.measurement_count,
                software_version: context.software_version.to_string(),
            },
            battery: BatteryInfo {
                b_voltage: round4(battery.voltage),
                b_adc: battery.raw,
                b_percent: calibration.battery_percent(battery.voltage),
            },
            sensor: SensorInfo {
                s_voltage: round4(sensor.voltage),
                s_adc: sensor.raw,
                s_percent: calibration.sensor_percent(sensor.raw),
            },
            s_moisture_status: status,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

fn round4(value: f32) -> f64 {
    (f64::from(value) * 10_000.0).round() / 10_000.0
}
