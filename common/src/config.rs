use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::topics::TOPIC_MOISTURE_TELEMETRY;

pub const SOFTWARE_VERSION: &str = "3.0j";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub name: String,
    pub topic: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "ESP32-C3-OLED_Feuchtesensor_01".to_string(),
            topic: TOPIC_MOISTURE_TELEMETRY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub wifi_ssid: String,
    pub wifi_pass: String,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub connect_timeout_ms: u64,
    pub tx_power_dbm: i8,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: String::new(),
            wifi_pass: String::new(),
            mqtt_host: "192.168.178.35".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
            connect_timeout_ms: 15_000,
            tx_power_dbm: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Deep-sleep length between cycles; 0 keeps the node measuring continuously.
    pub sleep_secs: u64,
    pub button_poll_ms: u64,
    pub button_poll_interval_ms: u64,
    pub dwell_ms: u64,
    pub continuous_pause_ms: u64,
    pub publish_settle_ms: u64,
    pub button_settle_ms: u64,
    pub splash_ms: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            sleep_secs: 60,
            button_poll_ms: 5_000,
            button_poll_interval_ms: 100,
            dwell_ms: 3_000,
            continuous_pause_ms: 3_000,
            publish_settle_ms: 1_000,
            button_settle_ms: 1_000,
            splash_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub moisture_dry: i32,
    pub moisture_wet: i32,
    pub battery_max: f32,
    pub battery_min: f32,
    pub sensor_voltage_factor: f32,
    pub battery_voltage_factor: f32,
    pub adc_reference_volts: f32,
    pub adc_full_scale: u16,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            moisture_dry: 850,
            moisture_wet: 420,
            battery_max: 4.2,
            battery_min: 3.0,
            sensor_voltage_factor: 2.47,
            battery_voltage_factor: 3.3,
            adc_reference_volts: 2.0,
            adc_full_scale: 4095,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub flipped: bool,
    pub contrast: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            flipped: false,
            contrast: 0xCF,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl NodeConfig {
    pub fn sanitize(&mut self) {
        if self.device.topic.trim().is_empty() {
            self.device.topic = TOPIC_MOISTURE_TELEMETRY.to_string();
        }
        if self.network.mqtt_port == 0 {
            self.network.mqtt_port = 1883;
        }
        self.network.connect_timeout_ms = self.network.connect_timeout_ms.clamp(1_000, 120_000);
        self.cycle.sanitize();
        self.calibration.sanitize();
    }
}

impl CycleConfig {
    pub fn sanitize(&mut self) {
        self.button_poll_interval_ms = self.button_poll_interval_ms.clamp(10, 1_000);
    }

    pub fn sleep(&self) -> Option<Duration> {
        (self.sleep_secs > 0).then(|| Duration::from_secs(self.sleep_secs))
    }

    pub fn button_poll(&self) -> Duration {
        Duration::from_millis(self.button_poll_ms)
    }

    pub fn button_poll_interval(&self) -> Duration {
        Duration::from_millis(self.button_poll_interval_ms)
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }
}

impl CalibrationConfig {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();

        if self.moisture_wet >= self.moisture_dry {
            self.moisture_dry = defaults.moisture_dry;
            self.moisture_wet = defaults.moisture_wet;
        }
        let battery_span_valid = self.battery_min < self.battery_max;
        if !battery_span_valid {
            self.battery_min = defaults.battery_min;
            self.battery_max = defaults.battery_max;
        }
        if self.adc_full_scale == 0 {
            self.adc_full_scale = defaults.adc_full_scale;
        }
        let reference_valid = self.adc_reference_volts > 0.0;
        if !reference_valid {
            self.adc_reference_volts = defaults.adc_reference_volts;
        }
    }
}
