use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use embedded_svc::{
    mqtt::client::QoS,
    wifi::{AuthMethod, ClientConfiguration, Configuration},
};
use esp_idf_hal::{
    adc::{
        attenuation::DB_6,
        oneshot::{config::AdcChannelConfig, AdcChannelDriver, AdcDriver},
        ADC1,
    },
    gpio::{Gpio0, Gpio1, Gpio2, Gpio3, Gpio8, Input, Output, PinDriver, Pull},
    i2c::{I2cConfig, I2cDriver},
    prelude::*,
};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    log::EspLogger,
    mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration},
    nvs::{EspDefaultNvsPartition, EspNvs},
    sys::EspError,
    wifi::EspWifi,
};
use log::{debug, info, warn};

use moisture_common::{
    calibration::{average_raw, SAMPLES_PER_READING, SAMPLE_SPACING, SENSOR_WARMUP},
    config::{CalibrationConfig, NetworkConfig},
    status_topic, Acquisition, AcquisitionError, AdcChannel, AdcReading, Board, Clock,
    CycleCounter, DeepSleep, DutyCycleController, NetworkError, NodeConfig, PersistenceError,
    RetainedMemory, StatusLed, Uplink, WakeButton, WakeCause, STATUS_ONLINE,
};

const NVS_NAMESPACE: &str = "moisture";
const NVS_CONFIG_KEY: &str = "node_json";

const LED_GPIO: i32 = 8;
const FATAL_BLINKS: u32 = 10;
const FATAL_BLINK_PERIOD: Duration = Duration::from_millis(100);
const I2C_BAUDRATE_KHZ: u32 = 400;
const LINK_POLL: Duration = Duration::from_millis(100);

type SharedAdc = Arc<AdcDriver<'static, ADC1>>;

/// Cycle counter in RTC slow memory; survives deep sleep, not power loss.
#[link_section = ".rtc.data"]
static mut RETAINED_COUNTER: [u8; CycleCounter::RETAINED_LEN] = [0; CycleCounter::RETAINED_LEN];

pub fn run() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let config = load_node_config(&nvs_partition).unwrap_or_else(|err| {
        warn!("failed to load node config from NVS: {err:#}");
        NodeConfig::default()
    });

    let board = match EspBoard::new(Peripherals::take()?, sys_loop, nvs_partition, &config)
        .context("board bring-up failed")
    {
        Ok(board) => board,
        Err(err) => {
            blink_fatal();
            return Err(err);
        }
    };

    let mut controller = DutyCycleController::new(board, config);
    match controller.run_guarded() {
        Some(deep_sleep) => enter_deep_sleep(deep_sleep),
        None => anyhow::bail!("duty cycle aborted, node halted"),
    }
}

fn load_node_config(partition: &EspDefaultNvsPartition) -> anyhow::Result<NodeConfig> {
    let nvs = EspNvs::new(partition.clone(), NVS_NAMESPACE, true)?;
    let mut buffer = vec![0_u8; 4096];

    let mut config = match nvs.get_str(NVS_CONFIG_KEY, &mut buffer)? {
        Some(value) => serde_json::from_str::<NodeConfig>(value)?,
        None => NodeConfig::default(),
    };
    config.sanitize();
    Ok(config)
}

fn enter_deep_sleep(deep_sleep: DeepSleep) -> ! {
    info!("entering deep sleep for {}s", deep_sleep.duration.as_secs());
    let micros = u64::try_from(deep_sleep.duration.as_micros()).unwrap_or(u64::MAX);
    unsafe { esp_idf_svc::sys::esp_deep_sleep(micros) }
}

/// Flashes the LED through the raw GPIO API; used when the board never came up.
fn blink_fatal() {
    unsafe {
        esp_idf_svc::sys::gpio_reset_pin(LED_GPIO);
        esp_idf_svc::sys::gpio_set_direction(
            LED_GPIO,
            esp_idf_svc::sys::gpio_mode_t_GPIO_MODE_OUTPUT,
        );
    }
    for _ in 0..FATAL_BLINKS {
        unsafe { esp_idf_svc::sys::gpio_set_level(LED_GPIO, 0) };
        thread::sleep(FATAL_BLINK_PERIOD);
        unsafe { esp_idf_svc::sys::gpio_set_level(LED_GPIO, 1) };
        thread::sleep(FATAL_BLINK_PERIOD);
    }
}

struct EspBoard {
    wake: WakeCause,
    sensor_power: PinDriver<'static, Gpio0, Output>,
    sensor_adc: AdcChannelDriver<'static, Gpio1, SharedAdc>,
    battery_adc: AdcChannelDriver<'static, Gpio2, SharedAdc>,
    button: PinDriver<'static, Gpio3, Input>,
    led: PinDriver<'static, Gpio8, Output>,
    display_bus: Option<I2cDriver<'static>>,
    wifi: EspWifi<'static>,
    wifi_started: bool,
    mqtt: Option<EspMqttClient<'static>>,
    mqtt_connected: Arc<AtomicBool>,
    network: NetworkConfig,
    client_id: String,
    status_topic: String,
    calibration: CalibrationConfig,
}

impl EspBoard {
    fn new(
        peripherals: Peripherals,
        sys_loop: EspSystemEventLoop,
        nvs_partition: EspDefaultNvsPartition,
        config: &NodeConfig,
    ) -> anyhow::Result<Self> {
        let Peripherals {
            modem,
            pins,
            adc1,
            i2c0,
            ..
        } = peripherals;

        let mut led = PinDriver::output(pins.gpio8).context("status led")?;
        led.set_high()?;
        let mut sensor_power = PinDriver::output(pins.gpio0).context("sensor supply")?;
        sensor_power.set_low()?;
        let mut button = PinDriver::input(pins.gpio3).context("wake button")?;
        button.set_pull(Pull::Up)?;

        let adc = Arc::new(AdcDriver::new(adc1).context("adc1")?);
        // 0-2.0 V full scale, the range the zone table and `adc_reference_volts` assume.
        let channel_config = AdcChannelConfig {
            attenuation: DB_6,
            ..Default::default()
        };
        let sensor_adc = AdcChannelDriver::new(adc.clone(), pins.gpio1, &channel_config)
            .context("sensor adc channel")?;
        let battery_adc = AdcChannelDriver::new(adc, pins.gpio2, &channel_config)
            .context("battery adc channel")?;

        let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
        let display_bus = match I2cDriver::new(i2c0, pins.gpio5, pins.gpio6, &i2c_config) {
            Ok(bus) => Some(bus),
            Err(err) => {
                warn!("display i2c unavailable: {err}");
                None
            }
        };

        let wifi = EspWifi::new(modem, sys_loop, Some(nvs_partition)).context("wifi driver")?;

        Ok(Self {
            wake: read_wake_cause(),
            sensor_power,
            sensor_adc,
            battery_adc,
            button,
            led,
            display_bus,
            wifi,
            wifi_started: false,
            mqtt: None,
            mqtt_connected: Arc::new(AtomicBool::new(false)),
            network: config.network.clone(),
            client_id: config.device.name.clone(),
            status_topic: status_topic(&config.device.topic),
            calibration: config.calibration.clone(),
        })
    }

    fn start_wifi(&mut self) -> Result<(), NetworkError> {
        let connect_error = |err: EspError| NetworkError::Connect(err.to_string());
        let auth_method = if self.network.wifi_pass.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        };

        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: self
                    .network
                    .wifi_ssid
                    .as_str()
                    .try_into()
                    .map_err(|_| NetworkError::Connect("wifi ssid too long".to_string()))?,
                password: self
                    .network
                    .wifi_pass
                    .as_str()
                    .try_into()
                    .map_err(|_| NetworkError::Connect("wifi password too long".to_string()))?,
                auth_method,
                ..Default::default()
            }))
            .map_err(connect_error)?;

        self.wifi.start().map_err(connect_error)?;
        self.wifi_started = true;
        set_tx_power(self.network.tx_power_dbm);
        info!("wifi started, connecting to `{}`", self.network.wifi_ssid);
        self.wifi.connect().map_err(connect_error)
    }

    /// Restarts association on a radio that stayed up from an earlier cycle.
    fn reassociate(&mut self) -> Result<(), NetworkError> {
        if let Err(err) = self.wifi.disconnect() {
            debug!("wifi disconnect before reassociation: {err}");
        }
        info!("reconnecting to `{}`", self.network.wifi_ssid);
        self.wifi
            .connect()
            .map_err(|err| NetworkError::Connect(err.to_string()))
    }

    fn wifi_up(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false) && self.wifi.sta_netif().is_up().unwrap_or(false)
    }

    fn start_mqtt(&mut self) -> Result<EspMqttClient<'static>, NetworkError> {
        let url = format!("mqtt://{}:{}", self.network.mqtt_host, self.network.mqtt_port);
        let conf = MqttClientConfiguration {
            client_id: Some(self.client_id.as_str()),
            username: if self.network.mqtt_user.is_empty() {
                None
            } else {
                Some(self.network.mqtt_user.as_str())
            },
            password: if self.network.mqtt_pass.is_empty() {
                None
            } else {
                Some(self.network.mqtt_pass.as_str())
            },
            ..Default::default()
        };

        let (client, mut connection) = EspMqttClient::new(&url, &conf)
            .map_err(|err| NetworkError::Connect(format!("mqtt client: {err}")))?;

        let connected = self.mqtt_connected.clone();
        thread::Builder::new()
            .name("mqtt-poll".to_string())
            .stack_size(6144)
            .spawn(move || {
                while let Ok(event) = connection.next() {
                    match event.payload() {
                        EventPayload::Connected(_) => {
                            info!("mqtt broker connected");
                            connected.store(true, Ordering::Release);
                        }
                        EventPayload::Disconnected => {
                            connected.store(false, Ordering::Release);
                        }
                        EventPayload::Error(err) => warn!("sensor mqtt error: {err:?}"),
                        _ => {}
                    }
                }
                connected.store(false, Ordering::Release);
                debug!("mqtt connection closed");
            })
            .map_err(|err| NetworkError::Connect(format!("failed to spawn mqtt thread: {err}")))?;

        Ok(client)
    }

    fn wait_until(
        &self,
        deadline: Instant,
        timeout: Duration,
        ready: impl Fn(&Self) -> bool,
    ) -> Result<(), NetworkError> {
        while !ready(self) {
            if Instant::now() >= deadline {
                return Err(NetworkError::Timeout(timeout.as_millis() as u64));
            }
            thread::sleep(LINK_POLL);
        }
        Ok(())
    }
}

fn read_wake_cause() -> WakeCause {
    let cause = unsafe { esp_idf_svc::sys::esp_sleep_get_wakeup_cause() };
    if cause == esp_idf_svc::sys::esp_sleep_source_t_ESP_SLEEP_WAKEUP_UNDEFINED {
        WakeCause::PowerOn
    } else {
        WakeCause::DeepSleep
    }
}

fn set_tx_power(dbm: i8) {
    // The driver takes quarter-dBm units.
    let rc = unsafe { esp_idf_svc::sys::esp_wifi_set_max_tx_power(dbm.saturating_mul(4)) };
    if rc != esp_idf_svc::sys::ESP_OK {
        warn!("failed to set wifi tx power: esp_err_t={rc}");
    }
}

fn sample_burst(mut read: impl FnMut() -> Result<u16, EspError>) -> Result<i32, EspError> {
    let mut samples = [0_i32; SAMPLES_PER_READING];
    for sample in &mut samples {
        *sample = i32::from(read()?);
        thread::sleep(SAMPLE_SPACING);
    }
    Ok(average_raw(&samples).unwrap_or_default())
}

impl Acquisition for EspBoard {
    fn read_channel(&mut self, channel: AdcChannel) -> Result<AdcReading, AcquisitionError> {
        let read_failed = |err: EspError| AcquisitionError::ReadFailed {
            channel,
            message: err.to_string(),
        };

        let raw = match channel {
            AdcChannel::Battery => sample_burst(|| self.battery_adc.read_raw()),
            AdcChannel::Sensor => {
                self.sensor_power.set_high().map_err(read_failed)?;
                thread::sleep(SENSOR_WARMUP);
                let raw = sample_burst(|| self.sensor_adc.read_raw());
                if let Err(err) = self.sensor_power.set_low() {
                    warn!("failed to switch sensor supply off: {err}");
                }
                raw
            }
        }
        .map_err(read_failed)?;

        Ok(self.calibration.reading(channel, raw))
    }
}

impl RetainedMemory for EspBoard {
    fn load(&mut self) -> Result<Vec<u8>, PersistenceError> {
        let bytes = unsafe { core::ptr::addr_of!(RETAINED_COUNTER).read_volatile() };
        Ok(bytes.to_vec())
    }

    fn store(&mut self, bytes: &[u8]) -> Result<(), PersistenceError> {
        let bytes: [u8; CycleCounter::RETAINED_LEN] = bytes.try_into().map_err(|_| {
            PersistenceError::Write(format!(
                "expected {} bytes, got {}",
                CycleCounter::RETAINED_LEN,
                bytes.len()
            ))
        })?;
        unsafe { core::ptr::addr_of_mut!(RETAINED_COUNTER).write_volatile(bytes) };
        Ok(())
    }
}

impl Uplink for EspBoard {
    fn connect(&mut self, timeout: Duration) -> Result<(), NetworkError> {
        let deadline = Instant::now() + timeout;

        if !self.wifi_up() {
            if self.wifi_started {
                self.reassociate()?;
            } else {
                self.start_wifi()?;
            }
            self.wait_until(deadline, timeout, Self::wifi_up)?;
            info!("wifi connected");
        }

        if self.mqtt.is_none() {
            self.mqtt = Some(self.start_mqtt()?);
        }
        self.wait_until(deadline, timeout, |board| {
            board.mqtt_connected.load(Ordering::Acquire)
        })?;

        let topic = self.status_topic.clone();
        self.publish_with_retain(&topic, STATUS_ONLINE.as_bytes(), true)
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), NetworkError> {
        self.publish_with_retain(topic, payload, false)
    }

    fn disconnect(&mut self) {
        self.mqtt = None;
        self.mqtt_connected.store(false, Ordering::Release);
        if self.wifi_started {
            if let Err(err) = self.wifi.disconnect() {
                debug!("wifi disconnect: {err}");
            }
            if let Err(err) = self.wifi.stop() {
                warn!("failed to stop wifi: {err}");
            }
            self.wifi_started = false;
        }
    }
}

impl EspBoard {
    fn publish_with_retain(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), NetworkError> {
        let publish_error = |message: String| NetworkError::Publish {
            topic: topic.to_string(),
            message,
        };
        let client = self
            .mqtt
            .as_mut()
            .ok_or_else(|| publish_error("mqtt client not started".to_string()))?;
        client
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .map(|_| ())
            .map_err(|err| publish_error(err.to_string()))
    }
}

impl WakeButton for EspBoard {
    fn is_pressed(&mut self) -> Result<bool, AcquisitionError> {
        Ok(self.button.is_low())
    }
}

impl StatusLed for EspBoard {
    fn set(&mut self, on: bool) {
        // Active low.
        let result = if on {
            self.led.set_low()
        } else {
            self.led.set_high()
        };
        if let Err(err) = result {
            warn!("failed to drive status led: {err}");
        }
    }
}

impl Clock for EspBoard {
    fn delay(&mut self, duration: Duration) {
        thread::sleep(duration);
    }

    fn epoch_seconds(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

impl Board for EspBoard {
    type DisplayBus = I2cDriver<'static>;

    fn wake_cause(&self) -> WakeCause {
        self.wake
    }

    fn take_display_bus(&mut self) -> Option<Self::DisplayBus> {
        self.display_bus.take()
    }

    fn park(&mut self) {
        if let Err(err) = self.sensor_power.set_low() {
            warn!("failed to switch sensor supply off: {err}");
        }
        self.set(false);
        self.disconnect();
    }
}
