use std::{
    convert::Infallible,
    fs, io,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use embedded_hal::i2c::{ErrorType, I2c, Operation};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tracing::{debug, info, trace, warn};

use moisture_common::{
    calibration::{average_raw, SAMPLES_PER_READING, SAMPLE_SPACING},
    config::CalibrationConfig,
    display::{PAGES, WIDTH},
    status_topic, Acquisition, AcquisitionError, AdcChannel, AdcReading, Board, Clock, DeepSleep,
    DutyCycleController, NetworkError, NodeConfig, PersistenceError, RetainedMemory, StatusLed,
    Uplink, WakeButton, WakeCause, STATUS_ONLINE,
};

const DEFAULT_CONFIG_PATH: &str = "node-config.json";
const DEFAULT_RETAINED_PATH: &str = "moisture-retained.bin";
const DEFAULT_BUTTON_PATH: &str = "button.press";
const DEFAULT_SENSOR_ADC: i32 = 600;
const DELAY_SLICE: Duration = Duration::from_millis(100);
const MAX_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = load_config()?;

    let mut mqtt_options = MqttOptions::new(
        config.device.name.clone(),
        config.network.mqtt_host.clone(),
        config.network.mqtt_port,
    );
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    if !config.network.mqtt_user.is_empty() {
        mqtt_options.set_credentials(
            config.network.mqtt_user.clone(),
            config.network.mqtt_pass.clone(),
        );
    }

    let (mqtt, mut eventloop) = AsyncClient::new(mqtt_options, 32);
    let connected = Arc::new(AtomicBool::new(false));

    let broker_up = connected.clone();
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("mqtt broker connected");
                    broker_up.store(true, Ordering::Release);
                }
                Ok(_) => {}
                Err(err) => {
                    broker_up.store(false, Ordering::Release);
                    warn!("sensor mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });

    let shutdown = Arc::new(AtomicBool::new(false));
    let board = HostBoard::new(mqtt, connected, shutdown.clone(), &config);
    let boots = std::env::var("NODE_BOOTS")
        .ok()
        .and_then(|value| value.parse::<u32>().ok());

    info!("moisture node simulation started as `{}`", config.device.name);

    let mut node = tokio::task::spawn_blocking(move || run_node(board, config, boots));

    tokio::select! {
        result = &mut node => result.context("node task panicked")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            info!("shutting down after the current phase");
            shutdown.store(true, Ordering::Release);
            node.await.context("node task panicked")?
        }
    }
}

/// Boot, run one duty cycle, "deep sleep", repeat.
fn run_node(mut board: HostBoard, config: NodeConfig, boots: Option<u32>) -> anyhow::Result<()> {
    let mut boot = 0_u32;
    loop {
        if board.is_shutting_down() || boots.is_some_and(|limit| boot >= limit) {
            return Ok(());
        }
        boot += 1;

        let mut controller = DutyCycleController::new(board, config.clone());
        let Some(deep_sleep) = controller.run_guarded() else {
            anyhow::bail!("duty cycle aborted on boot {boot}, node halted");
        };
        board = controller.into_board();
        board.deep_sleep(deep_sleep);
    }
}

fn load_config() -> anyhow::Result<NodeConfig> {
    let path = std::env::var("NODE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = match fs::read_to_string(&path) {
        Ok(raw) => serde_json::from_str::<NodeConfig>(&raw)
            .with_context(|| format!("invalid node config in `{path}`"))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!("no node config at `{path}`, using defaults");
            NodeConfig::default()
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read node config `{path}`"));
        }
    };

    if let Ok(host) = std::env::var("MQTT_HOST") {
        config.network.mqtt_host = host;
    }
    if let Some(port) = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        config.network.mqtt_port = port;
    }
    if let Ok(user) = std::env::var("MQTT_USER") {
        config.network.mqtt_user = user;
        config.network.mqtt_pass = std::env::var("MQTT_PASS").unwrap_or_default();
    }
    if let Some(sleep_secs) = std::env::var("SLEEP_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
    {
        config.cycle.sleep_secs = sleep_secs;
    }

    config.sanitize();
    Ok(config)
}

/// Slowly drifting samples around a configurable sensor level.
struct SimulatedProbe {
    sensor_base: i32,
    tick: u32,
}

impl SimulatedProbe {
    fn sample(&mut self, channel: AdcChannel) -> i32 {
        self.tick = self.tick.wrapping_add(1);
        let jitter = (self.tick.wrapping_mul(37) % 61) as i32 - 30;
        match channel {
            AdcChannel::Sensor => self.sensor_base + jitter,
            AdcChannel::Battery => 2_300 - (self.tick / 200) as i32 + jitter / 10,
        }
    }
}

struct HostBoard {
    mqtt: AsyncClient,
    connected: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    calibration: CalibrationConfig,
    status_topic: String,
    retained_path: PathBuf,
    button_path: PathBuf,
    probe: SimulatedProbe,
    wake: WakeCause,
    led_on: bool,
}

impl HostBoard {
    fn new(
        mqtt: AsyncClient,
        connected: Arc<AtomicBool>,
        shutdown: Arc<AtomicBool>,
        config: &NodeConfig,
    ) -> Self {
        let env_path = |key: &str, default: &str| {
            PathBuf::from(std::env::var(key).unwrap_or_else(|_| default.to_string()))
        };
        let sensor_base = std::env::var("SIM_SENSOR_ADC")
            .ok()
            .and_then(|value| value.parse::<i32>().ok())
            .unwrap_or(DEFAULT_SENSOR_ADC);

        Self {
            mqtt,
            connected,
            shutdown,
            calibration: config.calibration.clone(),
            status_topic: status_topic(&config.device.topic),
            retained_path: env_path("RETAINED_PATH", DEFAULT_RETAINED_PATH),
            button_path: env_path("BUTTON_PATH", DEFAULT_BUTTON_PATH),
            probe: SimulatedProbe {
                sensor_base,
                tick: 0,
            },
            wake: WakeCause::PowerOn,
            led_on: false,
        }
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn deep_sleep(&mut self, deep_sleep: DeepSleep) {
        info!("simulated deep sleep for {}s", deep_sleep.duration.as_secs());
        self.delay(deep_sleep.duration);
        self.wake = WakeCause::DeepSleep;
    }
}

impl Acquisition for HostBoard {
    fn read_channel(&mut self, channel: AdcChannel) -> Result<AdcReading, AcquisitionError> {
        let mut samples = [0_i32; SAMPLES_PER_READING];
        for sample in &mut samples {
            *sample = self.probe.sample(channel);
            thread::sleep(SAMPLE_SPACING);
        }
        let raw = average_raw(&samples).ok_or(AcquisitionError::ChannelUnavailable(channel))?;
        Ok(self.calibration.reading(channel, raw))
    }
}

impl RetainedMemory for HostBoard {
    fn load(&mut self) -> Result<Vec<u8>, PersistenceError> {
        match fs::read(&self.retained_path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(PersistenceError::Read(err.to_string())),
        }
    }

    fn store(&mut self, bytes: &[u8]) -> Result<(), PersistenceError> {
        fs::write(&self.retained_path, bytes).map_err(|err| PersistenceError::Write(err.to_string()))
    }
}

impl Uplink for HostBoard {
    fn connect(&mut self, timeout: Duration) -> Result<(), NetworkError> {
        let deadline = Instant::now() + timeout;
        while !self.connected.load(Ordering::Acquire) {
            if Instant::now() >= deadline || self.is_shutting_down() {
                return Err(NetworkError::Timeout(timeout.as_millis() as u64));
            }
            thread::sleep(Duration::from_millis(50));
        }

        self.mqtt
            .try_publish(&self.status_topic, QoS::AtLeastOnce, true, STATUS_ONLINE)
            .map_err(|err| NetworkError::Publish {
                topic: self.status_topic.clone(),
                message: err.to_string(),
            })
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), NetworkError> {
        self.mqtt
            .try_publish(topic, QoS::AtLeastOnce, false, payload.to_vec())
            .map_err(|err| NetworkError::Publish {
                topic: topic.to_string(),
                message: err.to_string(),
            })
    }

    fn disconnect(&mut self) {
        // The simulated radio keeps its broker session across reboots.
        debug!("uplink idle");
    }
}

impl WakeButton for HostBoard {
    /// A press is simulated by creating the trigger file; it is consumed on read.
    fn is_pressed(&mut self) -> Result<bool, AcquisitionError> {
        if !self.button_path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.button_path).map_err(|err| AcquisitionError::Button(err.to_string()))?;
        Ok(true)
    }
}

impl StatusLed for HostBoard {
    fn set(&mut self, on: bool) {
        if self.led_on != on {
            trace!("led {}", if on { "on" } else { "off" });
            self.led_on = on;
        }
    }
}

impl Clock for HostBoard {
    fn delay(&mut self, duration: Duration) {
        let deadline = deadline_after(Instant::now(), duration);
        while !self.is_shutting_down() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(DELAY_SLICE.min(deadline - now));
        }
    }

    fn epoch_seconds(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

impl Board for HostBoard {
    type DisplayBus = PanelMirror;

    fn wake_cause(&self) -> WakeCause {
        self.wake
    }

    fn take_display_bus(&mut self) -> Option<Self::DisplayBus> {
        Some(PanelMirror::default())
    }

    fn park(&mut self) {
        debug!("sensor supply off, radio off");
    }
}

fn deadline_after(now: Instant, duration: Duration) -> Instant {
    now.checked_add(duration).unwrap_or(now + MAX_DELAY)
}

/// Stand-in for the OLED: tracks page writes and traces each completed frame.
struct PanelMirror {
    page: usize,
    frame: [[u8; WIDTH as usize]; PAGES],
}

impl Default for PanelMirror {
    fn default() -> Self {
        Self {
            page: 0,
            frame: [[0; WIDTH as usize]; PAGES],
        }
    }
}

impl PanelMirror {
    fn trace_frame(&self) {
        let rows: Vec<String> = (0..PAGES * 8)
            .map(|y| {
                self.frame[y / 8]
                    .iter()
                    .map(|column| if (column >> (y % 8)) & 1 == 1 { '#' } else { '.' })
                    .collect()
            })
            .collect();
        trace!("panel frame\n{}", rows.join("\n"));
    }
}

impl ErrorType for PanelMirror {
    type Error = Infallible;
}

impl I2c for PanelMirror {
    fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for operation in operations {
            let Operation::Write(bytes) = operation else {
                continue;
            };
            match *bytes {
                [0x00, command @ 0xB0..=0xB7] => self.page = usize::from(command - 0xB0),
                [0x40, data @ ..] if self.page < PAGES => {
                    let len = data.len().min(WIDTH as usize);
                    self.frame[self.page][..len].copy_from_slice(&data[..len]);
                    if self.page == PAGES - 1 {
                        self.trace_frame();
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
