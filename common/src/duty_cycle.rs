use core::time::Duration;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, error, info, warn};

use crate::{
    board::{AdcChannel, AdcReading, Board, WakeCause},
    calibration::fallback_reading,
    config::{NodeConfig, SOFTWARE_VERSION},
    counter::CycleCounter,
    display::DisplayController,
    error::NetworkError,
    render,
    telemetry::{RecordContext, TelemetryRecord},
    zone::{classify, zone_table_summary, Classification},
};

const LED_BLINK_PERIOD: Duration = Duration::from_millis(100);
const BOOT_BLINKS: u32 = 3;
const BUTTON_BLINKS: u32 = 2;
const SENSOR_BLINKS: u32 = 2;
const SENSOR_BLINK_PERIOD: Duration = Duration::from_millis(50);
const UPLINK_BLINKS: u32 = 3;
const FATAL_BLINKS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Boot,
    Measuring,
    Rendering,
    Transmitting,
    AwaitingButton,
    Sleeping,
}

/// Terminal action of a cycle. The platform has to power down for `duration`.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeepSleep {
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Next(Phase),
    Sleep(DeepSleep),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub count: u32,
    pub battery: AdcReading,
    pub sensor: AdcReading,
    pub battery_percent: u8,
    pub sensor_percent: u8,
    pub classification: Classification,
}

pub struct DutyCycleController<B: Board> {
    board: B,
    config: NodeConfig,
    display: Option<DisplayController<B::DisplayBus>>,
    counter: CycleCounter,
    phase: Phase,
    measurement: Option<Measurement>,
}

impl<B: Board> DutyCycleController<B> {
    pub fn new(board: B, mut config: NodeConfig) -> Self {
        config.sanitize();
        Self {
            board,
            config,
            display: None,
            counter: CycleCounter::default(),
            phase: Phase::Boot,
            measurement: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn counter(&self) -> CycleCounter {
        self.counter
    }

    pub fn last_measurement(&self) -> Option<&Measurement> {
        self.measurement.as_ref()
    }

    pub fn is_headless(&self) -> bool {
        self.display.is_none()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn into_board(self) -> B {
        self.board
    }

    pub fn step(&mut self) -> Step {
        let step = match self.phase {
            Phase::Boot => Step::Next(self.boot()),
            Phase::Measuring => Step::Next(self.measure()),
            Phase::Rendering => Step::Next(self.render()),
            Phase::Transmitting => Step::Next(self.transmit()),
            Phase::AwaitingButton => Step::Next(self.await_button()),
            Phase::Sleeping => Step::Sleep(self.sleep()),
        };
        if let Step::Next(phase) = step {
            debug!("duty cycle: {:?} -> {phase:?}", self.phase);
            self.phase = phase;
        }
        step
    }

    pub fn run(&mut self) -> DeepSleep {
        loop {
            if let Step::Sleep(deep_sleep) = self.step() {
                return deep_sleep;
            }
        }
    }

    /// Like [`Self::run`], but a panic anywhere in the cycle ends in
    /// [`Self::signal_fatal`] and `None`; the node must halt.
    pub fn run_guarded(&mut self) -> Option<DeepSleep> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.run())) {
            Ok(deep_sleep) => Some(deep_sleep),
            Err(_) => {
                error!("duty cycle aborted in {:?}", self.phase);
                self.signal_fatal();
                None
            }
        }
    }

    pub fn signal_fatal(&mut self) {
        if let Some(display) = self.display.as_mut() {
            if let Err(err) = render::show_message(display, "Stop") {
                warn!("fatal screen failed: {err}");
            }
        }
        self.board.blink(FATAL_BLINKS, LED_BLINK_PERIOD);
    }

    fn boot(&mut self) -> Phase {
        let wake = self.board.wake_cause();
        self.counter = match wake {
            WakeCause::DeepSleep => self.load_counter(),
            WakeCause::PowerOn => CycleCounter::default(),
        };
        info!(
            "booting {} v{SOFTWARE_VERSION} ({wake:?}, counter {})",
            self.config.device.name, self.counter
        );
        for line in zone_table_summary() {
            debug!("zone {line}");
        }

        self.display = self.bring_up_display();
        self.board.blink(BOOT_BLINKS, LED_BLINK_PERIOD);
        Phase::Measuring
    }

    fn load_counter(&mut self) -> CycleCounter {
        match self.board.load() {
            Ok(bytes) => CycleCounter::from_retained(&bytes).unwrap_or_else(|| {
                warn!("retained counter holds {} bytes, starting at 0", bytes.len());
                CycleCounter::default()
            }),
            Err(err) => {
                warn!("{err}, starting counter at 0");
                CycleCounter::default()
            }
        }
    }

    fn bring_up_display(&mut self) -> Option<DisplayController<B::DisplayBus>> {
        let Some(bus) = self.board.take_display_bus() else {
            info!("no display bus, running headless");
            return None;
        };

        let mut display = DisplayController::new(bus);
        if let Err(err) = display.initialize() {
            warn!("display init failed, running headless: {err}");
            return None;
        }
        display.contrast(self.config.display.contrast);
        if let Err(err) = display.set_orientation(self.config.display.flipped) {
            warn!("display orientation failed: {err}");
        }
        if let Err(err) = render::show_splash(&mut display, SOFTWARE_VERSION) {
            warn!("splash screen failed: {err}");
        }
        self.board
            .delay(Duration::from_millis(self.config.cycle.splash_ms));
        Some(display)
    }

    fn measure(&mut self) -> Phase {
        let count = self.counter.increment();

        self.board.set(true);
        let battery = self.sample(AdcChannel::Battery);
        self.board.set(false);

        self.board.blink(SENSOR_BLINKS, SENSOR_BLINK_PERIOD);
        let sensor = self.sample(AdcChannel::Sensor);
        let classification = classify(sensor.raw);

        let calibration = &self.config.calibration;
        let measurement = Measurement {
            count,
            battery,
            sensor,
            battery_percent: calibration.battery_percent(battery.voltage),
            sensor_percent: calibration.sensor_percent(sensor.raw),
            classification,
        };
        info!(
            "cycle #{count}: battery {:.4} V ({} %), sensor {} / {:.4} V ({} %) -> {}",
            battery.voltage,
            measurement.battery_percent,
            sensor.raw,
            sensor.voltage,
            measurement.sensor_percent,
            classification.status
        );

        self.measurement = Some(measurement);
        Phase::Rendering
    }

    fn sample(&mut self, channel: AdcChannel) -> AdcReading {
        self.board.read_channel(channel).unwrap_or_else(|err| {
            let fallback = fallback_reading(channel);
            warn!("{err}, using fallback {fallback:?}");
            fallback
        })
    }

    fn render(&mut self) -> Phase {
        let dwell = self.config.cycle.dwell();
        let Some(measurement) = self.measurement else {
            return Phase::Transmitting;
        };

        if let Some(display) = self.display.as_mut() {
            if let Err(err) = render::show_readings(
                display,
                measurement.battery.voltage,
                measurement.sensor.voltage,
                measurement.classification.status,
                measurement.count,
            ) {
                warn!("readings screen failed: {err}");
            }
        }
        self.board.delay(dwell);

        if let Some(display) = self.display.as_mut() {
            if let Err(err) = render::show_zone_icon(display, measurement.sensor.raw) {
                warn!("icon screen failed: {err}");
            }
        }
        self.board.delay(dwell);

        Phase::Transmitting
    }

    fn transmit(&mut self) -> Phase {
        let Some(measurement) = self.measurement else {
            return Phase::AwaitingButton;
        };

        match self.publish(&measurement) {
            Ok(()) => {
                info!("published cycle #{} to {}", measurement.count, self.config.device.topic);
                self.board
                    .delay(Duration::from_millis(self.config.cycle.publish_settle_ms));
            }
            Err(err) => warn!("telemetry skipped: {err}"),
        }
        Phase::AwaitingButton
    }

    fn publish(&mut self, measurement: &Measurement) -> Result<(), NetworkError> {
        let timeout = Duration::from_millis(self.config.network.connect_timeout_ms);
        self.board.blink(UPLINK_BLINKS, LED_BLINK_PERIOD);
        self.board.connect(timeout)?;

        let record = TelemetryRecord::new(
            RecordContext {
                devicename: &self.config.device.name,
                software_version: SOFTWARE_VERSION,
                timestamp: self.board.epoch_seconds(),
                measurement_count: measurement.count,
            },
            &self.config.calibration,
            measurement.battery,
            measurement.sensor,
            measurement.classification.status,
        );
        let payload = record
            .to_json()
            .map_err(|err| NetworkError::Encode(err.to_string()))?;
        self.board.publish(&self.config.device.topic, &payload)
    }

    fn await_button(&mut self) -> Phase {
        if self.wait_for_button() {
            info!("button pressed, measuring again");
            self.board.blink(BUTTON_BLINKS, LED_BLINK_PERIOD);
            self.board
                .delay(Duration::from_millis(self.config.cycle.button_settle_ms));
            return Phase::Measuring;
        }

        if self.config.cycle.sleep().is_some() {
            Phase::Sleeping
        } else {
            self.board
                .delay(Duration::from_millis(self.config.cycle.continuous_pause_ms));
            Phase::Measuring
        }
    }

    fn wait_for_button(&mut self) -> bool {
        let cycle = &self.config.cycle;
        let interval = cycle.button_poll_interval();
        let polls = (cycle.button_poll().as_millis() / interval.as_millis()).max(1);

        for _ in 0..polls {
            match self.board.is_pressed() {
                Ok(true) => return true,
                Ok(false) => {}
                Err(err) => {
                    warn!("{err}, skipping button window");
                    return false;
                }
            }
            self.board.delay(interval);
        }
        false
    }

    fn sleep(&mut self) -> DeepSleep {
        if let Err(err) = self.board.store(&self.counter.to_retained()) {
            warn!("counter not retained: {err}");
        }
        self.park();

        let duration = Duration::from_secs(self.config.cycle.sleep_secs);
        info!("deep sleep for {}s after cycle #{}", duration.as_secs(), self.counter);
        DeepSleep { duration }
    }

    fn park(&mut self) {
        if let Some(display) = self.display.as_mut() {
            if let Err(err) = render::show_message(display, "") {
                warn!("display blanking failed: {err}");
            }
            display.power(false);
        }
        self.board.set(false);
        self.board.disconnect();
        self.board.park();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    use super::*;
    use crate::{
        error::{AcquisitionError, PersistenceError},
        icons::IconId,
        testing::{MockBoard, RecordingBus},
        zone::{MoistureStatus, MoistureZone},
    };

    fn controller(board: MockBoard) -> DutyCycleController<MockBoard> {
        DutyCycleController::new(board, NodeConfig::default())
    }

    fn advance_to(controller: &mut DutyCycleController<MockBoard>, phase: Phase) {
        for _ in 0..16 {
            if controller.phase() == phase {
                return;
            }
            assert!(matches!(controller.step(), Step::Next(_)));
        }
        panic!("never reached {phase:?}");
    }

    fn published_json(board: &MockBoard) -> Value {
        let (_, payload) = board.published.last().unwrap();
        serde_json::from_slice(payload).unwrap()
    }

    #[test]
    fn optimal_sample_is_rendered_and_published_as_ok() {
        let mut controller = controller(MockBoard::new(600));

        advance_to(&mut controller, Phase::AwaitingButton);

        let measurement = controller.last_measurement().unwrap();
        assert_eq!(measurement.classification.zone, MoistureZone::Optimal);
        assert_eq!(measurement.classification.icon, IconId::FlowerTwoLeaves);
        assert_eq!(measurement.classification.icon.as_u8(), 3);
        assert_eq!(measurement.sensor_percent, 58);

        let board = controller.board();
        assert_eq!(board.published.len(), 1);
        assert_eq!(board.published[0].0, "home/feuchtesensor/01");
        let payload = published_json(board);
        assert_eq!(payload["s_moisture_status"], "OK");
        assert_eq!(payload["device"]["measurement_count"], 1);
        assert_eq!(payload["sensor"]["s_adc"], 600);
        assert_eq!(board.connects, vec![Duration::from_millis(15_000)]);
    }

    #[test]
    fn out_of_range_sample_is_overload() {
        let mut controller = controller(MockBoard::new(900));

        advance_to(&mut controller, Phase::AwaitingButton);

        let classification = controller.last_measurement().unwrap().classification;
        assert_eq!(classification.zone, MoistureZone::Overload);
        assert_eq!(classification.icon.as_u8(), 6);
        assert_eq!(published_json(controller.board())["s_moisture_status"], "OL");
    }

    #[test]
    fn failed_uplink_skips_publish_and_waits_for_button() {
        let mut board = MockBoard::new(600);
        board.connect_result = Err(NetworkError::Timeout(15_000));
        let mut controller = controller(board);
        advance_to(&mut controller, Phase::Transmitting);

        assert_eq!(controller.step(), Step::Next(Phase::AwaitingButton));
        assert!(controller.board().published.is_empty());
    }

    #[test]
    fn button_press_measures_again_without_storing_counter() {
        let mut board = MockBoard::new(600);
        board.button.extend([Ok(false), Ok(false), Ok(true)]);
        let mut controller = controller(board);
        advance_to(&mut controller, Phase::AwaitingButton);

        assert_eq!(controller.step(), Step::Next(Phase::Measuring));
        assert!(controller.board().stored.is_empty());
        let cycle_pulses = 1 + SENSOR_BLINKS + UPLINK_BLINKS;
        assert_eq!(
            controller.board().led_pulses(),
            (BOOT_BLINKS + cycle_pulses + BUTTON_BLINKS) as usize
        );

        controller.step();
        assert_eq!(controller.counter().get(), 2);
    }

    #[test]
    fn idle_window_leads_to_sleep_with_counter_stored() {
        let mut controller = controller(MockBoard::new(600));

        let deep_sleep = controller.run();

        assert_eq!(deep_sleep.duration, Duration::from_secs(60));
        let board = controller.board();
        assert_eq!(board.button_polls, 50);
        assert_eq!(board.stored, vec![vec![1, 0, 0, 0]]);
        assert!(board.parked);
        assert_eq!(board.disconnects, 1);
        assert_eq!(board.led.last(), Some(&false));
    }

    #[test]
    fn failed_counter_store_still_parks_and_sleeps() {
        let mut board = MockBoard::new(600);
        board.store_result = Err(PersistenceError::Write("rtc memory".to_string()));
        let mut controller = controller(board);

        let deep_sleep = controller.run();

        assert_eq!(deep_sleep, DeepSleep { duration: Duration::from_secs(60) });
        let board = controller.board();
        assert_eq!(board.stored, vec![vec![1, 0, 0, 0]]);
        assert!(board.parked);
        assert_eq!(board.disconnects, 1);
        assert_eq!(board.led.last(), Some(&false));
    }

    #[test]
    fn measuring_and_uplink_drive_led_cues() {
        let mut controller = controller(MockBoard::new(600));
        controller.step();
        let boot_led = controller.board().led.len();

        controller.step();
        let measuring_led = controller.board().led[boot_led..].to_vec();
        assert_eq!(measuring_led, [true, false, true, false, true, false]);
        let sensor_delays = &controller.board().delays[controller.board().delays.len() - 4..];
        assert!(sensor_delays.iter().all(|delay| *delay == SENSOR_BLINK_PERIOD));

        advance_to(&mut controller, Phase::Transmitting);
        let before = controller.board().led_pulses();
        controller.step();
        assert_eq!(controller.board().led_pulses(), before + UPLINK_BLINKS as usize);
    }

    #[test]
    fn panic_in_cycle_shows_stop_and_halts() {
        let mut board = MockBoard::new(600);
        board.panic_on_publish = true;
        let bus = board.display_bus.clone().unwrap();
        let mut controller = controller(board);

        assert_eq!(controller.run_guarded(), None);

        assert_eq!(controller.phase(), Phase::Transmitting);
        let board = controller.board();
        assert!(board.stored.is_empty());
        assert!(!board.parked);
        let cycle_pulses = 1 + SENSOR_BLINKS + UPLINK_BLINKS;
        assert_eq!(
            board.led_pulses(),
            (BOOT_BLINKS + cycle_pulses + FATAL_BLINKS) as usize
        );
        let writes = bus.writes();
        let stop_frame = &writes[writes.len() - 20..];
        assert!(stop_frame
            .iter()
            .any(|bytes| bytes[0] == 0x40 && bytes[1..].iter().any(|b| *b != 0)));
    }

    #[test]
    fn guarded_run_passes_deep_sleep_through() {
        let mut controller = controller(MockBoard::new(600));

        assert_eq!(
            controller.run_guarded(),
            Some(DeepSleep { duration: Duration::from_secs(60) })
        );
    }

    #[test]
    fn parking_blanks_and_powers_off_display() {
        let board = MockBoard::new(600);
        let bus: RecordingBus = board.display_bus.clone().unwrap();
        let mut controller = controller(board);
        advance_to(&mut controller, Phase::Sleeping);
        bus.clear();

        let _ = controller.step();

        let writes = bus.writes();
        assert_eq!(writes.last(), Some(&vec![0x00, 0xAE]));
        let data_bursts: Vec<_> = writes.iter().filter(|bytes| bytes[0] == 0x40).collect();
        assert_eq!(data_bursts.len(), 5);
        assert!(data_bursts.iter().all(|bytes| bytes[1..].iter().all(|b| *b == 0)));
    }

    #[test]
    fn deep_sleep_wake_resumes_retained_counter() {
        let mut board = MockBoard::new(600);
        board.wake = WakeCause::DeepSleep;
        board.retained = Ok(41_u32.to_le_bytes().to_vec());
        let mut controller = controller(board);

        let deep_sleep = controller.run();

        assert_eq!(deep_sleep.duration, Duration::from_secs(60));
        assert_eq!(controller.counter().get(), 42);
        assert_eq!(controller.board().stored, vec![vec![42, 0, 0, 0]]);
        assert_eq!(published_json(controller.board())["device"]["measurement_count"], 42);
    }

    #[test]
    fn power_on_ignores_retained_memory() {
        let mut board = MockBoard::new(600);
        board.retained = Ok(vec![9, 0, 0, 0]);
        let mut controller = controller(board);

        controller.step();

        assert_eq!(controller.counter().get(), 0);
        assert_eq!(controller.board().loads, 0);
    }

    #[test]
    fn unusable_retained_memory_starts_counter_at_zero() {
        for retained in [Ok(vec![1, 2]), Err(PersistenceError::Unavailable)] {
            let mut board = MockBoard::new(600);
            board.wake = WakeCause::DeepSleep;
            board.retained = retained;
            let mut controller = controller(board);

            controller.step();

            assert_eq!(controller.counter().get(), 0);
            assert_eq!(controller.board().loads, 1);
        }
    }

    #[test]
    fn continuous_mode_pauses_then_measures() {
        let mut config = NodeConfig::default();
        config.cycle.sleep_secs = 0;
        let mut controller = DutyCycleController::new(MockBoard::new(600), config);
        advance_to(&mut controller, Phase::AwaitingButton);

        assert_eq!(controller.step(), Step::Next(Phase::Measuring));
        assert_eq!(
            controller.board().delays.last(),
            Some(&Duration::from_millis(3_000))
        );
        assert!(controller.board().stored.is_empty());
    }

    #[test]
    fn acquisition_failures_use_fallback_readings() {
        let mut board = MockBoard::new(600);
        board.battery = Err(AcquisitionError::ChannelUnavailable(AdcChannel::Battery));
        board.sensor = Err(AcquisitionError::ReadFailed {
            channel: AdcChannel::Sensor,
            message: "timeout".to_string(),
        });
        let mut controller = controller(board);

        advance_to(&mut controller, Phase::Rendering);

        let measurement = controller.last_measurement().unwrap();
        assert_eq!(measurement.battery.raw, 0);
        assert_eq!(measurement.battery.voltage, 3.7);
        assert_eq!(measurement.sensor.raw, 2000);
        assert_eq!(measurement.classification.status, MoistureStatus::Overload);
    }

    #[test]
    fn display_failure_runs_headless_and_still_publishes() {
        let board = MockBoard::new(600);
        if let Some(bus) = board.display_bus.as_ref() {
            bus.fail_after(0);
        }
        let mut controller = controller(board);

        advance_to(&mut controller, Phase::AwaitingButton);

        assert!(controller.is_headless());
        assert_eq!(controller.board().published.len(), 1);
    }

    #[test]
    fn missing_display_bus_keeps_dwell_times() {
        let mut board = MockBoard::new(600);
        board.display_bus = None;
        let mut controller = controller(board);
        advance_to(&mut controller, Phase::Rendering);
        let before = controller.board().delays.len();

        controller.step();

        assert!(controller.is_headless());
        let delays = &controller.board().delays[before..];
        assert_eq!(delays, [Duration::from_millis(3_000), Duration::from_millis(3_000)]);
    }

    #[test]
    fn button_read_error_ends_window() {
        let mut board = MockBoard::new(600);
        board
            .button
            .push_back(Err(AcquisitionError::Button("gpio".to_string())));
        let mut controller = controller(board);
        advance_to(&mut controller, Phase::AwaitingButton);

        assert_eq!(controller.step(), Step::Next(Phase::Sleeping));
        assert_eq!(controller.board().button_polls, 1);
    }

    #[test]
    fn fatal_signal_shows_stop_and_flashes() {
        let board = MockBoard::new(600);
        let bus = board.display_bus.clone().unwrap();
        let mut controller = controller(board);
        controller.step();
        let pulses = controller.board().led_pulses();
        bus.clear();

        controller.signal_fatal();

        assert_eq!(controller.board().led_pulses(), pulses + 10);
        assert_eq!(bus.writes().len(), 20);
    }
}
