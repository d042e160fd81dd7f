use std::{cell::RefCell, collections::VecDeque, rc::Rc, time::Duration};

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

use crate::{
    board::{
        Acquisition, AdcChannel, AdcReading, Board, Clock, RetainedMemory, StatusLed, Uplink,
        WakeButton, WakeCause,
    },
    config::CalibrationConfig,
    error::{AcquisitionError, NetworkError, PersistenceError},
};

#[derive(Debug, Default)]
struct BusLog {
    writes: Vec<(u8, Vec<u8>)>,
    remaining_ok: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingBus {
    log: Rc<RefCell<BusLog>>,
}

impl RecordingBus {
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.log
            .borrow()
            .writes
            .iter()
            .map(|(_, bytes)| bytes.clone())
            .collect()
    }

    pub fn addresses(&self) -> Vec<u8> {
        self.log.borrow().writes.iter().map(|(address, _)| *address).collect()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().writes.clear();
    }

    /// Lets `count` more writes through, then fails every write.
    pub fn fail_after(&self, count: usize) {
        self.log.borrow_mut().remaining_ok = Some(count);
    }
}

impl ErrorType for RecordingBus {
    type Error = ErrorKind;
}

impl I2c for RecordingBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut log = self.log.borrow_mut();
        for operation in operations {
            match log.remaining_ok {
                Some(0) => return Err(ErrorKind::Other),
                Some(ref mut remaining) => *remaining -= 1,
                None => {}
            }
            match operation {
                Operation::Write(bytes) => log.writes.push((address, bytes.to_vec())),
                Operation::Read(buffer) => buffer.fill(0),
            }
        }
        Ok(())
    }
}

pub struct MockBoard {
    pub wake: WakeCause,
    pub battery: Result<AdcReading, AcquisitionError>,
    pub sensor: Result<AdcReading, AcquisitionError>,
    pub retained: Result<Vec<u8>, PersistenceError>,
    pub loads: usize,
    pub stored: Vec<Vec<u8>>,
    pub store_result: Result<(), PersistenceError>,
    pub connect_result: Result<(), NetworkError>,
    pub connects: Vec<Duration>,
    pub published: Vec<(String, Vec<u8>)>,
    pub panic_on_publish: bool,
    pub disconnects: usize,
    pub button: VecDeque<Result<bool, AcquisitionError>>,
    pub button_polls: usize,
    pub led: Vec<bool>,
    pub delays: Vec<Duration>,
    pub display_bus: Option<RecordingBus>,
    pub parked: bool,
    pub epoch: i64,
}

impl MockBoard {
    pub fn new(sensor_raw: i32) -> Self {
        let calibration = CalibrationConfig::default();
        Self {
            wake: WakeCause::PowerOn,
            battery: Ok(calibration.reading(AdcChannel::Battery, 2300)),
            sensor: Ok(calibration.reading(AdcChannel::Sensor, sensor_raw)),
            retained: Ok(Vec::new()),
            loads: 0,
            stored: Vec::new(),
            store_result: Ok(()),
            connect_result: Ok(()),
            connects: Vec::new(),
            published: Vec::new(),
            panic_on_publish: false,
            disconnects: 0,
            button: VecDeque::new(),
            button_polls: 0,
            led: Vec::new(),
            delays: Vec::new(),
            display_bus: Some(RecordingBus::default()),
            parked: false,
            epoch: 1_700_000_000,
        }
    }

    pub fn led_pulses(&self) -> usize {
        self.led.iter().filter(|on| **on).count()
    }
}

impl Acquisition for MockBoard {
    fn read_channel(&mut self, channel: AdcChannel) -> Result<AdcReading, AcquisitionError> {
        match channel {
            AdcChannel::Battery => self.battery.clone(),
            AdcChannel::Sensor => self.sensor.clone(),
        }
    }
}

impl RetainedMemory for MockBoard {
    fn load(&mut self) -> Result<Vec<u8>, PersistenceError> {
        self.loads += 1;
        self.retained.clone()
    }

    fn store(&mut self, bytes: &[u8]) -> Result<(), PersistenceError> {
        self.stored.push(bytes.to_vec());
        self.store_result.clone()
    }
}

impl Uplink for MockBoard {
    fn connect(&mut self, timeout: Duration) -> Result<(), NetworkError> {
        self.connects.push(timeout);
        self.connect_result.clone()
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), NetworkError> {
        if self.panic_on_publish {
            panic!("uplink driver fault");
        }
        self.published.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
    }
}

impl WakeButton for MockBoard {
    fn is_pressed(&mut self) -> Result<bool, AcquisitionError> {
        self.button_polls += 1;
        self.button.pop_front().unwrap_or(Ok(false))
    }
}

impl StatusLed for MockBoard {
    fn set(&mut self, on: bool) {
        self.led.push(on);
    }
}

impl Clock for MockBoard {
    fn delay(&mut self, duration: Duration) {
        self.delays.push(duration);
    }

    fn epoch_seconds(&self) -> i64 {
        self.epoch
    }
}

impl Board for MockBoard {
    type DisplayBus = RecordingBus;

    fn wake_cause(&self) -> WakeCause {
        self.wake
    }

    fn take_display_bus(&mut self) -> Option<Self::DisplayBus> {
        self.display_bus.take()
    }

    fn park(&mut self) {
        self.parked = true;
    }
}
