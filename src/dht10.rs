//! ASAIR DHT10 temperature and humidity sensor, usually sharing the bus with the CCS811.

use std::fmt;
use std::thread::sleep;
use std::time::Duration;

use i2c::{BulkTransfer, Message};

use crate::{Error, Result};

pub const DEFAULT_ADDRESS: u16 = 0x38;

const CMD_SOFT_RESET: [u8; 1] = [0xba];
const CMD_INIT: [u8; 3] = [0xe1, 0x08, 0x00];
const CMD_TRIGGER: [u8; 3] = [0xac, 0x33, 0x00];

const RESET_DELAY: Duration = Duration::from_millis(20);
const INIT_DELAY: Duration = Duration::from_millis(10);
/// Conversion takes up to 75ms per datasheet.
pub const MEASUREMENT_DELAY: Duration = Duration::from_millis(80);

const STATUS_BUSY: u8 = 0x80;
const STATUS_CALIBRATED: u8 = 0x08;

/// Full scale of the 20-bit raw values.
const SCALE: f32 = (1 << 20) as f32;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Climate {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
}

impl Climate {
    /// Decodes a measurement frame: status byte, 20 bits of humidity, 20 bits of temperature.
    pub fn decode(buf: [u8; 6]) -> Self {
        let [_, b1, b2, b3, b4, b5] = buf.map(u32::from);
        let humidity = (b1 << 12) | (b2 << 4) | (b3 >> 4);
        let temperature = ((b3 & 0x0f) << 16) | (b4 << 8) | b5;
        Climate {
            temperature: temperature as f32 / SCALE * 200.0 - 50.0,
            humidity: humidity as f32 / SCALE * 100.0,
        }
    }
}

impl fmt::Display for Climate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Temperature: {:.1} °C, Humidity: {:.1} %",
            self.temperature, self.humidity
        )
    }
}

pub struct Dht10<I> {
    bus: I,
    address: u16,
    measurement_delay: Duration,
}

impl<I> Dht10<I>
where
    I: BulkTransfer,
    Error: From<I::Error>,
{
    pub fn new(bus: I, address: u16) -> Self {
        Self {
            bus,
            address,
            measurement_delay: MEASUREMENT_DELAY,
        }
    }

    pub fn with_measurement_delay(mut self, delay: Duration) -> Self {
        self.measurement_delay = delay;
        self
    }

    fn command(&mut self, data: &[u8]) -> Result<()> {
        self.bus.i2c_transfer(&mut [Message::Write {
            address: self.address,
            data,
            flags: Default::default(),
        }])?;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<[u8; 6]> {
        let mut buf = [0u8; 6];
        self.bus.i2c_transfer(&mut [Message::Read {
            address: self.address,
            data: &mut buf,
            flags: Default::default(),
        }])?;
        log::trace!("dht10 frame {:02x?}", buf);
        Ok(buf)
    }

    /// Soft reset followed by loading the calibration coefficients.
    pub fn init(&mut self) -> Result<()> {
        self.command(&CMD_SOFT_RESET)?;
        sleep(RESET_DELAY);
        self.command(&CMD_INIT)?;
        sleep(INIT_DELAY);
        Ok(())
    }

    /// Triggers a conversion and reads the result once the conversion time has passed.
    pub fn measure(&mut self) -> Result<Climate> {
        self.command(&CMD_TRIGGER)?;
        sleep(self.measurement_delay);
        let frame = self.read_frame()?;
        if frame[0] & STATUS_BUSY != 0 {
            return Err(Error::SensorBusy);
        }
        if frame[0] & STATUS_CALIBRATED == 0 {
            log::warn!("dht10 reports no calibration (status {:#04x})", frame[0]);
        }
        Ok(Climate::decode(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::{MockBus, Op};

    fn sensor() -> (Dht10<MockBus>, MockBus) {
        let bus = MockBus::new(DEFAULT_ADDRESS);
        let dht = Dht10::new(bus.clone(), DEFAULT_ADDRESS)
            .with_measurement_delay(Duration::ZERO);
        (dht, bus)
    }

    #[test]
    fn test_decode() {
        let climate = Climate::decode([0x1c, 0x80, 0x00, 0x06, 0x00, 0x00]);
        assert_eq!(climate.humidity, 50.0);
        assert_eq!(climate.temperature, 25.0);
        assert_eq!(
            climate.to_string(),
            "Temperature: 25.0 °C, Humidity: 50.0 %"
        );
    }

    #[test]
    fn test_measure_triggers_then_reads() {
        let (mut dht, bus) = sensor();
        bus.schedule_plain_read(&[0x1c, 0x80, 0x00, 0x06, 0x00, 0x00]);
        let climate = dht.measure().unwrap();
        assert_eq!(climate.temperature, 25.0);
        assert_eq!(
            bus.log(),
            [Op::Write(vec![0xac, 0x33, 0x00]), Op::ReadOnly(6)]
        );
    }

    #[test]
    fn test_busy_frame_is_rejected() {
        let (mut dht, bus) = sensor();
        bus.schedule_plain_read(&[0x9c, 0x80, 0x00, 0x06, 0x00, 0x00]);
        assert!(matches!(dht.measure(), Err(Error::SensorBusy)));
    }

    #[test]
    fn test_init_sequence() {
        let (mut dht, bus) = sensor();
        dht.init().unwrap();
        assert_eq!(
            bus.log(),
            [Op::Write(vec![0xba]), Op::Write(vec![0xe1, 0x08, 0x00])]
        );
    }

    #[test]
    fn test_missing_sensor_is_bus_error() {
        let bus = MockBus::new(0x5a);
        let mut dht = Dht10::new(bus, DEFAULT_ADDRESS);
        assert!(matches!(dht.init(), Err(Error::Bus(_))));
    }
}
