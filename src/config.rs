use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use envconfig::Envconfig;

use crate::flash::Timings;
use crate::measure::Settings;
use crate::registers::DriveMode;

/// 7-bit bus address, accepted as `0x5b` or `91`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Address(pub u16);

impl FromStr for Address {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u16::from_str_radix(hex, 16)?,
            None => s.parse()?,
        };
        Ok(Address(value))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// Settings taken from `CCS811_*` environment variables.
#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "CCS811_I2C_BUS", default = "/dev/i2c-1")]
    pub bus: String,

    #[envconfig(from = "CCS811_ADDRESS", default = "0x5a")]
    pub address: Address,

    #[envconfig(from = "CCS811_BASELINE_FILE", default = "BASELINE")]
    pub baseline_file: String,

    #[envconfig(from = "CCS811_POLL_INTERVAL_MS", default = "100")]
    pub poll_interval_ms: u64,

    #[envconfig(from = "CCS811_REAPPLY_EVERY", default = "300")]
    pub reapply_every: u32,

    #[envconfig(from = "CCS811_DRIVE_MODE", default = "1")]
    pub drive_mode: DriveMode,

    /// 0 waits forever.
    #[envconfig(from = "CCS811_STATUS_TIMEOUT_MS", default = "10000")]
    pub status_timeout_ms: u64,

    #[envconfig(from = "CCS811_GPIO_PIN", default = "10")]
    pub gpio_pin: u8,

    #[envconfig(from = "CCS811_DHT10_ADDRESS", default = "0x38")]
    pub dht10_address: Address,
}

impl Config {
    pub fn status_timeout(&self) -> Option<Duration> {
        match self.status_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn measure_settings(&self) -> Settings {
        Settings {
            drive_mode: self.drive_mode,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            reapply_every: self.reapply_every,
        }
    }

    pub fn flash_timings(&self) -> Timings {
        Timings {
            timeout: self.status_timeout(),
            ..Timings::default()
        }
    }
}
