//! CCS811 register map and the encodings of the values stored in it. Register addresses, bit
//! masks and magic sequences come from the ams CCS811 datasheet (DS000459) and the bootloader
//! application note.

use std::fmt;
use std::str::FromStr;

/// Default 7-bit address with the ADDR pin low. 0x5B when ADDR is high.
pub const DEFAULT_ADDRESS: u16 = 0x5a;

/// Value of the HW_ID register on every genuine CCS811.
pub const HARDWARE_ID: u8 = 0x81;

/// Written to SW_RESET in a single transaction to return the device to boot mode.
pub const RESET_SEQUENCE: [u8; 4] = [0x11, 0xe5, 0x72, 0x8a];

/// Written to APP_ERASE in a single transaction to erase the application flash.
pub const ERASE_SEQUENCE: [u8; 4] = [0xe7, 0xa7, 0xe6, 0x09];

/// Maximum payload accepted by a single APP_DATA write.
pub const APP_DATA_CHUNK: usize = 8;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Register {
    Status = 0x00,
    MeasMode = 0x01,
    AlgResultData = 0x02, // 8 bytes
    RawData = 0x03,       // 2 bytes
    EnvData = 0x05,       // 4 bytes
    Thresholds = 0x10,    // 4 bytes
    Baseline = 0x11,      // 2 bytes
    HwId = 0x20,
    HwVersion = 0x21,
    FwBootVersion = 0x23, // 2 bytes
    FwAppVersion = 0x24,  // 2 bytes
    ErrorId = 0xe0,
    AppErase = 0xf1,  // 4 bytes, boot mode only
    AppData = 0xf2,   // up to 8 bytes, boot mode only
    AppVerify = 0xf3, // 0 bytes, boot mode only
    AppStart = 0xf4,  // 0 bytes, boot mode only
    SwReset = 0xff,   // 4 bytes
}

impl Register {
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

/// Contents of the STATUS register.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Status(pub u8);

impl Status {
    pub const ERROR: u8 = 0x01;
    pub const DATA_READY: u8 = 0x08;
    pub const APP_VALID: u8 = 0x10;
    pub const APP_VERIFY: u8 = 0x20;
    pub const APP_ERASE: u8 = 0x40;
    pub const FW_MODE: u8 = 0x80;

    /// True if every bit of `mask` is set.
    #[inline]
    pub fn contains(self, mask: u8) -> bool {
        self.0 & mask == mask
    }

    pub fn error(self) -> bool {
        self.contains(Self::ERROR)
    }

    pub fn data_ready(self) -> bool {
        self.contains(Self::DATA_READY)
    }

    pub fn app_valid(self) -> bool {
        self.contains(Self::APP_VALID)
    }

    /// Set when the application firmware is running, clear in boot mode.
    pub fn app_mode(self) -> bool {
        self.contains(Self::FW_MODE)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// Contents of the ERROR_ID register.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorFlags(pub u8);

impl ErrorFlags {
    const DESCRIPTIONS: [(u8, &'static str); 6] = [
        (0x01, "write to invalid register"),
        (0x02, "read from invalid register"),
        (0x04, "unsupported measurement mode"),
        (0x08, "sensor resistance out of range"),
        (0x10, "heater current out of range"),
        (0x20, "heater voltage not applied correctly"),
    ];

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Human readable names of the set flags, lowest bit first.
    pub fn descriptions(self) -> Vec<&'static str> {
        Self::DESCRIPTIONS
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, text)| *text)
            .collect()
    }
}

impl fmt::Display for ErrorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        write!(f, "{:#04x} ({})", self.0, self.descriptions().join(", "))
    }
}

/// Measurement period, as encoded in bits 4..6 of MEAS_MODE. Interrupts stay disabled.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum DriveMode {
    Idle = 0x00,
    #[default]
    EverySecond = 0x10,
    Every10Seconds = 0x20,
    Every60Seconds = 0x30,
    /// Raw data only, every 250ms. The algorithm results are not updated.
    Raw = 0x40,
}

impl FromStr for DriveMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "0" | "idle" => Ok(DriveMode::Idle),
            "1" => Ok(DriveMode::EverySecond),
            "10" => Ok(DriveMode::Every10Seconds),
            "60" => Ok(DriveMode::Every60Seconds),
            "raw" => Ok(DriveMode::Raw),
            other => Err(format!("unknown drive mode {other:?}")),
        }
    }
}

/// Contents of FW_BOOT_VERSION or FW_APP_VERSION.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub trivial: u8,
}

impl From<[u8; 2]> for FirmwareVersion {
    fn from(raw: [u8; 2]) -> Self {
        Self {
            major: raw[0] >> 4,
            minor: raw[0] & 0x0f,
            trivial: raw[1],
        }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.trivial)
    }
}

/// Encoded baseline as stored in the BASELINE register. The two bytes are kept verbatim; the
/// numeric value is only used to decide which of two baselines is lower.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Baseline(pub [u8; 2]);

impl Baseline {
    /// Stand-in when no baseline has been stored yet. Any real baseline compares lower.
    pub const UNKNOWN: Baseline = Baseline([0xff, 0xff]);

    pub fn value(self) -> u16 {
        u16::from_le_bytes(self.0)
    }

    pub fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }
}

impl From<u16> for Baseline {
    fn from(value: u16) -> Self {
        Baseline(value.to_le_bytes())
    }
}

impl fmt::Display for Baseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{:02x} {:02x}]", self.value(), self.0[0], self.0[1])
    }
}

/// One ALG_RESULT_DATA sample.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Reading {
    /// Equivalent CO2 in ppm.
    pub eco2: u16,
    /// Total volatile organic compounds in ppb.
    pub tvoc: u16,
    pub status: Status,
    pub error: ErrorFlags,
    /// Current through the sensor in µA (0..=63).
    pub current: u8,
    /// Raw ADC reading of the sensor voltage (0..=1023, 1023 = 1.65V).
    pub voltage: u16,
}

impl From<[u8; 8]> for Reading {
    fn from(raw: [u8; 8]) -> Self {
        Self {
            eco2: u16::from_be_bytes([raw[0], raw[1]]),
            tvoc: u16::from_be_bytes([raw[2], raw[3]]),
            status: Status(raw[4]),
            error: ErrorFlags(raw[5]),
            current: raw[6] >> 2,
            voltage: u16::from_be_bytes([raw[6] & 0x03, raw[7]]),
        }
    }
}
