use std::path::PathBuf;
use std::time::Duration;

use crate::registers::Status;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("i2c bus error")]
    Bus(#[from] std::io::Error),

    #[error("status bits {mask:#04x} not set after {waited:?} (last status {last})")]
    Timeout {
        mask: u8,
        waited: Duration,
        last: Status,
    },

    #[error("no valid application firmware on the sensor (status {0})")]
    AppInvalid(Status),

    #[error("measurement still in progress")]
    SensorBusy,

    #[error("baseline file {path:?} holds {len} bytes, expected 2")]
    CorruptBaseline { path: PathBuf, len: usize },

    #[error("cannot access baseline file {path:?}")]
    Baseline {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read firmware image {path:?}")]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("firmware image is empty")]
    EmptyImage,

    #[error("database error")]
    Database(#[from] postgres::Error),

    #[error("GPIO error")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("invalid configuration")]
    Config(#[from] envconfig::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wraps an I/O error from the baseline file.
    pub(crate) fn baseline(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Baseline {
            path: path.into(),
            source,
        }
    }
}
