//! Host-side tools for the ams CCS811 air-quality sensor: register access over any
//! `i2c::BulkTransfer` master, the measurement loop with baseline bookkeeping, and the
//! bootloader sequence that replaces the application firmware. A DHT10 driver covers the
//! temperature and humidity sensor found next to it on many breakout boards.

mod error;

pub mod baseline;
pub mod bus;
pub mod config;
pub mod device;
pub mod dht10;
pub mod flash;
pub mod gpio;
pub mod measure;
pub mod registers;
pub mod sink;


pub use device::Ccs811;
pub use error::*;
pub use i2c;
