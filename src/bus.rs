use std::fs::File;
use std::path::Path;

use crate::Result;

/// I2C master backed by a Linux `/dev/i2c-N` character device. Any other `i2c::BulkTransfer`
/// implementation with `std::io::Error` errors can be used with `crate::Ccs811` instead.
pub type LinuxBus = i2c_linux::I2c<File>;

/// Opens an i2c-dev device node such as `/dev/i2c-1`.
pub fn open(path: impl AsRef<Path>) -> Result<LinuxBus> {
    let path = path.as_ref();
    log::debug!("opening i2c bus {}", path.display());
    Ok(i2c_linux::I2c::from_path(path)?)
}
