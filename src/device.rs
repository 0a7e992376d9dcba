use std::thread::sleep;
use std::time::{Duration, Instant};

use i2c::{BulkTransfer, Message};

use crate::registers::*;
use crate::{Error, Result};

/// Wait after APP_START before the application accepts MEAS_MODE. The datasheet asks for 1ms.
pub const APP_START_DELAY: Duration = Duration::from_millis(2);

/// Register level access to a CCS811. Every method performs complete bus transactions and
/// returns the bus error unchanged; nothing is retried.
pub struct Ccs811<I> {
    bus: I,
    address: u16,
}

impl<I> Ccs811<I>
where
    I: BulkTransfer,
    Error: From<I::Error>,
{
    pub fn new(bus: I, address: u16) -> Self {
        Self { bus, address }
    }

    /// Writes `register` followed by `payload` in a single transaction.
    pub fn write(&mut self, register: Register, payload: &[u8]) -> Result<()> {
        let mut data = Vec::with_capacity(payload.len() + 1);
        data.push(register.addr());
        data.extend_from_slice(payload);
        log::trace!("write {:?} {:02x?}", register, payload);
        self.bus.i2c_transfer(&mut [Message::Write {
            address: self.address,
            data: &data,
            flags: Default::default(),
        }])?;
        Ok(())
    }

    /// Selects `register` and reads `N` bytes back without releasing the bus in between.
    pub fn read<const N: usize>(&mut self, register: Register) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.bus.i2c_transfer(&mut [
            Message::Write {
                address: self.address,
                data: &[register.addr()],
                flags: Default::default(),
            },
            Message::Read {
                address: self.address,
                data: &mut buf,
                flags: Default::default(),
            },
        ])?;
        log::trace!("read {:?} {:02x?}", register, buf);
        Ok(buf)
    }

    pub fn status(&mut self) -> Result<Status> {
        let [status] = self.read(Register::Status)?;
        Ok(Status(status))
    }

    /// Polls STATUS until all bits of `mask` are set and returns the status that satisfied it.
    /// The register is read at least once. Without a timeout this never gives up on a device
    /// that keeps answering.
    pub fn wait_for_status(
        &mut self,
        mask: u8,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<Status> {
        let started = Instant::now();
        loop {
            let status = self.status()?;
            if status.contains(mask) {
                return Ok(status);
            }
            log::debug!("waiting for status {:#04x}, got {}", mask, status);
            if let Some(timeout) = timeout {
                let waited = started.elapsed();
                if waited >= timeout {
                    return Err(Error::Timeout {
                        mask,
                        waited,
                        last: status,
                    });
                }
            }
            sleep(poll_interval);
        }
    }

    pub fn hardware_id(&mut self) -> Result<u8> {
        let [id] = self.read(Register::HwId)?;
        Ok(id)
    }

    pub fn hardware_version(&mut self) -> Result<u8> {
        let [version] = self.read(Register::HwVersion)?;
        Ok(version)
    }

    pub fn boot_version(&mut self) -> Result<FirmwareVersion> {
        Ok(self.read::<2>(Register::FwBootVersion)?.into())
    }

    pub fn app_version(&mut self) -> Result<FirmwareVersion> {
        Ok(self.read::<2>(Register::FwAppVersion)?.into())
    }

    /// Reading ERROR_ID clears it and the ERROR status bit.
    pub fn error_id(&mut self) -> Result<ErrorFlags> {
        let [flags] = self.read(Register::ErrorId)?;
        Ok(ErrorFlags(flags))
    }

    pub fn algorithm_results(&mut self) -> Result<Reading> {
        Ok(self.read::<8>(Register::AlgResultData)?.into())
    }

    pub fn baseline(&mut self) -> Result<Baseline> {
        Ok(Baseline(self.read(Register::Baseline)?))
    }

    pub fn set_baseline(&mut self, baseline: Baseline) -> Result<()> {
        self.write(Register::Baseline, &baseline.0)
    }

    pub fn set_drive_mode(&mut self, mode: DriveMode) -> Result<()> {
        self.write(Register::MeasMode, &[mode as u8])
    }

    /// Leaves boot mode and starts the application firmware.
    pub fn app_start(&mut self) -> Result<()> {
        self.write(Register::AppStart, &[])?;
        sleep(APP_START_DELAY);
        Ok(())
    }

    pub fn software_reset(&mut self) -> Result<()> {
        self.write(Register::SwReset, &RESET_SEQUENCE)
    }

    pub fn app_erase(&mut self) -> Result<()> {
        self.write(Register::AppErase, &ERASE_SEQUENCE)
    }

    /// Writes up to `APP_DATA_CHUNK` bytes of application image.
    pub fn app_data(&mut self, chunk: &[u8]) -> Result<()> {
        debug_assert!(chunk.len() <= APP_DATA_CHUNK);
        self.write(Register::AppData, chunk)
    }

    pub fn app_verify(&mut self) -> Result<()> {
        self.write(Register::AppVerify, &[])
    }
}
