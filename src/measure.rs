use std::convert::Infallible;
use std::thread::sleep;
use std::time::Duration;

use chrono::{DateTime, Utc};
use i2c::BulkTransfer;

use crate::baseline::BaselineStore;
use crate::registers::{Baseline, DriveMode, Reading, Status};
use crate::sink::RowSink;
use crate::{Ccs811, Error, Result};

/// One persisted sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub time: DateTime<Utc>,
    /// Address of the host that took the sample.
    pub host: String,
    pub baseline: Baseline,
    pub reading: Reading,
}

/// Lowest baseline seen so far. Never increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowestBaseline(Baseline);

impl LowestBaseline {
    pub fn new(initial: Baseline) -> Self {
        Self(initial)
    }

    pub fn get(&self) -> Baseline {
        self.0
    }

    /// Adopts `baseline` if it is numerically lower than the current one. Returns whether it was
    /// adopted.
    pub fn observe(&mut self, baseline: Baseline) -> bool {
        if baseline.value() < self.0.value() {
            self.0 = baseline;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub drive_mode: DriveMode,
    pub poll_interval: Duration,
    /// The lowest baseline is written back to the sensor after this many samples. 0 disables it.
    pub reapply_every: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            drive_mode: DriveMode::EverySecond,
            poll_interval: Duration::from_millis(100),
            reapply_every: 300,
        }
    }
}

/// Measurement loop state: the sensor, where rows go, and the baseline bookkeeping.
pub struct Measurement<I, S> {
    device: Ccs811<I>,
    store: BaselineStore,
    sink: S,
    host: String,
    settings: Settings,
    lowest: LowestBaseline,
    samples: u64,
}

impl<I, S> Measurement<I, S>
where
    I: BulkTransfer,
    Error: From<I::Error>,
    S: RowSink,
{
    /// Loads the stored baseline; the sensor is not touched until `start`.
    pub fn new(
        device: Ccs811<I>,
        store: BaselineStore,
        sink: S,
        host: String,
        settings: Settings,
    ) -> Result<Self> {
        let stored = store.load()?;
        log::info!("stored baseline {} ({})", stored, store.path().display());
        Ok(Self {
            device,
            store,
            sink,
            host,
            settings,
            lowest: LowestBaseline::new(stored),
            samples: 0,
        })
    }

    pub fn lowest(&self) -> Baseline {
        self.lowest.get()
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Brings the sensor into application mode, sets the drive mode and restores the stored
    /// baseline.
    pub fn start(&mut self) -> Result<()> {
        let status = self.device.status()?;
        if !status.app_valid() {
            return Err(Error::AppInvalid(status));
        }
        if !status.app_mode() {
            log::info!("starting application firmware");
            self.device.app_start()?;
        }
        self.device.set_drive_mode(self.settings.drive_mode)?;

        let lowest = self.lowest.get();
        if !lowest.is_unknown() {
            log::info!("restoring baseline {}", lowest);
            self.device.set_baseline(lowest)?;
        }
        Ok(())
    }

    /// Checks for a new sample once. Returns the row that was stored, if any.
    pub fn poll(&mut self) -> Result<Option<Row>> {
        let status = self.device.status()?;
        if status.error() {
            let flags = self.device.error_id()?;
            log::warn!("sensor reports error {}", flags);
        }
        if !status.contains(Status::DATA_READY) {
            return Ok(None);
        }

        let reading = self.device.algorithm_results()?;
        let baseline = self.device.baseline()?;
        if self.lowest.observe(baseline) {
            log::info!("new lowest baseline {}", baseline);
            self.store.save(baseline)?;
        }

        let row = Row {
            time: Utc::now(),
            host: self.host.clone(),
            baseline,
            reading,
        };
        log::debug!(
            "eCO2 {} ppm, TVOC {} ppb, {} uA, raw {}, baseline {}",
            reading.eco2,
            reading.tvoc,
            reading.current,
            reading.voltage,
            baseline
        );
        self.sink.insert(&row)?;

        self.samples += 1;
        let every = u64::from(self.settings.reapply_every);
        let lowest = self.lowest.get();
        if every != 0 && self.samples % every == 0 && !lowest.is_unknown() {
            log::info!(
                "re-applying baseline {} after {} samples",
                lowest,
                self.samples
            );
            self.device.set_baseline(lowest)?;
        }
        Ok(Some(row))
    }

    /// Polls forever, sleeping between polls whether or not a sample was ready. Only returns on
    /// error.
    pub fn run(&mut self) -> Result<Infallible> {
        loop {
            self.poll()?;
            sleep(self.settings.poll_interval);
        }
    }
}
