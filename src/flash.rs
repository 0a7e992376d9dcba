//! Application firmware update through the CCS811 bootloader.
//!
//! The sequence is fixed by the bootloader: reset into boot mode, erase, stream the image into
//! APP_DATA eight bytes at a time, verify, and reset again to check that the new application is
//! accepted. A failed step leaves the sensor in whatever state it reached; running the whole
//! sequence again from the start is the only recovery.

use std::thread::sleep;
use std::time::Duration;

use i2c::BulkTransfer;

use crate::registers::{Status, APP_DATA_CHUNK};
use crate::{Ccs811, Error, Result};

/// Progress is reported every time this many image bytes have been written.
pub const PROGRESS_STEP: usize = 512;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    Reset,
    Erase,
    WaitEraseDone,
    WriteData,
    Verify,
    WaitVerifyDone,
    Confirm,
    Done,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Event {
    /// `phase` finished and the status register read `status` afterwards.
    Phase { phase: Phase, status: Status },
    Progress { written: usize, total: usize },
}

/// Delays between bootloader commands. The defaults are on the safe side of the datasheet
/// figures; erase in particular needs more than the documented 300ms on some parts.
#[derive(Copy, Clone, Debug)]
pub struct Timings {
    pub reset_settle: Duration,
    pub erase_settle: Duration,
    pub chunk_pause: Duration,
    pub verify_settle: Duration,
    pub poll_interval: Duration,
    /// Upper bound for the erase and verify polls. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            reset_settle: Duration::from_millis(20),
            erase_settle: Duration::from_millis(500),
            chunk_pause: Duration::from_millis(50),
            verify_settle: Duration::from_millis(70),
            poll_interval: Duration::from_millis(10),
            timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Drives one firmware update. Not resumable: a `Flasher` runs once from `Phase::Reset`.
pub struct Flasher<'a, I> {
    device: &'a mut Ccs811<I>,
    image: &'a [u8],
    timings: Timings,
    phase: Phase,
}

impl<'a, I> Flasher<'a, I>
where
    I: BulkTransfer,
    Error: From<I::Error>,
{
    pub fn new(device: &'a mut Ccs811<I>, image: &'a [u8], timings: Timings) -> Self {
        Self {
            device,
            image,
            timings,
            phase: Phase::Reset,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Runs every remaining phase, passing each status observation and write progress to
    /// `observer`. Returns the status read after the confirming reset.
    pub fn run(mut self, mut observer: impl FnMut(Event)) -> Result<Status> {
        if self.image.is_empty() {
            return Err(Error::EmptyImage);
        }
        let mut status = Status::default();
        while self.phase != Phase::Done {
            let phase = self.phase;
            status = self.step(&mut observer)?;
            log::info!("{:?} done, status {}", phase, status);
            observer(Event::Phase { phase, status });
        }
        Ok(status)
    }

    fn step(&mut self, observer: &mut impl FnMut(Event)) -> Result<Status> {
        let t = self.timings;
        let (status, next) = match self.phase {
            Phase::Reset => {
                self.device.software_reset()?;
                sleep(t.reset_settle);
                (self.device.status()?, Phase::Erase)
            }
            Phase::Erase => {
                self.device.app_erase()?;
                sleep(t.erase_settle);
                (self.device.status()?, Phase::WaitEraseDone)
            }
            Phase::WaitEraseDone => {
                let status =
                    self.device
                        .wait_for_status(Status::APP_ERASE, t.poll_interval, t.timeout)?;
                (status, Phase::WriteData)
            }
            Phase::WriteData => {
                self.write_image(observer)?;
                (self.device.status()?, Phase::Verify)
            }
            Phase::Verify => {
                self.device.app_verify()?;
                sleep(t.verify_settle);
                (self.device.status()?, Phase::WaitVerifyDone)
            }
            Phase::WaitVerifyDone => {
                let status =
                    self.device
                        .wait_for_status(Status::APP_VERIFY, t.poll_interval, t.timeout)?;
                (status, Phase::Confirm)
            }
            Phase::Confirm => {
                self.device.software_reset()?;
                sleep(t.reset_settle);
                let status = self.device.status()?;
                if !status.app_valid() {
                    return Err(Error::AppInvalid(status));
                }
                (status, Phase::Done)
            }
            Phase::Done => unreachable!("flasher stepped after completion"),
        };
        self.phase = next;
        Ok(status)
    }

    fn write_image(&mut self, observer: &mut impl FnMut(Event)) -> Result<()> {
        let total = self.image.len();
        let mut written = 0;
        for chunk in self.image.chunks(APP_DATA_CHUNK) {
            self.device.app_data(chunk)?;
            sleep(self.timings.chunk_pause);
            written += chunk.len();
            if written % PROGRESS_STEP == 0 {
                log::debug!("{}/{} bytes written", written, total);
                observer(Event::Progress { written, total });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::{MockBus, Op};
    use crate::registers::{Register, DEFAULT_ADDRESS};

    const FAST: Timings = Timings {
        reset_settle: Duration::ZERO,
        erase_settle: Duration::ZERO,
        chunk_pause: Duration::ZERO,
        verify_settle: Duration::ZERO,
        poll_interval: Duration::ZERO,
        timeout: None,
    };

    fn device() -> (Ccs811<MockBus>, MockBus) {
        let bus = MockBus::new(DEFAULT_ADDRESS);
        (Ccs811::new(bus.clone(), DEFAULT_ADDRESS), bus)
    }

    /// Status reads for a clean run: reset, erase, erase poll (3 reads), write, verify,
    /// verify poll (2 reads), confirm.
    fn schedule_successful_run(bus: &MockBus) {
        bus.schedule_status(&[
            0x10, 0x10, 0x10, 0x10, 0x50, 0x50, 0x50, 0x50, 0x70, 0x10,
        ]);
    }

    #[test]
    fn test_flash_sequence() {
        let (mut dev, bus) = device();
        schedule_successful_run(&bus);
        let image: Vec<u8> = (0..20).collect();

        let mut events = Vec::new();
        let status = Flasher::new(&mut dev, &image, FAST)
            .run(|e| events.push(e))
            .unwrap();
        assert!(status.app_valid());

        assert_eq!(
            bus.writes_to(Register::SwReset),
            [vec![0x11, 0xe5, 0x72, 0x8a], vec![0x11, 0xe5, 0x72, 0x8a]]
        );
        assert_eq!(
            bus.writes_to(Register::AppErase),
            [vec![0xe7, 0xa7, 0xe6, 0x09]]
        );
        assert_eq!(bus.writes_to(Register::AppVerify), [Vec::<u8>::new()]);

        let phases: Vec<Phase> = events
            .iter()
            .filter_map(|e| match e {
                Event::Phase { phase, .. } => Some(*phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            [
                Phase::Reset,
                Phase::Erase,
                Phase::WaitEraseDone,
                Phase::WriteData,
                Phase::Verify,
                Phase::WaitVerifyDone,
                Phase::Confirm
            ]
        );
        assert!(events.contains(&Event::Phase {
            phase: Phase::WaitEraseDone,
            status: Status(0x50)
        }));
    }

    #[test]
    fn test_chunk_sizes() {
        let (mut dev, bus) = device();
        schedule_successful_run(&bus);
        let image: Vec<u8> = (0..20).collect();
        Flasher::new(&mut dev, &image, FAST).run(|_| {}).unwrap();

        let chunks = bus.writes_to(Register::AppData);
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, [8, 8, 4]);
        assert_eq!(chunks.concat(), image);
    }

    #[test]
    fn test_waits_for_erase_and_verify_bits() {
        let (mut dev, bus) = device();
        schedule_successful_run(&bus);
        Flasher::new(&mut dev, &[0xaa; 8], FAST)
            .run(|_| {})
            .unwrap();

        let log = bus.log();
        let app_data = Register::AppData.addr();
        let first_data = log
            .iter()
            .position(|op| matches!(op, Op::Write(d) if d[0] == app_data))
            .unwrap();
        let status_before_data = log[..first_data]
            .iter()
            .filter(|op| matches!(op, Op::Read(0x00, 1)))
            .count();
        // reset, erase, then three polls until 0x40 shows up
        assert_eq!(status_before_data, 5);

        let verify = log
            .iter()
            .position(|op| *op == Op::Write(vec![Register::AppVerify.addr()]))
            .unwrap();
        let confirm = log
            .iter()
            .rposition(|op| matches!(op, Op::Write(d) if d[0] == Register::SwReset.addr()))
            .unwrap();
        let polls_between = log[verify..confirm]
            .iter()
            .filter(|op| matches!(op, Op::Read(0x00, 1)))
            .count();
        // verify settle read, then two polls until 0x20 shows up
        assert_eq!(polls_between, 3);
    }

    #[test]
    fn test_erase_timeout_stops_before_data() {
        let (mut dev, bus) = device();
        bus.set_register(Register::Status, &[0x10]);
        let timings = Timings {
            timeout: Some(Duration::ZERO),
            ..FAST
        };
        let result = Flasher::new(&mut dev, &[0u8; 16], timings).run(|_| {});
        assert!(matches!(result, Err(Error::Timeout { mask: 0x40, .. })));
        assert!(bus.writes_to(Register::AppData).is_empty());
        assert!(bus.writes_to(Register::AppVerify).is_empty());
    }

    #[test]
    fn test_progress_every_512_bytes() {
        let (mut dev, bus) = device();
        schedule_successful_run(&bus);
        let image = vec![0x5a; 1100];
        let mut progress = Vec::new();
        Flasher::new(&mut dev, &image, FAST)
            .run(|e| {
                if let Event::Progress { written, total } = e {
                    progress.push((written, total));
                }
            })
            .unwrap();
        assert_eq!(progress, [(512, 1100), (1024, 1100)]);
    }

    #[test]
    fn test_invalid_app_after_confirm() {
        let (mut dev, bus) = device();
        bus.schedule_status(&[0x10, 0x10, 0x40, 0x40, 0x40, 0x20, 0x00]);
        let result = Flasher::new(&mut dev, &[1, 2, 3], FAST).run(|_| {});
        assert!(matches!(result, Err(Error::AppInvalid(Status(0x00)))));
    }

    #[test]
    fn test_empty_image_untouched_device() {
        let (mut dev, bus) = device();
        let result = Flasher::new(&mut dev, &[], FAST).run(|_| {});
        assert!(matches!(result, Err(Error::EmptyImage)));
        assert!(bus.log().is_empty());
    }

    #[test]
    fn test_bus_failure_aborts() {
        let (mut dev, bus) = device();
        bus.fail_writes();
        let flasher = Flasher::new(&mut dev, &[1, 2, 3], FAST);
        assert_eq!(flasher.phase(), Phase::Reset);
        assert!(matches!(flasher.run(|_| {}), Err(Error::Bus(_))));
    }
}
