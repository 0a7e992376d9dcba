use std::thread::sleep;
use std::time::Duration;

use rppal::gpio::{Gpio, OutputPin};

use crate::Result;

/// Minimal output pin interface, so the blink pattern can run against a fake pin.
pub trait Switch {
    fn set(&mut self, high: bool);
    fn is_high(&self) -> bool;
}

impl Switch for OutputPin {
    fn set(&mut self, high: bool) {
        if high {
            self.set_high()
        } else {
            self.set_low()
        }
    }

    fn is_high(&self) -> bool {
        self.is_set_high()
    }
}

/// Claims BCM pin `pin` on the Raspberry Pi header as an output, initially low.
pub fn output_pin(pin: u8) -> Result<OutputPin> {
    let gpio = Gpio::new()?;
    Ok(gpio.get(pin)?.into_output_low())
}

/// Toggles `pin` `toggles` times, `interval` apart, and leaves it low. Returns how many times
/// the pin went high.
pub fn blink(pin: &mut impl Switch, toggles: u32, interval: Duration) -> u32 {
    let mut pulses = 0;
    for _ in 0..toggles {
        let high = !pin.is_high();
        pin.set(high);
        if high {
            pulses += 1;
        }
        log::debug!("pin {}", if high { "high" } else { "low" });
        sleep(interval);
    }
    pin.set(false);
    pulses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakePin {
        high: bool,
        history: Vec<bool>,
    }

    impl Switch for FakePin {
        fn set(&mut self, high: bool) {
            self.high = high;
            self.history.push(high);
        }

        fn is_high(&self) -> bool {
            self.high
        }
    }

    #[test]
    fn test_blink_alternates_and_ends_low() {
        let mut pin = FakePin::default();
        let pulses = blink(&mut pin, 5, Duration::ZERO);
        assert_eq!(pulses, 3);
        assert_eq!(pin.history, [true, false, true, false, true, false]);
        assert!(!pin.is_high());
    }

    #[test]
    fn test_blink_zero_toggles() {
        let mut pin = FakePin {
            high: true,
            ..Default::default()
        };
        assert_eq!(blink(&mut pin, 0, Duration::ZERO), 0);
        assert_eq!(pin.history, [false]);
    }
}
