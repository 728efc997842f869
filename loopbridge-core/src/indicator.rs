//! Mode indicator LED driver.
//!
//! Off while disconnected, blinking once associated, solid once the
//! broker session is up. The firmware calls [`Indicator::tick`] from a
//! 250ms ticker; only the blink mode does anything on a tick.

use loopbridge_hal::gpio::OutputPin;

pub const BLINK_PERIOD_MS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorMode {
    Off,
    On,
    Blink,
}

pub struct Indicator<P: OutputPin> {
    pin: P,
    mode: IndicatorMode,
}

impl<P: OutputPin> Indicator<P> {
    pub fn new(mut pin: P) -> Self {
        pin.set_low();
        Self {
            pin,
            mode: IndicatorMode::Off,
        }
    }

    /// Switch modes. Re-requesting the current mode leaves the pin alone,
    /// so a blink in progress is not disturbed.
    pub fn set_mode(&mut self, mode: IndicatorMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        match mode {
            IndicatorMode::Off | IndicatorMode::Blink => self.pin.set_low(),
            IndicatorMode::On => self.pin.set_high(),
        }
    }

    pub fn mode(&self) -> IndicatorMode {
        self.mode
    }

    /// Advance one blink period.
    pub fn tick(&mut self) {
        if self.mode == IndicatorMode::Blink {
            self.pin.toggle();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockPin {
        high: bool,
        writes: u32,
    }

    impl OutputPin for MockPin {
        fn set_high(&mut self) {
            self.high = true;
            self.writes += 1;
        }

        fn set_low(&mut self) {
            self.high = false;
            self.writes += 1;
        }

        fn toggle(&mut self) {
            self.high = !self.high;
            self.writes += 1;
        }

        fn is_set_high(&self) -> bool {
            self.high
        }
    }

    #[test]
    fn starts_off_with_pin_low() {
        let ind = Indicator::new(MockPin::default());
        assert_eq!(ind.mode(), IndicatorMode::Off);
        assert!(!ind.pin.high);
    }

    #[test]
    fn repeated_set_mode_does_not_touch_the_pin() {
        let mut ind = Indicator::new(MockPin::default());
        ind.set_mode(IndicatorMode::On);
        let writes = ind.pin.writes;
        ind.set_mode(IndicatorMode::On);
        ind.set_mode(IndicatorMode::On);
        assert_eq!(ind.pin.writes, writes);
        assert!(ind.pin.high);
    }

    #[test]
    fn blink_toggles_on_tick_only() {
        let mut ind = Indicator::new(MockPin::default());
        ind.set_mode(IndicatorMode::Blink);
        assert!(!ind.pin.high);
        ind.tick();
        assert!(ind.pin.high);
        ind.tick();
        assert!(!ind.pin.high);
    }

    #[test]
    fn tick_is_inert_outside_blink() {
        let mut ind = Indicator::new(MockPin::default());
        ind.set_mode(IndicatorMode::On);
        let writes = ind.pin.writes;
        ind.tick();
        ind.tick();
        assert_eq!(ind.pin.writes, writes);

        ind.set_mode(IndicatorMode::Off);
        let writes = ind.pin.writes;
        ind.tick();
        assert_eq!(ind.pin.writes, writes);
    }
}
