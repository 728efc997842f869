//! Mode LED task.
//!
//! Off while disconnected, blinking once associated, solid once the
//! broker session is up. The controller posts mode changes through
//! `MODE_LED`; the blink itself runs on a local ticker.

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Ticker};
use esp_hal::gpio::Output;

use loopbridge_core::indicator::{Indicator, BLINK_PERIOD_MS};
use loopbridge_hal::gpio::OutputPin;

use crate::channels::MODE_LED;

/// Adapter from the chip GPIO type to the board-agnostic pin trait.
pub struct Led(pub Output<'static>);

impl OutputPin for Led {
    fn set_high(&mut self) {
        self.0.set_high();
    }

    fn set_low(&mut self) {
        self.0.set_low();
    }

    fn toggle(&mut self) {
        self.0.toggle();
    }

    fn is_set_high(&self) -> bool {
        self.0.is_set_high()
    }
}

#[embassy_executor::task]
pub async fn mode_indicator_task(led: Output<'static>) {
    let mut indicator = Indicator::new(Led(led));
    let mut ticker = Ticker::every(Duration::from_millis(BLINK_PERIOD_MS));

    loop {
        match select(MODE_LED.wait(), ticker.next()).await {
            Either::First(mode) => indicator.set_mode(mode),
            Either::Second(()) => indicator.tick(),
        }
    }
}

/// Free-running heartbeat: visible proof the executor is alive.
#[embassy_executor::task]
pub async fn state_indicator_task(led: Output<'static>) {
    let mut indicator = Indicator::new(Led(led));
    indicator.set_mode(loopbridge_core::indicator::IndicatorMode::Blink);
    let mut ticker = Ticker::every(Duration::from_millis(BLINK_PERIOD_MS));

    loop {
        ticker.next().await;
        indicator.tick();
    }
}
