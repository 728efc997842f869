//! Config button task.
//!
//! One button, two gestures: a short press toggles config mode, a hold
//! past the threshold requests a factory reset. The controller decides
//! whether the reset is honored (only while config mode is active).

use embassy_time::{with_timeout, Duration, Timer};
use esp_hal::gpio::Input;

use crate::channels::{ButtonAction, BUTTON_ACTION};

const DEBOUNCE_MS: u64 = 50;
const HOLD_MS: u64 = 4_000;

#[embassy_executor::task]
pub async fn button_task(mut button: Input<'static>) {
    loop {
        button.wait_for_rising_edge().await;
        Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;
        if button.is_low() {
            // bounce
            continue;
        }

        let held = with_timeout(
            Duration::from_millis(HOLD_MS),
            button.wait_for_falling_edge(),
        )
        .await
        .is_err();

        if held {
            log::info!("button: hold, requesting factory reset");
            BUTTON_ACTION.signal(ButtonAction::FactoryReset);
            // swallow the eventual release
            button.wait_for_falling_edge().await;
        } else {
            log::info!("button: press, toggling config mode");
            BUTTON_ACTION.signal(ButtonAction::Toggle);
        }
    }
}
