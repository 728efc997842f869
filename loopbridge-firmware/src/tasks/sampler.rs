//! Sampler task.
//!
//! Owns the sensor buses: the radar UART, the loop-current converter on
//! I2C and the battery divider on the internal ADC. Radar bytes are fed
//! to the push parser and completed frames go to the bounded sample
//! queue; converter and battery readings are published as last-value
//! signals for the controller to pick up at publish time.

use embassy_futures::select::{select, Either};
use embassy_time::{with_timeout, Duration, Instant, Ticker};
use esp_hal::analog::adc::{Adc, AdcPin};
use esp_hal::i2c::master::I2c;
use esp_hal::peripherals::{ADC1, GPIO35};
use esp_hal::uart::UartRx;
use esp_hal::Async;
use heapless::String;

use loopbridge_core::config::SENSOR_ID_LEN;
use loopbridge_core::sampling::{
    SampleSender, MIN_SAMPLE_INTERVAL_MS, QUEUE_PUSH_TIMEOUT_MS,
};
use loopbridge_core::traits::SensorSource;
use loopbridge_drivers::{Adc121, Ld2410, SensorRegistry};

use crate::channels::{ADC_READING, BATTERY_MV, SAMPLE_CHANNEL};

/// Converter and battery refresh period.
const ADC_PERIOD_MS: u64 = 1_000;
/// Battery divider halves the pack voltage before the ADC pin.
const BATT_DIVIDER: u32 = 2;
/// Full-scale millivolts at 11dB attenuation.
const ADC_FULL_SCALE_MV: u32 = 3_300;

type BatteryAdc = Adc<'static, ADC1<'static>, esp_hal::Blocking>;
type BatteryPin = AdcPin<GPIO35<'static>, ADC1<'static>>;

#[embassy_executor::task]
pub async fn sampler_task(
    mut radar_rx: UartRx<'static, Async>,
    i2c: I2c<'static, Async>,
    mut battery: BatteryAdc,
    mut battery_pin: BatteryPin,
    loop_sensor_id: String<SENSOR_ID_LEN>,
) {
    let mut registry: SensorRegistry<Adc121<I2c<'static, Async>>, 2> = SensorRegistry::new();
    let name = if loop_sensor_id.is_empty() {
        "loop"
    } else {
        loop_sensor_id.as_str()
    };
    if registry.register(name, Adc121::new(i2c)).is_err() {
        log::error!("sampler: could not register loop sensor '{name}'");
    }
    for (name, sensor) in registry.iter_mut() {
        if sensor.init().await.is_err() {
            log::warn!("sampler: init of '{name}' failed, will retry on read");
        }
    }

    let mut radar = Ld2410::new();
    let mut sender = SampleSender::new(SAMPLE_CHANNEL.sender());
    let mut last_push = Instant::MIN;
    let mut adc_tick = Ticker::every(Duration::from_millis(ADC_PERIOD_MS));
    let mut buf = [0u8; 64];

    loop {
        match select(radar_rx.read_async(&mut buf), adc_tick.next()).await {
            Either::First(Ok(len)) => {
                if radar.feed_bytes(&buf[..len]).is_some()
                    && last_push.elapsed() >= Duration::from_millis(MIN_SAMPLE_INTERVAL_MS)
                {
                    push_frame(&mut sender, radar.last_frame()).await;
                    last_push = Instant::now();
                }
            }
            Either::First(Err(err)) => {
                log::warn!("sampler: radar uart error {err:?}");
            }
            Either::Second(()) => {
                refresh_readings(&mut registry, &mut battery, &mut battery_pin).await;
            }
        }
    }
}

/// Queue a frame, waiting a bounded time for space before dropping it.
async fn push_frame(sender: &mut SampleSender<'static>, frame: loopbridge_protocol::SampleFrame) {
    if sender.offer(frame) {
        return;
    }
    let push = SAMPLE_CHANNEL.send(frame);
    if with_timeout(Duration::from_millis(QUEUE_PUSH_TIMEOUT_MS), push)
        .await
        .is_err()
    {
        sender.note_drop();
    }
}

async fn refresh_readings(
    registry: &mut SensorRegistry<Adc121<I2c<'static, Async>>, 2>,
    battery: &mut BatteryAdc,
    battery_pin: &mut BatteryPin,
) {
    for (name, sensor) in registry.iter_mut() {
        match sensor.sample().await {
            Ok(value) => ADC_READING.signal(Some(value as u16)),
            Err(_) => {
                log::warn!("sampler: reading '{name}' failed");
                ADC_READING.signal(None);
            }
        }
    }

    match nb::block!(battery.read_oneshot(battery_pin)) {
        Ok(raw) => {
            let mv = u32::from(raw) * ADC_FULL_SCALE_MV / 4_095 * BATT_DIVIDER;
            BATTERY_MV.signal(Some(mv as u16));
        }
        Err(_) => BATTERY_MV.signal(None),
    }
}
