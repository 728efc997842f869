//! Loopbridge - 4-20mA current-loop WiFi sensor bridge firmware.
//!
//! ESP32 binary: brings up the radio in AP+STA mode, loads the persisted
//! configuration from flash and spawns the task set. All decision logic
//! lives in `loopbridge-core`; this crate only wires it to hardware.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_net::StackResources;
use esp_hal::analog::adc::{Adc, AdcConfig, Attenuation};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::{Config as UartConfig, Uart};
use static_cell::StaticCell;

use loopbridge_core::config::{ConfigStore, LoadOutcome};
use loopbridge_hal_esp32::flash::EspNvStorage;

mod channels;
mod clock;
mod tasks;
mod wifi;

use channels::ConfigHandle;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// Default app-descriptor required by the esp-idf bootloader.
esp_bootloader_esp_idf::esp_app_desc!();

/// Radar UART baud rate (LD2410 factory default).
const RADAR_BAUD: u32 = 256_000;

static CONFIG: StaticCell<ConfigHandle> = StaticCell::new();
static STA_RESOURCES: StaticCell<StackResources<6>> = StaticCell::new();
static AP_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();
    log::info!("loopbridge firmware starting");

    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    esp_alloc::heap_allocator!(size: 96 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let radio_init = esp_radio::init().expect("radio controller init failed");
    let (radio, interfaces) = esp_radio::wifi::new(
        &radio_init,
        peripherals.WIFI,
        esp_radio::wifi::Config::default(),
    )
    .expect("wifi init failed");

    let mac = interfaces.sta.mac_address();

    // Configuration from the flash region, defaults restored on first boot
    // or a version bump.
    let mut store = ConfigStore::new(EspNvStorage::new(), mac);
    let cfg = match store.load() {
        Ok((cfg, LoadOutcome::Loaded)) => cfg,
        Ok((cfg, LoadOutcome::DefaultsRestored)) => {
            log::warn!("no valid stored config, factory defaults active");
            cfg
        }
        Err(err) => {
            log::error!("config load failed: {err:?}, running on defaults");
            embassy_time::Timer::after(embassy_time::Duration::from_millis(
                loopbridge_core::control::CONFIG_RETRY_MS,
            ))
            .await;
            loopbridge_core::config::ConfigRecord::defaults(mac, &Default::default())
        }
    };
    log::info!(
        "device id {} (ap '{}')",
        cfg.service.client_id.as_str(),
        cfg.ap.ssid.as_str()
    );
    let loop_sensor_id = cfg.cal.sensor_1.clone();
    let ap_net_config = wifi::ap_net_config(&cfg.ap);
    let sta_net_config = wifi::station_net_config(&cfg.wifi);
    let config = &*CONFIG.init(ConfigHandle::new(cfg));

    // One embassy-net stack per radio interface.
    let seed = u64::from_le_bytes([mac[0], mac[1], mac[2], mac[3], mac[4], mac[5], 0x4d, 0xa1]);
    let (sta_stack, sta_runner) = embassy_net::new(
        interfaces.sta,
        sta_net_config,
        STA_RESOURCES.init(StackResources::new()),
        seed,
    );
    let (_ap_stack, ap_runner) = embassy_net::new(
        interfaces.ap,
        ap_net_config,
        AP_RESOURCES.init(StackResources::new()),
        seed ^ 0xffff_ffff,
    );

    // Sensor buses: radar on UART2, loop converter on I2C, battery divider
    // on the internal ADC.
    let uart_config = UartConfig::default().with_baudrate(RADAR_BAUD);
    let uart = Uart::new(peripherals.UART2, uart_config)
        .expect("radar uart init failed")
        .with_rx(peripherals.GPIO16)
        .with_tx(peripherals.GPIO17)
        .into_async();
    let (radar_rx, _radar_tx) = uart.split();

    let i2c = I2c::new(peripherals.I2C0, I2cConfig::default())
        .expect("i2c init failed")
        .with_sda(peripherals.GPIO21)
        .with_scl(peripherals.GPIO22)
        .into_async();

    let mut adc_config = AdcConfig::new();
    let battery_pin = adc_config.enable_pin(peripherals.GPIO35, Attenuation::_11dB);
    let battery_adc = Adc::new(peripherals.ADC1, adc_config);

    let mode_led = Output::new(peripherals.GPIO2, Level::Low, OutputConfig::default());
    let state_led = Output::new(peripherals.GPIO4, Level::Low, OutputConfig::default());
    let button = Input::new(
        peripherals.GPIO0,
        InputConfig::default().with_pull(Pull::Down),
    );

    spawner.must_spawn(wifi::net_task(sta_runner));
    spawner.must_spawn(wifi::net_task(ap_runner));
    spawner.must_spawn(clock::clock_task(sta_stack));
    spawner.must_spawn(tasks::mqtt_task(sta_stack));
    spawner.must_spawn(tasks::publish_scheduler_task());
    spawner.must_spawn(tasks::mode_indicator_task(mode_led));
    spawner.must_spawn(tasks::state_indicator_task(state_led));
    spawner.must_spawn(tasks::button_task(button));
    spawner.must_spawn(tasks::sampler_task(
        radar_rx,
        i2c,
        battery_adc,
        battery_pin,
        loop_sensor_id,
    ));
    spawner.must_spawn(tasks::controller_task(radio, sta_stack, config, store));

    // Everything runs in the spawned tasks.
    loop {
        embassy_time::Timer::after(embassy_time::Duration::from_secs(60)).await;
    }
}
