//! Inter-task communication.
//!
//! Static channels, signals and flags shared between the Embassy tasks.
//! The captive portal (served while config mode is active) raises the
//! `*_UPDATED` signals after writing new settings; the controller polls
//! them once per loop.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use heapless::String;

use loopbridge_core::config::{ConfigRecord, TOPIC_LEN};
use loopbridge_core::events::EventFlags;
use loopbridge_core::indicator::IndicatorMode;
use loopbridge_core::sampling::SampleChannel;
use loopbridge_protocol::payload::MAX_PAYLOAD_LEN;

/// The live configuration, shared between the controller and the portal.
pub type ConfigHandle = Mutex<CriticalSectionRawMutex, ConfigRecord>;

/// Work requests consumed by the controller loop.
pub static EVENTS: EventFlags = EventFlags::new();

/// Ranging frames from the sampler to the controller.
pub static SAMPLE_CHANNEL: SampleChannel = Channel::new();

/// Latest loop-current reading from the sampler, raw converter counts.
/// `None` when the conversion failed.
pub static ADC_READING: Signal<CriticalSectionRawMutex, Option<u16>> = Signal::new();

/// Latest battery voltage in millivolts, `None` on a failed read.
pub static BATTERY_MV: Signal<CriticalSectionRawMutex, Option<u16>> = Signal::new();

/// Portal wrote new station network settings.
pub static NETWORK_UPDATED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Portal wrote new telemetry service settings.
pub static SERVICE_UPDATED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Portal wrote new calibration anchors.
pub static CALIBRATION_UPDATED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Mode LED command from the controller.
pub static MODE_LED: Signal<CriticalSectionRawMutex, IndicatorMode> = Signal::new();

/// Button gestures from the button task.
pub static BUTTON_ACTION: Signal<CriticalSectionRawMutex, ButtonAction> = Signal::new();

/// Publish stream periods for the scheduler, refreshed on broker connect.
pub static PUBLISH_PERIODS: Signal<CriticalSectionRawMutex, PublishPeriods> = Signal::new();

/// NTP host handed to the clock task once the uplink is ready.
pub static NTP_SYNC: Signal<CriticalSectionRawMutex, NtpRequest> = Signal::new();

/// Commands to the broker session task.
pub static MQTT_COMMANDS: Channel<CriticalSectionRawMutex, MqttCommand, 4> = Channel::new();

/// Session state reported back by the broker task.
pub static MQTT_EVENTS: Signal<CriticalSectionRawMutex, MqttEvent> = Signal::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// Short press: toggle config mode.
    Toggle,
    /// Long hold: factory reset, honored only while config mode is active.
    FactoryReset,
}

/// Publish periods in milliseconds; `None` disables a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishPeriods {
    pub measures: Option<u64>,
    pub status: Option<u64>,
    pub info: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct NtpRequest {
    pub host: String<{ loopbridge_core::config::HOST_LEN }>,
    pub port: u16,
    /// Resync interval in seconds.
    pub period: u32,
}

pub enum MqttCommand {
    /// Open a session with the snapshotted service settings.
    Connect(loopbridge_core::config::ServiceConfig),
    Publish {
        topic: String<TOPIC_LEN>,
        payload: String<MAX_PAYLOAD_LEN>,
    },
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttEvent {
    Connected,
    ConnectFailed,
    SessionLost,
}
