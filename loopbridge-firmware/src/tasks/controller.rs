//! Connectivity controller task.
//!
//! The event loop at the heart of the bridge: brings up the access
//! point, joins the uplink, opens the broker session, services publish
//! requests and forwards ranging frames to the UDP sink. Portal edits
//! are persisted to flash here before the affected connection is
//! re-established. Decisions
//! (deferral, retry, watchdog) live in `loopbridge_core::control`; this
//! task supplies the hardware side effects.

use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_time::{with_timeout, Duration, Timer};
use esp_radio::wifi::WifiController;

use loopbridge_core::control::{
    ConnectPlan, Controller, Verdict, LINK_POLL_ATTEMPTS, LINK_POLL_INTERVAL_MS, LOOP_PERIOD_MS,
};
use loopbridge_core::events::{
    CONNECT_SERVICE, CONNECT_WIFI, PUBLISH_INFO, PUBLISH_MEASURES, PUBLISH_STATUS, START_AP,
};
use loopbridge_core::indicator::IndicatorMode;
use loopbridge_hal_esp32::flash::EspNvStorage;
use loopbridge_protocol::{payload, SampleFrame};

use crate::channels::{
    ButtonAction, ConfigHandle, MqttCommand, MqttEvent, NtpRequest, PublishPeriods, ADC_READING,
    BATTERY_MV, BUTTON_ACTION, CALIBRATION_UPDATED, EVENTS, MODE_LED, MQTT_COMMANDS, MQTT_EVENTS,
    NETWORK_UPDATED, NTP_SYNC, PUBLISH_PERIODS, SAMPLE_CHANNEL, SERVICE_UPDATED,
};
use crate::clock::now_epoch_ms;
use crate::wifi;

type Store = loopbridge_core::config::ConfigStore<EspNvStorage>;

/// How long to wait for the broker task to report on a connect command.
const BROKER_HANDSHAKE_TIMEOUT_MS: u64 = 20_000;

/// Cached last-value readings used at publish time.
#[derive(Default)]
struct Latest {
    adc_raw: Option<u16>,
    battery_mv: Option<u16>,
    frame: Option<SampleFrame>,
}

#[embassy_executor::task]
pub async fn controller_task(
    mut radio: WifiController<'static>,
    sta_stack: Stack<'static>,
    config: &'static ConfigHandle,
    mut store: Store,
) {
    let mut ctrl = Controller::new();
    {
        let cfg = config.lock().await;
        ctrl.refresh_calibration(&cfg.cal);
    }

    EVENTS.set(START_AP | CONNECT_WIFI);
    MODE_LED.signal(IndicatorMode::Off);

    let mut udp_rx_meta = [PacketMetadata::EMPTY; 4];
    let mut udp_rx = [0u8; 256];
    let mut udp_tx_meta = [PacketMetadata::EMPTY; 4];
    let mut udp_tx = [0u8; 512];
    let mut udp = UdpSocket::new(sta_stack, &mut udp_rx_meta, &mut udp_rx, &mut udp_tx_meta, &mut udp_tx);
    if let Err(err) = udp.bind(47808) {
        log::error!("controller: udp bind failed: {err:?}");
    }

    let mut session_up = false;
    let mut latest = Latest::default();

    loop {
        if EVENTS.take(START_AP) {
            let (ap, sta) = {
                let cfg = config.lock().await;
                (cfg.ap.clone(), cfg.wifi.clone())
            };
            match wifi::start_radio(&mut radio, &ap, &sta).await {
                Ok(()) => {
                    log::info!("controller: access point '{}' up", ap.ssid.as_str());
                    // The AP only stays up for an operator in config mode.
                    if !ctrl.config_mode_active() {
                        if let Err(err) = wifi::station_only(&mut radio, &sta) {
                            log::warn!("controller: dropping access point failed: {err:?}");
                        }
                    }
                }
                Err(err) => {
                    log::error!("controller: radio start failed: {err:?}");
                    EVENTS.set(START_AP);
                }
            }
        }

        if CALIBRATION_UPDATED.try_take().is_some() {
            let cal = config.lock().await.cal.clone();
            ctrl.refresh_calibration(&cal);
            if store.save_calibration(&cal).is_err() {
                log::error!("controller: persisting calibration failed");
            }
        }

        let network_updated = NETWORK_UPDATED.try_take().is_some();
        let service_updated = SERVICE_UPDATED.try_take().is_some();
        if network_updated || service_updated {
            let cfg = config.lock().await.clone();
            if store.save(&cfg).is_err() {
                log::error!("controller: persisting portal edit failed");
            }
        }

        if EVENTS.contains(CONNECT_WIFI) || network_updated {
            EVENTS.set(CONNECT_WIFI);
            connect_wifi(&mut radio, sta_stack, config, &mut ctrl, &mut session_up).await;
        }

        if EVENTS.contains(CONNECT_SERVICE) || service_updated {
            EVENTS.set(CONNECT_SERVICE);
            if sta_stack.is_link_up() {
                connect_service(
                    &mut radio,
                    config,
                    &mut ctrl,
                    &mut session_up,
                    service_updated,
                )
                .await;
            }
        }

        if let Some(event) = MQTT_EVENTS.try_take() {
            if event == MqttEvent::SessionLost && session_up {
                log::warn!("controller: broker session lost");
                session_up = false;
                MODE_LED.signal(IndicatorMode::Blink);
                EVENTS.set(CONNECT_SERVICE);
            }
        }

        // Uplink health: a dropped association restarts the join sequence.
        if !sta_stack.is_link_up() && !EVENTS.contains(CONNECT_WIFI) {
            log::warn!("controller: uplink lost");
            MODE_LED.signal(IndicatorMode::Off);
            if session_up {
                session_up = false;
                let _ = MQTT_COMMANDS.try_send(MqttCommand::Disconnect);
            }
            EVENTS.set(CONNECT_WIFI);
            if ctrl.record_failure() == Verdict::Restart {
                restart();
            }
        }

        refresh_latest(&mut latest);
        if session_up {
            service_publishes(config, &ctrl, &latest).await;
        }

        if let Some(action) = BUTTON_ACTION.try_take() {
            handle_button(action, &mut radio, config, &mut ctrl, &mut store).await;
        }

        // The bounded queue wait doubles as the loop pacing.
        match with_timeout(
            Duration::from_millis(LOOP_PERIOD_MS),
            SAMPLE_CHANNEL.receive(),
        )
        .await
        {
            Ok(frame) => {
                latest.frame = Some(frame);
                forward_frame(&mut udp, sta_stack, config, &frame).await;
            }
            Err(_) => {}
        }
    }
}

/// One station join attempt: apply settings, associate, poll for the
/// link. A portal edit mid-poll aborts so the new settings take effect
/// immediately.
async fn connect_wifi(
    radio: &mut WifiController<'static>,
    sta_stack: Stack<'static>,
    config: &'static ConfigHandle,
    ctrl: &mut Controller,
    session_up: &mut bool,
) {
    if *session_up {
        *session_up = false;
        let _ = MQTT_COMMANDS.try_send(MqttCommand::Disconnect);
    }
    EVENTS.clear(CONNECT_SERVICE);
    MODE_LED.signal(IndicatorMode::Off);

    let (ap, sta) = {
        let cfg = config.lock().await;
        (cfg.ap.clone(), cfg.wifi.clone())
    };

    match ctrl.plan_wifi_connect(&sta) {
        ConnectPlan::Defer { retry_ms } => {
            log::warn!("controller: no station ssid configured, retrying in {retry_ms}ms");
            Timer::after(Duration::from_millis(retry_ms)).await;
            return;
        }
        ConnectPlan::Proceed => {}
    }

    log::info!("controller: joining '{}'", sta.ssid.as_str());
    let keep_ap = ctrl.config_mode_active().then_some(&ap);
    if let Err(err) = wifi::join_station(radio, keep_ap, &sta, sta_stack).await {
        log::warn!("controller: association failed: {err:?}");
        if ctrl.record_failure() == Verdict::Restart {
            restart();
        }
        return;
    }

    for _ in 0..LINK_POLL_ATTEMPTS {
        if sta_stack.is_link_up() {
            log::info!("controller: uplink ready");
            MODE_LED.signal(IndicatorMode::Blink);
            ctrl.record_success();
            EVENTS.clear(CONNECT_WIFI);
            EVENTS.set(CONNECT_SERVICE);
            return;
        }
        if NETWORK_UPDATED.signaled() {
            log::info!("controller: settings changed mid-join, restarting attempt");
            return;
        }
        Timer::after(Duration::from_millis(LINK_POLL_INTERVAL_MS)).await;
    }

    log::warn!("controller: join timed out");
    if ctrl.record_failure() == Verdict::Restart {
        restart();
    }
}

/// One broker connect attempt through the session task.
async fn connect_service(
    radio: &mut WifiController<'static>,
    config: &'static ConfigHandle,
    ctrl: &mut Controller,
    session_up: &mut bool,
    portal_triggered: bool,
) {
    let service = config.lock().await.service.clone();
    match ctrl.plan_service_connect(&service) {
        ConnectPlan::Defer { retry_ms } => {
            log::warn!("controller: service settings incomplete, retrying in {retry_ms}ms");
            Timer::after(Duration::from_millis(retry_ms)).await;
            return;
        }
        ConnectPlan::Proceed => {}
    }

    MQTT_COMMANDS.send(MqttCommand::Connect(ctrl.service().clone())).await;
    let outcome = with_timeout(
        Duration::from_millis(BROKER_HANDSHAKE_TIMEOUT_MS),
        MQTT_EVENTS.wait(),
    )
    .await;

    match outcome {
        Ok(MqttEvent::Connected) => {
            *session_up = true;
            ctrl.record_success();
            EVENTS.clear(CONNECT_SERVICE);
            MODE_LED.signal(IndicatorMode::On);

            let snapshot = ctrl.service();
            PUBLISH_PERIODS.signal(PublishPeriods {
                measures: snapshot.measures.period_ms(),
                status: snapshot.status.period_ms(),
                info: snapshot.info.period_ms(),
            });

            let ntp = config.lock().await.ntp.clone();
            NTP_SYNC.signal(NtpRequest {
                host: ntp.host,
                port: ntp.port,
                period: ntp.period,
            });

            // A session brought up by anything except a portal edit means
            // provisioning is done: drop the access point and leave
            // config mode.
            if !portal_triggered {
                if ctrl.exit_config_mode() {
                    log::info!("controller: leaving config mode");
                }
                let sta = config.lock().await.wifi.clone();
                if let Err(err) = wifi::station_only(radio, &sta) {
                    log::warn!("controller: dropping access point failed: {err:?}");
                }
            }
        }
        Ok(_) | Err(_) => {
            log::warn!("controller: broker connect failed");
            if ctrl.record_failure() == Verdict::Restart {
                restart();
            }
            Timer::after(Duration::from_millis(
                loopbridge_core::control::BROKER_RETRY_MS,
            ))
            .await;
        }
    }
}

fn refresh_latest(latest: &mut Latest) {
    if let Some(raw) = ADC_READING.try_take() {
        latest.adc_raw = raw;
    }
    if let Some(mv) = BATTERY_MV.try_take() {
        latest.battery_mv = mv;
    }
}

/// Service pending publish flags against the snapshotted session.
async fn service_publishes(config: &'static ConfigHandle, ctrl: &Controller, latest: &Latest) {
    let now = now_epoch_ms();
    let service = ctrl.service();

    if EVENTS.take(PUBLISH_MEASURES) {
        let cal = config.lock().await.cal.clone();
        let mut readings: heapless::Vec<payload::Reading<'_>, 2> = heapless::Vec::new();

        if !cal.sensor_1.is_empty() {
            let raw = latest.adc_raw;
            let _ = readings.push(payload::Reading {
                sensor_id: cal.sensor_1.as_str(),
                value: ctrl.equation().apply(raw.unwrap_or(0) as f64),
                unit: "mA",
                ok: raw.is_some(),
            });
        }
        if !cal.sensor_2.is_empty() {
            let _ = readings.push(payload::Reading {
                sensor_id: cal.sensor_2.as_str(),
                value: latest
                    .frame
                    .map(|f| f.detection_distance as f64)
                    .unwrap_or(0.0),
                unit: "cm",
                ok: latest.frame.is_some(),
            });
        }

        if let Ok(body) = payload::measurement(&readings, now) {
            publish(&service.measures.topic, body).await;
        }
    }

    if EVENTS.take(PUBLISH_STATUS) {
        let batt = latest.battery_mv.map(|mv| mv as f64 / 1_000.0).unwrap_or(0.0);
        if let Ok(body) = payload::status(batt, now) {
            publish(&service.status.topic, body).await;
        }
    }

    if EVENTS.take(PUBLISH_INFO) {
        if let Ok(body) = payload::info(service.geo.lat, service.geo.lng, now) {
            publish(&service.info.topic, body).await;
        }
    }
}

async fn publish(topic: &str, body: heapless::String<{ payload::MAX_PAYLOAD_LEN }>) {
    let mut owned_topic = heapless::String::new();
    if owned_topic.push_str(topic).is_err() {
        return;
    }
    if MQTT_COMMANDS
        .try_send(MqttCommand::Publish {
            topic: owned_topic,
            payload: body,
        })
        .is_err()
    {
        log::warn!("controller: publish queue full, dropping frame for {topic}");
    }
}

async fn handle_button(
    action: ButtonAction,
    radio: &mut WifiController<'static>,
    config: &'static ConfigHandle,
    ctrl: &mut Controller,
    store: &mut Store,
) {
    match action {
        ButtonAction::Toggle => {
            if ctrl.enter_config_mode() {
                log::info!("controller: config mode active");
                EVENTS.set(START_AP);
            } else if ctrl.exit_config_mode() {
                log::info!("controller: config mode off");
                let sta = config.lock().await.wifi.clone();
                if let Err(err) = wifi::station_only(radio, &sta) {
                    log::warn!("controller: dropping access point failed: {err:?}");
                }
            }
        }
        ButtonAction::FactoryReset => {
            if !ctrl.config_mode_active() {
                log::info!("controller: factory reset ignored outside config mode");
                return;
            }
            match store.reset_to_default() {
                Ok(cfg) => {
                    *config.lock().await = cfg;
                    log::warn!("controller: factory reset, restarting");
                    restart();
                }
                Err(err) => log::error!("controller: factory reset failed: {err:?}"),
            }
        }
    }
}

/// Forward a ranging frame to the configured UDP sink.
async fn forward_frame(
    udp: &mut UdpSocket<'_>,
    sta_stack: Stack<'static>,
    config: &'static ConfigHandle,
    frame: &SampleFrame,
) {
    let sink = config.lock().await.udp;
    if sink.port == 0 || sink.addr.is_unspecified() || !sta_stack.is_link_up() {
        return;
    }
    let Ok(csv) = frame.to_csv() else { return };
    let [a, b, c, d] = sink.addr.octets();
    let endpoint = IpEndpoint::new(core::net::Ipv4Addr::new(a, b, c, d).into(), sink.port);
    if let Err(err) = udp.send_to(csv.as_bytes(), endpoint).await {
        log::debug!("controller: udp forward failed: {err:?}");
    }
}

fn restart() -> ! {
    log::error!("controller: restarting device");
    esp_hal::system::software_reset()
}
