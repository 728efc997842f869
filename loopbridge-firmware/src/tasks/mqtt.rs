//! Broker session task.
//!
//! Owns the TCP socket and the MQTT client buffers for the lifetime of a
//! session. The controller drives it with commands and learns about the
//! session through `MQTT_EVENTS`, so connection lifetimes stay inside
//! this task instead of leaking borrows into the controller loop.

use embassy_futures::select::{select, Either};
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpAddress, Stack};
use embassy_time::{Duration, Ticker};
use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::utils::rng_generator::CountingRng;

use loopbridge_core::config::ServiceConfig;

use crate::channels::{MqttCommand, MqttEvent, MQTT_COMMANDS, MQTT_EVENTS};

const MQTT_BUF_LEN: usize = 1_024;
const TCP_BUF_LEN: usize = 2_048;
const KEEPALIVE_SECS: u16 = 60;
const PING_PERIOD_SECS: u64 = 30;
const SOCKET_TIMEOUT_SECS: u64 = 30;

enum SessionEnd {
    /// Peer or transport failed.
    Lost,
    /// Controller asked for an orderly disconnect.
    Closed,
    /// Controller asked for a new session while one was up.
    Reconnect(ServiceConfig),
}

#[embassy_executor::task]
pub async fn mqtt_task(stack: Stack<'static>) {
    let mut tcp_rx = [0u8; TCP_BUF_LEN];
    let mut tcp_tx = [0u8; TCP_BUF_LEN];
    let mut mqtt_rx = [0u8; MQTT_BUF_LEN];
    let mut mqtt_tx = [0u8; MQTT_BUF_LEN];

    let mut pending: Option<ServiceConfig> = None;
    loop {
        let service = match pending.take() {
            Some(service) => service,
            None => match MQTT_COMMANDS.receive().await {
                MqttCommand::Connect(service) => service,
                // Nothing to publish to or disconnect from yet.
                _ => continue,
            },
        };

        let Some(addr) = resolve(stack, service.host.as_str()).await else {
            log::warn!("mqtt: could not resolve {}", service.host.as_str());
            MQTT_EVENTS.signal(MqttEvent::ConnectFailed);
            continue;
        };

        let mut socket = TcpSocket::new(stack, &mut tcp_rx, &mut tcp_tx);
        socket.set_timeout(Some(Duration::from_secs(SOCKET_TIMEOUT_SECS)));
        if let Err(err) = socket.connect((addr, service.port)).await {
            log::warn!("mqtt: tcp connect to {}:{} failed: {err:?}", addr, service.port);
            MQTT_EVENTS.signal(MqttEvent::ConnectFailed);
            continue;
        }

        let mut config = ClientConfig::new(MqttVersion::MQTTv5, CountingRng(20000));
        config.add_client_id(service.client_id.as_str());
        if !service.username.is_empty() {
            config.add_username(service.username.as_str());
            config.add_password(service.password.as_str());
        }
        config.keep_alive = KEEPALIVE_SECS;
        config.max_packet_size = MQTT_BUF_LEN as u32;

        let mut client = MqttClient::<_, 5, _>::new(
            socket,
            &mut mqtt_tx,
            MQTT_BUF_LEN,
            &mut mqtt_rx,
            MQTT_BUF_LEN,
            config,
        );

        if let Err(code) = client.connect_to_broker().await {
            log::warn!("mqtt: broker handshake failed: {code:?}");
            MQTT_EVENTS.signal(MqttEvent::ConnectFailed);
            continue;
        }

        log::info!(
            "mqtt: session up with {}:{} as {}",
            service.host.as_str(),
            service.port,
            service.client_id.as_str()
        );
        MQTT_EVENTS.signal(MqttEvent::Connected);

        match serve(&mut client).await {
            SessionEnd::Lost => MQTT_EVENTS.signal(MqttEvent::SessionLost),
            SessionEnd::Closed => log::info!("mqtt: session closed"),
            SessionEnd::Reconnect(service) => pending = Some(service),
        }
    }
}

async fn serve<'a, T>(client: &mut MqttClient<'a, T, 5, CountingRng>) -> SessionEnd
where
    T: embedded_io_async::Read + embedded_io_async::Write,
{
    let mut ping = Ticker::every(Duration::from_secs(PING_PERIOD_SECS));
    loop {
        match select(MQTT_COMMANDS.receive(), ping.next()).await {
            Either::First(MqttCommand::Publish { topic, payload }) => {
                if let Err(code) = client
                    .send_message(
                        topic.as_str(),
                        payload.as_bytes(),
                        QualityOfService::QoS0,
                        false,
                    )
                    .await
                {
                    log::warn!("mqtt: publish to {} failed: {code:?}", topic.as_str());
                    return SessionEnd::Lost;
                }
            }
            Either::First(MqttCommand::Disconnect) => {
                let _ = client.disconnect().await;
                return SessionEnd::Closed;
            }
            Either::First(MqttCommand::Connect(service)) => {
                let _ = client.disconnect().await;
                return SessionEnd::Reconnect(service);
            }
            Either::Second(()) => {
                if client.send_ping().await.is_err() {
                    log::warn!("mqtt: keepalive ping failed");
                    return SessionEnd::Lost;
                }
            }
        }
    }
}

async fn resolve(stack: Stack<'static>, host: &str) -> Option<IpAddress> {
    if let Ok(ip) = host.parse::<core::net::Ipv4Addr>() {
        return Some(IpAddress::Ipv4(ip));
    }
    stack
        .dns_query(host, DnsQueryType::A)
        .await
        .ok()?
        .first()
        .copied()
}
