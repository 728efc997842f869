//! WiFi radio configuration helpers.
//!
//! The bridge runs the radio in AP+STA mode: the access point carries the
//! captive portal while the station side is the uplink. The controller
//! task drives these helpers from its event loop.

use embassy_net::{ConfigV4, Ipv4Cidr, Runner, Stack, StaticConfigV4};
use esp_radio::wifi::{
    AccessPointConfig, ClientConfig, ModeConfig, WifiController, WifiDevice,
};
use heapless::Vec;

use loopbridge_core::config::{ApConfig, IpQuad, WifiConfig, WifiMode};

fn to_ipv4(quad: IpQuad) -> core::net::Ipv4Addr {
    let [a, b, c, d] = quad.octets();
    core::net::Ipv4Addr::new(a, b, c, d)
}

fn prefix_len(netmask: IpQuad) -> u8 {
    u32::from_be_bytes(netmask.octets()).count_ones() as u8
}

/// Station IPv4 settings derived from the persisted record.
pub fn station_ipv4_config(wifi: &WifiConfig) -> ConfigV4 {
    match wifi.mode {
        WifiMode::Dhcp => ConfigV4::Dhcp(Default::default()),
        WifiMode::Static => {
            let mut dns_servers = Vec::new();
            for dns in [wifi.primary_dns, wifi.secondary_dns] {
                if !dns.is_unspecified() {
                    let _ = dns_servers.push(to_ipv4(dns).into());
                }
            }
            ConfigV4::Static(StaticConfigV4 {
                address: Ipv4Cidr::new(to_ipv4(wifi.ip), prefix_len(wifi.netmask)),
                gateway: (!wifi.gateway.is_unspecified()).then(|| to_ipv4(wifi.gateway)),
                dns_servers,
            })
        }
    }
}

/// Stack-creation form of the station settings.
pub fn station_net_config(wifi: &WifiConfig) -> embassy_net::Config {
    match station_ipv4_config(wifi) {
        ConfigV4::Static(static_config) => embassy_net::Config::ipv4_static(static_config),
        ConfigV4::Dhcp(dhcp) => embassy_net::Config::dhcpv4(dhcp),
        ConfigV4::None => Default::default(),
    }
}

/// Stack-creation form of the access-point settings.
pub fn ap_net_config(ap: &ApConfig) -> embassy_net::Config {
    match ap_ipv4_config(ap) {
        ConfigV4::Static(static_config) => embassy_net::Config::ipv4_static(static_config),
        _ => Default::default(),
    }
}

/// Access-point IPv4 settings: static address, device as gateway.
pub fn ap_ipv4_config(ap: &ApConfig) -> ConfigV4 {
    ConfigV4::Static(StaticConfigV4 {
        address: Ipv4Cidr::new(to_ipv4(ap.addr), 24),
        gateway: Some(to_ipv4(ap.addr)),
        dns_servers: Default::default(),
    })
}

fn client_config(wifi: &WifiConfig) -> ClientConfig {
    ClientConfig::default()
        .with_ssid(wifi.ssid.as_str().into())
        .with_password(wifi.pass.as_str().into())
}

fn access_point_config(ap: &ApConfig) -> AccessPointConfig {
    AccessPointConfig::default()
        .with_ssid(ap.ssid.as_str().into())
        .with_password(ap.pass.as_str().into())
}

/// Configure AP+STA mode and start the radio. Idempotent on restart.
pub async fn start_radio(
    controller: &mut WifiController<'static>,
    ap: &ApConfig,
    wifi: &WifiConfig,
) -> Result<(), esp_radio::wifi::WifiError> {
    controller.set_config(&ModeConfig::ApSta(client_config(wifi), access_point_config(ap)))?;
    if !matches!(controller.is_started(), Ok(true)) {
        controller.start_async().await?;
    }
    Ok(())
}

/// Drop the access point once provisioning is done; the uplink stays.
pub fn station_only(
    controller: &mut WifiController<'static>,
    wifi: &WifiConfig,
) -> Result<(), esp_radio::wifi::WifiError> {
    controller.set_config(&ModeConfig::Client(client_config(wifi)))
}

/// Reapply the station settings and begin an association attempt.
/// The access point is carried along only when `ap` is given, so a join
/// outside config mode does not revive a dropped AP.
pub async fn join_station(
    controller: &mut WifiController<'static>,
    ap: Option<&ApConfig>,
    wifi: &WifiConfig,
    sta_stack: Stack<'static>,
) -> Result<(), esp_radio::wifi::WifiError> {
    let mode = match ap {
        Some(ap) => ModeConfig::ApSta(client_config(wifi), access_point_config(ap)),
        None => ModeConfig::Client(client_config(wifi)),
    };
    controller.set_config(&mode)?;
    if !matches!(controller.is_started(), Ok(true)) {
        controller.start_async().await?;
    }
    sta_stack.set_config_v4(station_ipv4_config(wifi));
    controller.connect_async().await
}

/// embassy-net runner, one instance per interface.
#[embassy_executor::task(pool_size = 2)]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}
