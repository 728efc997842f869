//! Configuration record types and factory defaults.

use core::fmt::Write;

use heapless::String;
use serde::{Deserialize, Serialize};

use super::calibration::CalRecord;

/// Bump when the layout of [`ConfigRecord`] changes. A mismatch on load
/// discards the stored record and restores factory defaults.
pub const CFG_VERSION: u32 = 1;

pub const SSID_LEN: usize = 32;
pub const PASS_LEN: usize = 32;
pub const HOST_LEN: usize = 64;
pub const CLIENT_ID_LEN: usize = 32;
pub const USERNAME_LEN: usize = 64;
pub const TOPIC_LEN: usize = 64;
pub const SENSOR_ID_LEN: usize = 16;
pub const WEB_CRED_LEN: usize = 16;

const AP_DEFAULT_PASS: &str = "3Qd400Ak&1i8";
const WEB_DEFAULT_USER: &str = "admin";
const WEB_DEFAULT_PASS: &str = "Y32Pv9RY";
const NTP_DEFAULT_HOST: &str = "pool.ntp.org";
const BROKER_DEFAULT_HOST: &str = "industrial.api.ubidots.com";
const BROKER_DEFAULT_PORT: u16 = 1883;

/// An IPv4 address as four octets, independent of any network stack type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpQuad(pub [u8; 4]);

impl IpQuad {
    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self([a, b, c, d])
    }

    pub fn octets(&self) -> [u8; 4] {
        self.0
    }

    pub fn is_unspecified(&self) -> bool {
        self.0 == [0, 0, 0, 0]
    }
}

impl core::fmt::Display for IpQuad {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

/// Unit for publish periods configured through the portal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    #[default]
    Second,
    Minute,
    Hour,
}

impl TimeUnit {
    fn millis(self) -> u64 {
        match self {
            TimeUnit::Second => 1_000,
            TimeUnit::Minute => 60_000,
            TimeUnit::Hour => 3_600_000,
        }
    }
}

/// One publish stream: topic, period and period unit.
///
/// A period of zero or less disables the stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PubTopic {
    pub topic: String<TOPIC_LEN>,
    pub period: i32,
    pub unit: TimeUnit,
}

impl PubTopic {
    /// Publish period in milliseconds, or `None` when the stream is disabled.
    pub fn period_ms(&self) -> Option<u64> {
        if self.period <= 0 {
            None
        } else {
            Some(self.period as u64 * self.unit.millis())
        }
    }
}

/// Access-point and captive-portal settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApConfig {
    pub ssid: String<SSID_LEN>,
    pub pass: String<PASS_LEN>,
    pub addr: IpQuad,
    pub web_user: String<WEB_CRED_LEN>,
    pub web_pass: String<WEB_CRED_LEN>,
}

/// Station addressing mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WifiMode {
    #[default]
    Dhcp,
    Static,
}

/// Station (uplink) WiFi settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WifiConfig {
    pub ssid: String<SSID_LEN>,
    pub pass: String<PASS_LEN>,
    pub mode: WifiMode,
    pub ip: IpQuad,
    pub netmask: IpQuad,
    pub gateway: IpQuad,
    pub primary_dns: IpQuad,
    pub secondary_dns: IpQuad,
}

/// Device location reported in the info stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// Telemetry service (MQTT broker) settings and the three publish streams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: String<HOST_LEN>,
    pub port: u16,
    pub client_id: String<CLIENT_ID_LEN>,
    pub username: String<USERNAME_LEN>,
    pub password: String<PASS_LEN>,
    pub measures: PubTopic,
    pub status: PubTopic,
    pub info: PubTopic,
    pub geo: Location,
}

/// Time synchronization settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NtpConfig {
    pub host: String<HOST_LEN>,
    pub port: u16,
    /// Resync interval in seconds.
    pub period: u32,
}

/// Raw-frame UDP sink. Disabled while the port is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdpConfig {
    pub addr: IpQuad,
    pub port: u16,
}

/// The complete persisted configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    pub ap: ApConfig,
    pub wifi: WifiConfig,
    pub service: ServiceConfig,
    pub ntp: NtpConfig,
    pub udp: UdpConfig,
    pub cal: CalRecord,
}

impl ConfigRecord {
    /// Factory defaults, derived from the station MAC address.
    ///
    /// The AP SSID carries the last two MAC octets so multiple unconfigured
    /// devices in range stay distinguishable. The MQTT client id is the full
    /// MAC as lowercase hex, which is also what the default topic paths use.
    pub fn defaults(mac: [u8; 6], cal: &CalRecord) -> Self {
        let mut ap = ApConfig {
            addr: IpQuad::new(192, 168, 4, 1),
            ..Default::default()
        };
        let _ = write!(ap.ssid, "Logger_4-20mA_{:02X}{:02X}", mac[4], mac[5]);
        let _ = ap.pass.push_str(AP_DEFAULT_PASS);
        let _ = ap.web_user.push_str(WEB_DEFAULT_USER);
        let _ = ap.web_pass.push_str(WEB_DEFAULT_PASS);

        let mut service = ServiceConfig {
            port: BROKER_DEFAULT_PORT,
            measures: PubTopic {
                period: 20,
                unit: TimeUnit::Second,
                ..Default::default()
            },
            status: PubTopic {
                period: 1,
                unit: TimeUnit::Minute,
                ..Default::default()
            },
            // Disabled until the portal sets a period.
            info: PubTopic::default(),
            ..Default::default()
        };
        let _ = service.host.push_str(BROKER_DEFAULT_HOST);
        for octet in mac {
            let _ = write!(service.client_id, "{octet:02x}");
        }
        for topic in [
            &mut service.measures.topic,
            &mut service.status.topic,
            &mut service.info.topic,
        ] {
            let _ = write!(topic, "/v2.0/devices/{}", service.client_id);
        }

        let mut ntp = NtpConfig {
            port: 123,
            period: 3_600,
            ..Default::default()
        };
        let _ = ntp.host.push_str(NTP_DEFAULT_HOST);

        Self {
            ap,
            wifi: WifiConfig::default(),
            service,
            ntp,
            udp: UdpConfig::default(),
            cal: cal.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: [u8; 6] = [0x24, 0x6f, 0x28, 0xab, 0xcd, 0xef];

    #[test]
    fn period_ms_converts_units() {
        let mut topic = PubTopic {
            period: 20,
            unit: TimeUnit::Second,
            ..Default::default()
        };
        assert_eq!(topic.period_ms(), Some(20_000));

        topic.period = 1;
        topic.unit = TimeUnit::Minute;
        assert_eq!(topic.period_ms(), Some(60_000));

        topic.period = 2;
        topic.unit = TimeUnit::Hour;
        assert_eq!(topic.period_ms(), Some(7_200_000));
    }

    #[test]
    fn zero_or_negative_period_disables_stream() {
        let mut topic = PubTopic {
            period: 0,
            unit: TimeUnit::Second,
            ..Default::default()
        };
        assert_eq!(topic.period_ms(), None);
        topic.period = -5;
        assert_eq!(topic.period_ms(), None);
    }

    #[test]
    fn defaults_derive_identifiers_from_mac() {
        let cfg = ConfigRecord::defaults(MAC, &CalRecord::default());
        assert_eq!(cfg.ap.ssid.as_str(), "Logger_4-20mA_CDEF");
        assert_eq!(cfg.service.client_id.as_str(), "246f28abcdef");
        assert_eq!(
            cfg.service.measures.topic.as_str(),
            "/v2.0/devices/246f28abcdef"
        );
        assert_eq!(cfg.service.host.as_str(), "industrial.api.ubidots.com");
        assert_eq!(cfg.service.port, 1883);
        assert_eq!(cfg.ap.addr, IpQuad::new(192, 168, 4, 1));
        assert_eq!(cfg.wifi.mode, WifiMode::Dhcp);
        assert_eq!(cfg.ntp.host.as_str(), "pool.ntp.org");
    }

    #[test]
    fn default_streams_match_factory_periods() {
        let cfg = ConfigRecord::defaults(MAC, &CalRecord::default());
        assert_eq!(cfg.service.measures.period_ms(), Some(20_000));
        assert_eq!(cfg.service.status.period_ms(), Some(60_000));
        assert_eq!(cfg.service.info.period_ms(), None);
    }
}
