//! Wall-clock time via SNTP.
//!
//! Telemetry payloads carry epoch-millisecond timestamps. The offset
//! between the monotonic uptime clock and the epoch is established by an
//! SNTP exchange once the uplink is ready, then refreshed on the
//! configured period. Before the first sync, [`now_epoch_ms`] falls back
//! to raw uptime so payloads are still ordered.

use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpAddress, Stack};
use embassy_time::{Duration, Instant, Timer};
use portable_atomic::{AtomicU64, Ordering};
use sntpc::{get_time, NtpContext, NtpTimestampGenerator};

use crate::channels::NTP_SYNC;

/// Epoch millis minus uptime millis. Zero means never synced.
static EPOCH_OFFSET_MS: AtomicU64 = AtomicU64::new(0);

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> u64 {
    Instant::now().as_millis() + EPOCH_OFFSET_MS.load(Ordering::Relaxed)
}

#[derive(Copy, Clone, Default)]
struct Timestamp {
    epoch_ms: u64,
}

impl NtpTimestampGenerator for Timestamp {
    fn init(&mut self) {
        self.epoch_ms = now_epoch_ms();
    }

    fn timestamp_sec(&self) -> u64 {
        self.epoch_ms / 1_000
    }

    fn timestamp_subsec_micros(&self) -> u32 {
        (self.epoch_ms % 1_000) as u32 * 1_000
    }
}

/// Waits for a sync request from the controller, then keeps the offset
/// fresh on the configured period.
#[embassy_executor::task]
pub async fn clock_task(stack: Stack<'static>) {
    let mut rx_meta = [PacketMetadata::EMPTY; 4];
    let mut rx_buffer = [0u8; 256];
    let mut tx_meta = [PacketMetadata::EMPTY; 4];
    let mut tx_buffer = [0u8; 256];

    let mut request = NTP_SYNC.wait().await;
    loop {
        if let Some(new_request) = NTP_SYNC.try_take() {
            request = new_request;
        }

        match sync_once(stack, &mut rx_meta, &mut rx_buffer, &mut tx_meta, &mut tx_buffer, &request)
            .await
        {
            Ok(epoch_ms) => {
                let offset = epoch_ms.saturating_sub(Instant::now().as_millis());
                EPOCH_OFFSET_MS.store(offset, Ordering::Relaxed);
                log::info!("clock synced, epoch_ms={epoch_ms}");
                let period = request.period.max(60) as u64;
                Timer::after(Duration::from_secs(period)).await;
            }
            Err(()) => {
                log::warn!("ntp sync with {} failed, retrying", request.host.as_str());
                Timer::after(Duration::from_secs(30)).await;
            }
        }
    }
}

async fn sync_once(
    stack: Stack<'static>,
    rx_meta: &mut [PacketMetadata],
    rx_buffer: &mut [u8],
    tx_meta: &mut [PacketMetadata],
    tx_buffer: &mut [u8],
    request: &crate::channels::NtpRequest,
) -> Result<u64, ()> {
    let addrs = stack
        .dns_query(request.host.as_str(), embassy_net::dns::DnsQueryType::A)
        .await
        .map_err(|_| ())?;
    let addr = addrs.first().copied().ok_or(())?;
    let IpAddress::Ipv4(v4) = addr;

    let mut socket = UdpSocket::new(stack, rx_meta, rx_buffer, tx_meta, tx_buffer);
    socket.bind(0).map_err(|_| ())?;

    let server = core::net::SocketAddr::new(core::net::IpAddr::V4(v4), request.port);
    let result = get_time(server, &socket, NtpContext::new(Timestamp::default()))
        .await
        .map_err(|_| ())?;

    let seconds = result.sec() as u64;
    let micros = sntpc::fraction_to_microseconds(result.sec_fraction()) as u64;
    Ok(seconds * 1_000 + micros / 1_000)
}
