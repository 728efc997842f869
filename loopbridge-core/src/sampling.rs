//! Sample flow between the sampler task and the controller.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Sender};
use loopbridge_protocol::SampleFrame;

use crate::traits::RawAdc;

/// Ranging frames buffered between sampler and controller.
pub const SAMPLE_QUEUE_DEPTH: usize = 5;
/// Frames arriving faster than this are coalesced by the sampler.
pub const MIN_SAMPLE_INTERVAL_MS: u64 = 100;
/// How long the sampler waits on a full queue before dropping a frame.
pub const QUEUE_PUSH_TIMEOUT_MS: u64 = 250;
/// Raw conversions averaged per loop-current reading.
pub const ADC_OVERSAMPLE: u32 = 32;

pub type SampleChannel = Channel<CriticalSectionRawMutex, SampleFrame, SAMPLE_QUEUE_DEPTH>;

/// Producer side of the sample queue with drop accounting.
///
/// The queue bounds memory, not latency: when the controller falls behind
/// the newest frame is dropped and the drop is counted.
pub struct SampleSender<'a> {
    tx: Sender<'a, CriticalSectionRawMutex, SampleFrame, SAMPLE_QUEUE_DEPTH>,
    dropped: u32,
}

impl<'a> SampleSender<'a> {
    pub fn new(tx: Sender<'a, CriticalSectionRawMutex, SampleFrame, SAMPLE_QUEUE_DEPTH>) -> Self {
        Self { tx, dropped: 0 }
    }

    /// Try to queue a frame without waiting. Returns `false` when the
    /// queue is full; the caller decides whether to wait or drop.
    pub fn offer(&mut self, frame: SampleFrame) -> bool {
        self.tx.try_send(frame).is_ok()
    }

    /// Count a dropped frame.
    pub fn note_drop(&mut self) -> u32 {
        self.dropped = self.dropped.saturating_add(1);
        log::warn!("sample queue full, {} frames dropped so far", self.dropped);
        self.dropped
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// Average [`ADC_OVERSAMPLE`] raw conversions into one reading.
///
/// Aborts on the first conversion error so a flaky bus surfaces as a
/// failed reading instead of a silently skewed average.
pub async fn oversampled_read<A: RawAdc>(adc: &mut A) -> Result<u16, A::Error> {
    let mut acc: u32 = 0;
    for _ in 0..ADC_OVERSAMPLE {
        acc += adc.read_raw().await? as u32;
    }
    Ok((acc / ADC_OVERSAMPLE) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn excess_pushes_are_counted_as_drops() {
        let channel = SampleChannel::new();
        let mut sender = SampleSender::new(channel.sender());

        for _ in 0..8 {
            if !sender.offer(SampleFrame::default()) {
                sender.note_drop();
            }
        }

        assert_eq!(sender.dropped(), 3);
        assert_eq!(channel.len(), SAMPLE_QUEUE_DEPTH);
    }

    #[test]
    fn draining_makes_room_again() {
        let channel = SampleChannel::new();
        let mut sender = SampleSender::new(channel.sender());

        for _ in 0..SAMPLE_QUEUE_DEPTH {
            assert!(sender.offer(SampleFrame::default()));
        }
        assert!(!sender.offer(SampleFrame::default()));

        assert!(channel.try_receive().is_ok());
        assert!(sender.offer(SampleFrame::default()));
        assert_eq!(sender.dropped(), 0);
    }

    struct ScriptedAdc {
        readings: &'static [u16],
        cursor: usize,
        fail_at: Option<usize>,
    }

    impl RawAdc for ScriptedAdc {
        type Error = ();

        async fn read_raw(&mut self) -> Result<u16, ()> {
            if self.fail_at == Some(self.cursor) {
                return Err(());
            }
            let value = self.readings[self.cursor % self.readings.len()];
            self.cursor += 1;
            Ok(value)
        }
    }

    #[test]
    fn oversampling_averages_the_burst() {
        let mut adc = ScriptedAdc {
            readings: &[1000, 1002],
            cursor: 0,
            fail_at: None,
        };
        let value = block_on(oversampled_read(&mut adc)).unwrap();
        assert_eq!(value, 1001);
        assert_eq!(adc.cursor, ADC_OVERSAMPLE as usize);
    }

    #[test]
    fn burst_aborts_on_first_error() {
        let mut adc = ScriptedAdc {
            readings: &[2048],
            cursor: 0,
            fail_at: Some(3),
        };
        assert!(block_on(oversampled_read(&mut adc)).is_err());
        assert_eq!(adc.cursor, 3);
    }

    #[test]
    fn full_scale_burst_does_not_overflow() {
        let mut adc = ScriptedAdc {
            readings: &[u16::MAX],
            cursor: 0,
            fail_at: None,
        };
        let value = block_on(oversampled_read(&mut adc)).unwrap();
        assert_eq!(value, u16::MAX);
    }
}
