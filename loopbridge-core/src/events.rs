//! Controller event flags.
//!
//! A lock-free bitset shared between the controller task, the publish
//! scheduler and interrupt-adjacent code. Flags request work; the
//! controller consumes them with [`EventFlags::take`].

use portable_atomic::{AtomicU32, Ordering};

/// Bring up the access point and captive portal.
pub const START_AP: u32 = 1 << 0;
/// (Re)join the configured station network.
pub const CONNECT_WIFI: u32 = 1 << 1;
/// (Re)connect to the telemetry broker.
pub const CONNECT_SERVICE: u32 = 1 << 2;
/// Publish the measurement stream.
pub const PUBLISH_MEASURES: u32 = 1 << 3;
/// Publish the status stream.
pub const PUBLISH_STATUS: u32 = 1 << 4;
/// Publish the info stream.
pub const PUBLISH_INFO: u32 = 1 << 5;

pub struct EventFlags(AtomicU32);

impl EventFlags {
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    pub fn set(&self, mask: u32) {
        self.0.fetch_or(mask, Ordering::SeqCst);
    }

    pub fn clear(&self, mask: u32) {
        self.0.fetch_and(!mask, Ordering::SeqCst);
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn contains(&self, mask: u32) -> bool {
        self.get() & mask != 0
    }

    /// Atomically clear `mask` and report whether any of its bits were set.
    pub fn take(&self, mask: u32) -> bool {
        self.0.fetch_and(!mask, Ordering::SeqCst) & mask != 0
    }
}

impl Default for EventFlags {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_clear_are_masked() {
        let flags = EventFlags::new();
        flags.set(START_AP | CONNECT_WIFI);
        assert!(flags.contains(START_AP));
        assert!(flags.contains(CONNECT_WIFI));
        assert!(!flags.contains(CONNECT_SERVICE));

        flags.clear(START_AP);
        assert!(!flags.contains(START_AP));
        assert!(flags.contains(CONNECT_WIFI));
    }

    #[test]
    fn take_consumes_only_the_mask() {
        let flags = EventFlags::new();
        flags.set(PUBLISH_MEASURES | PUBLISH_STATUS);

        assert!(flags.take(PUBLISH_MEASURES));
        assert!(!flags.contains(PUBLISH_MEASURES));
        assert!(flags.contains(PUBLISH_STATUS));

        // Second take of the same bit reports nothing pending.
        assert!(!flags.take(PUBLISH_MEASURES));
    }
}
