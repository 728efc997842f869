//! Publish scheduler task.
//!
//! Turns the configured stream periods into publish request flags. The
//! controller pushes fresh periods through `PUBLISH_PERIODS` whenever a
//! broker session comes up, which also restarts the deadlines so the
//! first publish of a session happens one full period after connect.

use embassy_time::{Duration, Instant, Timer};

use loopbridge_core::events::{PUBLISH_INFO, PUBLISH_MEASURES, PUBLISH_STATUS};

use crate::channels::{PublishPeriods, EVENTS, PUBLISH_PERIODS};

const TICK_MS: u64 = 100;

struct Stream {
    flag: u32,
    period: Option<u64>,
    deadline: Instant,
}

impl Stream {
    fn new(flag: u32) -> Self {
        Self {
            flag,
            period: None,
            deadline: Instant::MAX,
        }
    }

    fn rearm(&mut self, period: Option<u64>, now: Instant) {
        self.period = period;
        self.deadline = match period {
            Some(ms) => now + Duration::from_millis(ms),
            None => Instant::MAX,
        };
    }

    fn poll(&mut self, now: Instant) {
        let Some(ms) = self.period else { return };
        if now >= self.deadline {
            EVENTS.set(self.flag);
            self.deadline += Duration::from_millis(ms);
        }
    }
}

#[embassy_executor::task]
pub async fn publish_scheduler_task() {
    let mut measures = Stream::new(PUBLISH_MEASURES);
    let mut status = Stream::new(PUBLISH_STATUS);
    let mut info = Stream::new(PUBLISH_INFO);

    loop {
        if let Some(periods) = PUBLISH_PERIODS.try_take() {
            let now = Instant::now();
            measures.rearm(periods.measures, now);
            status.rearm(periods.status, now);
            info.rearm(periods.info, now);
            log::debug!("scheduler: periods {periods:?}");
        }

        let now = Instant::now();
        measures.poll(now);
        status.poll(now);
        info.poll(now);

        Timer::after(Duration::from_millis(TICK_MS)).await;
    }
}
