//! Connectivity controller decision logic.
//!
//! The firmware's controller task owns the radio and sockets; the
//! [`Controller`] here owns only the decisions, so retry, deferral and
//! watchdog behavior are testable on the host.

mod engine;

pub use engine::{
    ConnectPlan, Controller, Verdict, BROKER_RETRY_MS, CONFIG_RETRY_MS, LINK_POLL_ATTEMPTS,
    LINK_POLL_INTERVAL_MS, LOOP_PERIOD_MS, MAX_CONSECUTIVE_FAILURES,
};
