use crate::config::{CalEquation, CalRecord, ServiceConfig, WifiConfig};

/// Delay before retrying when required settings are missing.
pub const CONFIG_RETRY_MS: u64 = 10_000;
/// Delay before retrying a failed broker connection.
pub const BROKER_RETRY_MS: u64 = 5_000;
/// Link-up polling after a station join attempt: 30 polls of 250ms.
pub const LINK_POLL_ATTEMPTS: u32 = 30;
pub const LINK_POLL_INTERVAL_MS: u64 = 250;
/// Controller main loop cadence.
pub const LOOP_PERIOD_MS: u64 = 50;
/// Consecutive connection failures tolerated before a restart.
pub const MAX_CONSECUTIVE_FAILURES: u8 = 10;

/// Outcome of a connection planning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectPlan {
    /// Required settings are present, attempt the connection now.
    Proceed,
    /// Settings incomplete. Wait and re-raise the request.
    Defer { retry_ms: u64 },
}

/// Watchdog decision after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Verdict {
    Continue,
    Restart,
}

/// Host-testable state of the connectivity controller.
///
/// Holds the failure counter, the config-mode latch, the active
/// calibration equation, and a snapshot of the service settings taken at
/// broker-connect time so a portal edit mid-session cannot tear them.
pub struct Controller {
    config_mode_active: bool,
    failures: u8,
    service: ServiceConfig,
    equation: CalEquation,
}

impl Controller {
    pub fn new() -> Self {
        Self {
            config_mode_active: false,
            failures: 0,
            service: ServiceConfig::default(),
            equation: CalEquation::default(),
        }
    }

    /// Decide whether a station join can be attempted.
    pub fn plan_wifi_connect(&self, wifi: &WifiConfig) -> ConnectPlan {
        if wifi.ssid.is_empty() {
            ConnectPlan::Defer {
                retry_ms: CONFIG_RETRY_MS,
            }
        } else {
            ConnectPlan::Proceed
        }
    }

    /// Decide whether a broker connection can be attempted. On `Proceed`
    /// the settings are snapshotted for the duration of the session.
    pub fn plan_service_connect(&mut self, service: &ServiceConfig) -> ConnectPlan {
        if service.host.is_empty() || service.client_id.is_empty() {
            return ConnectPlan::Defer {
                retry_ms: CONFIG_RETRY_MS,
            };
        }
        self.service = service.clone();
        ConnectPlan::Proceed
    }

    /// The service settings snapshotted by the last successful plan.
    pub fn service(&self) -> &ServiceConfig {
        &self.service
    }

    pub fn refresh_calibration(&mut self, cal: &CalRecord) {
        self.equation = CalEquation::from_record(cal);
    }

    pub fn equation(&self) -> &CalEquation {
        &self.equation
    }

    /// Count a connection failure. Past [`MAX_CONSECUTIVE_FAILURES`] the
    /// verdict is a restart, unless config mode is active: an operator on
    /// the portal must not have the device rebooted out from under them.
    pub fn record_failure(&mut self) -> Verdict {
        self.failures = self.failures.saturating_add(1);
        if !self.config_mode_active && self.failures > MAX_CONSECUTIVE_FAILURES {
            Verdict::Restart
        } else {
            Verdict::Continue
        }
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u8 {
        self.failures
    }

    /// Latch config mode. Returns `false` when already active.
    pub fn enter_config_mode(&mut self) -> bool {
        if self.config_mode_active {
            return false;
        }
        self.config_mode_active = true;
        true
    }

    /// Release config mode. Returns `false` when already inactive.
    pub fn exit_config_mode(&mut self) -> bool {
        if !self.config_mode_active {
            return false;
        }
        self.config_mode_active = false;
        true
    }

    pub fn config_mode_active(&self) -> bool {
        self.config_mode_active
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigRecord;

    const MAC: [u8; 6] = [0x24, 0x6f, 0x28, 0xab, 0xcd, 0xef];

    fn defaults() -> ConfigRecord {
        ConfigRecord::defaults(MAC, &Default::default())
    }

    #[test]
    fn wifi_join_deferred_without_ssid() {
        let ctrl = Controller::new();
        let cfg = defaults();
        assert_eq!(
            ctrl.plan_wifi_connect(&cfg.wifi),
            ConnectPlan::Defer {
                retry_ms: CONFIG_RETRY_MS
            }
        );

        let mut wifi = cfg.wifi;
        let _ = wifi.ssid.push_str("plant-floor");
        assert_eq!(ctrl.plan_wifi_connect(&wifi), ConnectPlan::Proceed);
    }

    #[test]
    fn service_connect_deferred_without_host_or_client_id() {
        let mut ctrl = Controller::new();
        let cfg = defaults();

        let mut service = cfg.service.clone();
        service.host.clear();
        assert!(matches!(
            ctrl.plan_service_connect(&service),
            ConnectPlan::Defer { .. }
        ));

        let mut service = cfg.service.clone();
        service.client_id.clear();
        assert!(matches!(
            ctrl.plan_service_connect(&service),
            ConnectPlan::Defer { .. }
        ));

        assert_eq!(ctrl.plan_service_connect(&cfg.service), ConnectPlan::Proceed);
    }

    #[test]
    fn snapshot_is_isolated_from_later_edits() {
        let mut ctrl = Controller::new();
        let mut cfg = defaults();
        assert_eq!(ctrl.plan_service_connect(&cfg.service), ConnectPlan::Proceed);

        cfg.service.host.clear();
        let _ = cfg.service.host.push_str("edited.example.com");
        assert_eq!(ctrl.service().host.as_str(), "industrial.api.ubidots.com");
    }

    #[test]
    fn restart_after_eleventh_consecutive_failure() {
        let mut ctrl = Controller::new();
        for _ in 0..MAX_CONSECUTIVE_FAILURES {
            assert_eq!(ctrl.record_failure(), Verdict::Continue);
        }
        assert_eq!(ctrl.record_failure(), Verdict::Restart);
    }

    #[test]
    fn success_resets_the_failure_count() {
        let mut ctrl = Controller::new();
        for _ in 0..MAX_CONSECUTIVE_FAILURES {
            let _ = ctrl.record_failure();
        }
        ctrl.record_success();
        assert_eq!(ctrl.failures(), 0);
        assert_eq!(ctrl.record_failure(), Verdict::Continue);
    }

    #[test]
    fn config_mode_suppresses_the_restart() {
        let mut ctrl = Controller::new();
        assert!(ctrl.enter_config_mode());
        for _ in 0..30 {
            assert_eq!(ctrl.record_failure(), Verdict::Continue);
        }
        assert!(ctrl.exit_config_mode());
        assert_eq!(ctrl.record_failure(), Verdict::Restart);
    }

    #[test]
    fn config_mode_latch_is_idempotent() {
        let mut ctrl = Controller::new();
        assert!(ctrl.enter_config_mode());
        assert!(!ctrl.enter_config_mode());
        assert!(ctrl.exit_config_mode());
        assert!(!ctrl.exit_config_mode());
    }

    #[test]
    fn calibration_refresh_swaps_the_equation() {
        let mut ctrl = Controller::new();
        assert_eq!(ctrl.equation().apply(100.0), 100.0);

        let mut cal = crate::config::CalRecord::default();
        cal.points[0] = crate::config::CalPoint { x: 0, y: 0.0 };
        cal.points[1] = crate::config::CalPoint { x: 100, y: 200.0 };
        ctrl.refresh_calibration(&cal);
        assert_eq!(ctrl.equation().apply(100.0), 200.0);
    }
}
