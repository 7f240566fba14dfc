use log::{debug, info, warn};

use crate::command::{command_succeeds, CommandRunner, ProbeCommand};
use crate::error::ProbeError;
use crate::init_system::InitSystem;
use crate::systemd::{service_unit, UnitStateSource};

/// Answers "is this service running?" on systemd, OpenRC, runit and s6 systems.
///
/// The systemd bus is asked first. Any error on that path, including the unit simply not
/// existing, drops through to the supervisor's own status tool.
pub struct ServiceProber<'a> {
    bus: Option<&'a dyn UnitStateSource>,
    runner: &'a dyn CommandRunner,
    log_target: &'a str,
}

impl<'a> ServiceProber<'a> {
    /// `bus` of `None` skips straight to the command line tools
    pub fn new(
        bus: Option<&'a dyn UnitStateSource>,
        runner: &'a dyn CommandRunner,
        log_target: &'a str,
    ) -> Self {
        Self {
            bus,
            runner,
            log_target,
        }
    }

    pub fn is_service_active(&self, service: &str) -> bool {
        let err = match self.bus.map(|bus| bus.unit_sub_state(&service_unit(service))) {
            Some(Ok(state)) => return state == "running",
            Some(Err(err)) => err,
            None => ProbeError::Check("D-Bus disabled by configuration".into()),
        };
        self.log_bus_error(service, &err);

        match InitSystem::detect(self.runner, self.log_target) {
            InitSystem::OpenRc => self.is_active_openrc(service),
            InitSystem::Runit => self.is_active_runit(service),
            InitSystem::S6 => self.is_active_s6(service),
            InitSystem::Systemd => {
                warn!(
                    target: self.log_target,
                    "Cannot communicate with the DBus system bus to check status of {service}. \
                     Is DBus running? Falling back to systemctl"
                );
                self.is_active_systemctl(service)
            }
        }
    }

    fn log_bus_error(&self, service: &str, err: &ProbeError) {
        match err {
            ProbeError::UnitNotFound(unit) => info!(
                target: self.log_target,
                "is_service_active: {unit} not loaded by systemd, checking other init systems"
            ),
            ProbeError::BusUnavailable(e) => debug!(
                target: self.log_target,
                "is_service_active: system bus unavailable for {service}: {e}"
            ),
            e if e.is_bus_error() => warn!(
                target: self.log_target,
                "is_service_active: bus query for {service} failed: {e}"
            ),
            e => debug!(
                target: self.log_target,
                "is_service_active: skipping the bus for {service}: {e}"
            ),
        }
    }

    fn is_active_systemctl(&self, service: &str) -> bool {
        command_succeeds(
            self.runner,
            &ProbeCommand::new("systemctl").args(["is-active", service]),
            self.log_target,
        )
    }

    fn is_active_openrc(&self, service: &str) -> bool {
        let cmd = ProbeCommand::new("rc-status").args(["--nocolor", "default"]);
        match self.runner.run(&cmd) {
            Ok(out) => openrc_reports_started(&out.stdout, service),
            Err(e) => {
                warn!(target: self.log_target, "is_active_openrc: {e}");
                false
            }
        }
    }

    fn is_active_runit(&self, service: &str) -> bool {
        let cmd = ProbeCommand::new("sv").args(["status", service]);
        match self.runner.run(&cmd) {
            Ok(out) => runit_reports_up(&out.stdout),
            Err(e) => {
                warn!(target: self.log_target, "is_active_runit: {e}");
                false
            }
        }
    }

    // TODO: ask s6-svstat once the s6 service directory layout is settled
    fn is_active_s6(&self, service: &str) -> bool {
        debug!(
            target: self.log_target,
            "is_active_s6: status of {service} is not checked on s6, reporting active"
        );
        true
    }
}

/// A line naming the service and, somewhere after it, `started`
fn openrc_reports_started(status: &str, service: &str) -> bool {
    status.lines().any(|line| {
        line.find(service)
            .is_some_and(|idx| line[idx + service.len()..].contains("started"))
    })
}

fn runit_reports_up(status: &str) -> bool {
    status.contains("up: ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutput, MockCommandRunner};
    use crate::init_system::tests::expect_pidof;
    use crate::systemd::MockUnitStateSource;
    use crate::testlog;

    const RC_STATUS: &str = "Runlevel: default
 dbus                                                  [  started  ]
 sddm                                                  [  started  ]
 optimus-manager                                       [  stopped  ]
 cronie                                                [  started  ]
";

    fn bus_state(state: &'static str) -> MockUnitStateSource {
        let mut bus = MockUnitStateSource::new();
        bus.expect_unit_sub_state()
            .withf(|unit| unit == "optimus-manager.service")
            .returning(move |_| Ok(state.to_owned()));
        bus
    }

    fn bus_error() -> MockUnitStateSource {
        let mut bus = MockUnitStateSource::new();
        bus.expect_unit_sub_state()
            .returning(|unit| Err(ProbeError::UnitNotFound(unit.to_string())));
        bus
    }

    #[test]
    fn running_sub_state_is_active() {
        let bus = bus_state("running");
        let runner = MockCommandRunner::new();
        let prober = ServiceProber::new(Some(&bus), &runner, "test");
        assert!(prober.is_service_active("optimus-manager"));
    }

    #[test]
    fn other_sub_states_are_inactive() {
        for state in ["dead", "exited", "failed", "auto-restart", ""] {
            let bus = bus_state(state);
            // No runner expectations: a fallback here would panic the mock
            let runner = MockCommandRunner::new();
            let prober = ServiceProber::new(Some(&bus), &runner, "test");
            assert!(!prober.is_service_active("optimus-manager"), "{state}");
        }
    }

    #[test]
    fn bus_error_falls_back_to_systemctl() {
        testlog::init();
        let bus = bus_error();
        let mut runner = MockCommandRunner::new();
        expect_pidof(&mut runner, None);
        runner
            .expect_run()
            .withf(|cmd| cmd.is("systemctl", &["is-active", "bumblebeed"]))
            .times(1)
            .returning(|_| Ok(CommandOutput::ok("active\n")));
        let prober = ServiceProber::new(Some(&bus), &runner, "test");
        assert!(prober.is_service_active("bumblebeed"));
    }

    #[test]
    fn systemctl_failure_is_inactive() {
        let bus = bus_error();
        let mut runner = MockCommandRunner::new();
        expect_pidof(&mut runner, None);
        runner
            .expect_run()
            .withf(|cmd| cmd.program() == "systemctl")
            .times(1)
            .returning(|_| Ok(CommandOutput::failed("inactive\n")));
        let prober = ServiceProber::new(Some(&bus), &runner, "test");
        assert!(!prober.is_service_active("bumblebeed"));
    }

    #[test]
    fn openrc_fallback() {
        let bus = bus_error();
        let mut runner = MockCommandRunner::new();
        expect_pidof(&mut runner, Some("init"));
        runner
            .expect_run()
            .withf(|cmd| cmd.is("rc-status", &["--nocolor", "default"]))
            .times(2)
            .returning(|_| Ok(CommandOutput::ok(RC_STATUS)));
        let prober = ServiceProber::new(Some(&bus), &runner, "test");
        assert!(prober.is_service_active("sddm"));
        assert!(!prober.is_service_active("optimus-manager"));
    }

    #[test]
    fn runit_fallback() {
        let bus = bus_error();
        let mut runner = MockCommandRunner::new();
        expect_pidof(&mut runner, Some("runit"));
        runner
            .expect_run()
            .withf(|cmd| cmd.is("sv", &["status", "display-manager"]))
            .times(1)
            .returning(|_| Ok(CommandOutput::ok("run: display-manager: (pid 812) 3600s\n")));
        runner
            .expect_run()
            .withf(|cmd| cmd.is("sv", &["status", "bumblebeed"]))
            .times(1)
            .returning(|_| Ok(CommandOutput::ok("up: bumblebeed: (pid 91) 20s\n")));
        let prober = ServiceProber::new(Some(&bus), &runner, "test");
        assert!(!prober.is_service_active("display-manager"));
        assert!(prober.is_service_active("bumblebeed"));
    }

    #[test]
    fn s6_always_reports_active() {
        let bus = bus_error();
        let mut runner = MockCommandRunner::new();
        expect_pidof(&mut runner, Some("s6-svscan"));
        let prober = ServiceProber::new(Some(&bus), &runner, "test");
        assert!(prober.is_service_active("does-not-exist"));
    }

    #[test]
    fn disabled_bus_goes_straight_to_fallback() {
        let mut runner = MockCommandRunner::new();
        expect_pidof(&mut runner, None);
        runner
            .expect_run()
            .withf(|cmd| cmd.program() == "systemctl")
            .times(1)
            .returning(|_| Ok(CommandOutput::ok("active\n")));
        let prober = ServiceProber::new(None, &runner, "test");
        assert!(prober.is_service_active("optimus-manager"));
    }

    #[test]
    fn backend_spawn_failure_is_inactive() {
        let bus = bus_error();
        let mut runner = MockCommandRunner::new();
        expect_pidof(&mut runner, Some("runit"));
        runner
            .expect_run()
            .withf(|cmd| cmd.program() == "sv")
            .returning(|cmd| {
                Err(ProbeError::Command(
                    cmd.to_string(),
                    std::io::Error::from(std::io::ErrorKind::NotFound),
                ))
            });
        let prober = ServiceProber::new(Some(&bus), &runner, "test");
        assert!(!prober.is_service_active("bumblebeed"));
    }

    #[test]
    fn bus_failures_logged_apart_from_disabled_bus() {
        testlog::init();
        let mut bus = MockUnitStateSource::new();
        bus.expect_unit_sub_state()
            .returning(|_| Err(ProbeError::Zbus(zbus::Error::Failure("timed out".into()))));
        let mut runner = MockCommandRunner::new();
        expect_pidof(&mut runner, None);
        runner
            .expect_run()
            .withf(|cmd| cmd.program() == "systemctl")
            .returning(|_| Ok(CommandOutput::failed("")));

        ServiceProber::new(Some(&bus), &runner, "service-bus-failed").is_service_active("sddm");
        ServiceProber::new(None, &runner, "service-bus-off").is_service_active("sddm");

        let failed = testlog::messages("service-bus-failed");
        assert!(failed.iter().any(|m| m.contains("bus query for sddm failed")), "{failed:#?}");
        let off = testlog::messages("service-bus-off");
        assert!(off.iter().any(|m| m.contains("skipping the bus for sddm")), "{off:#?}");
        assert!(!off.iter().any(|m| m.contains("bus query")));
    }

    #[test]
    fn openrc_parsing() {
        assert!(openrc_reports_started(RC_STATUS, "cronie"));
        assert!(!openrc_reports_started(RC_STATUS, "lightdm"));
        assert!(!openrc_reports_started("started foo\n", "foo"));
    }
}
