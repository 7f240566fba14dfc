use log::debug;
use serde_derive::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use zbus::zvariant::Type;

use crate::command::{command_succeeds, CommandRunner, ProbeCommand};
use crate::error::ProbeError;

/// The service supervisor running the system. Detected fresh for every probe, never cached.
#[derive(Debug, Default, Type, PartialEq, Eq, Copy, Clone, Deserialize, Serialize)]
pub enum InitSystem {
    #[default]
    Systemd,
    OpenRc,
    Runit,
    S6,
}

impl InitSystem {
    /// Probe order matters, the first supervisor process found wins. No match means systemd.
    pub fn detect(runner: &dyn CommandRunner, log_target: &str) -> Self {
        for (process, init) in [
            ("init", InitSystem::OpenRc),
            ("runit", InitSystem::Runit),
            ("s6-svscan", InitSystem::S6),
        ] {
            let pidof = ProbeCommand::new("pidof").arg(process);
            if command_succeeds(runner, &pidof, log_target) {
                debug!(target: log_target, "InitSystem::detect: found {process}, assuming {init}");
                return init;
            }
        }
        debug!(
            target: log_target,
            "InitSystem::detect: no init, runit or s6-svscan process, assuming systemd"
        );
        InitSystem::Systemd
    }

    /// Marker file present when `service` is up under this supervisor. `None` for systemd,
    /// which is asked over the bus instead.
    pub fn service_marker(&self, run_dir: &Path, service: &str) -> Option<PathBuf> {
        match self {
            InitSystem::Systemd => None,
            InitSystem::OpenRc => Some(run_dir.join("openrc/daemons").join(service).join("001")),
            InitSystem::Runit => Some(run_dir.join("runit/service").join(service).join("run")),
            InitSystem::S6 => Some(run_dir.join("s6/service").join(service).join("run")),
        }
    }

    /// Where the supervisor keeps the definition of `service`
    pub fn service_definition(&self, etc_dir: &Path, service: &str) -> PathBuf {
        match self {
            InitSystem::Systemd => etc_dir
                .join("systemd/system")
                .join(format!("{service}.service")),
            InitSystem::OpenRc => etc_dir.join("init.d").join(service),
            InitSystem::Runit => etc_dir.join("runit/sv").join(service),
            InitSystem::S6 => etc_dir.join("s6/sv").join(service),
        }
    }
}

impl Display for InitSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(<&str>::from(self))
    }
}

impl From<&InitSystem> for &str {
    fn from(init: &InitSystem) -> &'static str {
        match init {
            InitSystem::Systemd => "systemd",
            InitSystem::OpenRc => "openrc",
            InitSystem::Runit => "runit",
            InitSystem::S6 => "s6",
        }
    }
}

impl FromStr for InitSystem {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, ProbeError> {
        match s.to_lowercase().trim() {
            "systemd" => Ok(InitSystem::Systemd),
            "openrc" => Ok(InitSystem::OpenRc),
            "runit" => Ok(InitSystem::Runit),
            "s6" => Ok(InitSystem::S6),
            other => Err(ProbeError::Check(format!("Unknown init system {other}"))),
        }
    }
}
