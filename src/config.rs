use log::{debug, warn};
use serde_derive::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ProbeError;
use crate::LOG_TARGET;

/// Where the probes look and how long they wait. The defaults are the real system paths;
/// everything is overridable so a daemon can run against a different root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Directory holding one entry per power supply, each with `type` and `online`
    pub power_supply_dir: PathBuf,
    pub cpuinfo_path: PathBuf,
    /// Xorg DDX driver modules, e.g. `intel_drv.so`
    pub xorg_drivers_dir: PathBuf,
    /// Presence of any of these marks a GDM build patched for PRIME
    pub gdm_prime_dirs: Vec<PathBuf>,
    /// Symlink systemd keeps pointing at the enabled display manager unit
    pub systemd_dm_service: PathBuf,
    /// Root of the runtime markers OpenRC, runit and s6 leave for running services
    pub run_dir: PathBuf,
    /// Root of the service definitions of OpenRC, runit and s6
    pub etc_dir: PathBuf,
    /// Upper bound on every spawned command and every D-Bus method call
    pub command_timeout_ms: u64,
    /// Ask systemd over D-Bus before falling back to command line tools
    pub use_dbus: bool,
    /// Log target every probe run through a `Checker` reports under
    pub log_target: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            power_supply_dir: PathBuf::from("/sys/class/power_supply"),
            cpuinfo_path: PathBuf::from("/proc/cpuinfo"),
            xorg_drivers_dir: PathBuf::from("/usr/lib/xorg/modules/drivers"),
            gdm_prime_dirs: vec![
                PathBuf::from("/etc/gdm/Prime"),
                PathBuf::from("/etc/gdm3/Prime"),
            ],
            systemd_dm_service: PathBuf::from("/etc/systemd/system/display-manager.service"),
            run_dir: PathBuf::from("/run"),
            etc_dir: PathBuf::from("/etc"),
            command_timeout_ms: 5000,
            use_dbus: true,
            log_target: LOG_TARGET.to_owned(),
        }
    }
}

impl ProbeConfig {
    /// Read the config at `path`. A missing or empty file gives the defaults, as does one
    /// that can't be parsed (with a warning).
    pub fn load(path: &Path) -> Result<Self, ProbeError> {
        let mut file = match OpenOptions::new().read(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    target: LOG_TARGET,
                    "ProbeConfig::load: {} missing, using defaults",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(e) => return Err(ProbeError::from_io(e, path.into())),
        };

        let mut buf = String::new();
        file.read_to_string(&mut buf)
            .map_err(|e| ProbeError::from_io(e, path.into()))?;
        if buf.trim().is_empty() {
            return Ok(Self::default());
        }

        match serde_json::from_str(&buf) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(
                    target: LOG_TARGET,
                    "Could not deserialise {}: {e}, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
        }
    }

    /// Strict variant of [`ProbeConfig::load`] for callers that want parse errors
    pub fn from_json(json: &str) -> Result<Self, ProbeError> {
        serde_json::from_str(json).map_err(|e| ProbeError::Config("<inline>".into(), e))
    }

    pub fn write(&self, path: &Path) -> Result<(), ProbeError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ProbeError::Config(path.display().to_string(), e))?;
        let mut file = File::create(path).map_err(|e| ProbeError::from_io(e, path.into()))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| ProbeError::from_io(e, path.into()))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Config with every filesystem path moved under `root`. Handy for chroots and tests.
    pub fn rooted_at(root: &Path) -> Self {
        let reroot = |p: &Path| root.join(p.strip_prefix("/").unwrap_or(p));
        let base = Self::default();
        Self {
            power_supply_dir: reroot(&base.power_supply_dir),
            cpuinfo_path: reroot(&base.cpuinfo_path),
            xorg_drivers_dir: reroot(&base.xorg_drivers_dir),
            gdm_prime_dirs: base.gdm_prime_dirs.iter().map(|p| reroot(p)).collect(),
            systemd_dm_service: reroot(&base.systemd_dm_service),
            run_dir: reroot(&base.run_dir),
            etc_dir: reroot(&base.etc_dir),
            ..base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProbeConfig::load(&dir.path().join("gfxprobe.conf")).unwrap();
        assert_eq!(config, ProbeConfig::default());
    }

    #[test]
    fn write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gfxprobe.conf");
        let mut config = ProbeConfig::default();
        config.use_dbus = false;
        config.command_timeout_ms = 250;
        config.write(&path).unwrap();
        let loaded = ProbeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.command_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            ProbeConfig::from_json(r#"{ "use_dbus": false, "log_target": "optimus" }"#).unwrap();
        assert!(!config.use_dbus);
        assert_eq!(config.log_target, "optimus");
        assert_eq!(config.cpuinfo_path, PathBuf::from("/proc/cpuinfo"));
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gfxprobe.conf");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(ProbeConfig::load(&path).unwrap(), ProbeConfig::default());
        assert!(ProbeConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn rooted_paths() {
        let config = ProbeConfig::rooted_at(Path::new("/tmp/root"));
        assert_eq!(
            config.systemd_dm_service,
            PathBuf::from("/tmp/root/etc/systemd/system/display-manager.service")
        );
        assert_eq!(config.gdm_prime_dirs[1], PathBuf::from("/tmp/root/etc/gdm3/Prime"));
        assert_eq!(config.run_dir, PathBuf::from("/tmp/root/run"));
    }
}
