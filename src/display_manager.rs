use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::command::CommandRunner;
use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::init_system::InitSystem;

/// Checked in this order on init systems without a `display-manager` alias
pub const KNOWN_DISPLAY_MANAGERS: [&str; 5] = ["gdm", "lightdm", "lxdm", "sddm", "xdm"];

/// Name of the display manager service driving the graphical login, e.g. `sddm`. Logs under
/// `config.log_target`.
pub fn current_display_manager(
    config: &ProbeConfig,
    runner: &dyn CommandRunner,
) -> Result<String, ProbeError> {
    let log_target = config.log_target.as_str();
    let init = InitSystem::detect(runner, log_target);
    let dm = match init {
        InitSystem::Systemd => systemd_display_manager(&config.systemd_dm_service, log_target)?,
        init => supervised_display_manager(init, config, log_target)?,
    };
    info!(target: log_target, "current_display_manager: {dm} ({init})");
    Ok(dm)
}

fn systemd_display_manager(dm_service: &Path, log_target: &str) -> Result<String, ProbeError> {
    if !dm_service.is_file() {
        return Err(ProbeError::Check(
            "No display-manager.service file found".into(),
        ));
    }
    let target = dm_service
        .canonicalize()
        .map_err(|e| ProbeError::from_io(e, dm_service.into()))?;
    debug!(target: log_target, "systemd_display_manager: {dm_service:?} -> {target:?}");
    service_stem(&target)
}

fn supervised_display_manager(
    init: InitSystem,
    config: &ProbeConfig,
    log_target: &str,
) -> Result<String, ProbeError> {
    for dm in KNOWN_DISPLAY_MANAGERS {
        let Some(marker) = init.service_marker(&config.run_dir, dm) else {
            continue;
        };
        if !marker.is_file() {
            continue;
        }
        let definition = init.service_definition(&config.etc_dir, dm);
        // Some distros link e.g. `xdm` to the real manager
        let resolved = definition.canonicalize().unwrap_or(definition);
        debug!(
            target: log_target,
            "supervised_display_manager: {marker:?} found, service {resolved:?}"
        );
        return service_stem(&resolved);
    }
    Err(ProbeError::Check(
        "No display-manager service file found".into(),
    ))
}

fn service_stem(path: &Path) -> Result<String, ProbeError> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| ProbeError::Check(format!("{} names no service", path.display())))
}

/// GDM builds carrying the PRIME patches ship a `Prime` hook directory
pub fn using_patched_gdm(prime_dirs: &[PathBuf]) -> bool {
    prime_dirs.iter().any(|dir| dir.is_dir())
}
