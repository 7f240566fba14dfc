use log::{debug, warn};

use crate::command::{command_succeeds, CommandRunner, ProbeCommand};

/// `modinfo -n` only succeeds when the module file can be found for the running kernel
pub fn is_module_available(runner: &dyn CommandRunner, module: &str, log_target: &str) -> bool {
    let modinfo = ProbeCommand::new("modinfo").args(["-n", module]);
    let available = command_succeeds(runner, &modinfo, log_target);
    debug!(target: log_target, "is_module_available: {module} = {available}");
    available
}

pub fn is_module_loaded(runner: &dyn CommandRunner, module: &str, log_target: &str) -> bool {
    match runner.run(&ProbeCommand::new("lsmod")) {
        Ok(out) if out.success => lsmod_lists(&out.stdout, module),
        Ok(out) => {
            warn!(
                target: log_target,
                "is_module_loaded: lsmod failed: {}",
                out.stderr.trim()
            );
            false
        }
        Err(e) => {
            warn!(target: log_target, "is_module_loaded: {e}");
            false
        }
    }
}

/// Match on the name column only, so `nvidia` isn't "loaded" just because `nvidia_drm` is
fn lsmod_lists(lsmod: &str, module: &str) -> bool {
    lsmod
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .any(|name| name == module)
}
