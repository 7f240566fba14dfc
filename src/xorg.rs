use log::trace;
use std::path::Path;

pub const INTEL_DDX: &str = "intel_drv.so";
pub const AMDGPU_DDX: &str = "amdgpu_drv.so";

fn ddx_installed(drivers_dir: &Path, ddx: &str, log_target: &str) -> bool {
    let path = drivers_dir.join(ddx);
    trace!(target: log_target, "ddx_installed: {path:?}");
    path.is_file()
}

/// The legacy `xf86-video-intel` driver, as opposed to modesetting
pub fn is_xorg_intel_module_available(drivers_dir: &Path, log_target: &str) -> bool {
    ddx_installed(drivers_dir, INTEL_DDX, log_target)
}

pub fn is_xorg_amdgpu_module_available(drivers_dir: &Path, log_target: &str) -> bool {
    ddx_installed(drivers_dir, AMDGPU_DDX, log_target)
}
