use log::debug;
use std::fs;
use std::path::Path;

/// Whether the CPU advertises the Page Attribute Table. Without it the nvidia driver falls
/// back to MTRR and `NVreg_UsePageAttributeTable` must stay off.
pub fn is_pat_available(cpuinfo_path: &Path, log_target: &str) -> bool {
    match fs::read_to_string(cpuinfo_path) {
        Ok(cpuinfo) => has_flag(&cpuinfo, "pat"),
        Err(e) => {
            debug!(target: log_target, "is_pat_available: {}: {e}", cpuinfo_path.display());
            false
        }
    }
}

fn has_flag(cpuinfo: &str, flag: &str) -> bool {
    cpuinfo
        .lines()
        .filter(|line| line.starts_with("flags"))
        .filter_map(|line| line.split_once(':'))
        .any(|(_, flags)| flags.split_whitespace().any(|f| f == flag))
}
