//! Host state probes for hybrid-GPU switching daemons: power source, CPU flags, kernel
//! modules, GL renderer, render providers, Xorg drivers, display manager, init system and
//! service status.
//!
//! ```no_run
//! use gfxprobe::{Checker, ProbeConfig};
//!
//! let checker = Checker::new(ProbeConfig::default());
//! if checker.is_ac_power_connected() && checker.is_module_loaded("nvidia") {
//!     println!("{}", checker.current_display_manager().unwrap_or_default());
//! }
//! ```

pub mod checker;
pub mod command;
pub mod config;
pub mod cpu;
pub mod display_manager;
pub mod error;
pub mod init_system;
pub mod kernel;
pub mod power;
pub mod render;
pub mod service;
pub mod snapshot;
pub mod systemd;
#[cfg(test)]
mod testlog;
pub mod xorg;
/// D-Bus interface for the probes
pub mod zbus_iface;

pub use checker::Checker;
pub use config::ProbeConfig;
pub use error::ProbeError;
pub use init_system::InitSystem;
pub use render::Renderer;
pub use snapshot::SystemSnapshot;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DBUS_DEST_NAME: &str = "org.gfxprobe.Checks";
pub const DBUS_IFACE_PATH: &str = "/org/gfxprobe/Checks";

/// Default for `ProbeConfig::log_target`
pub const LOG_TARGET: &str = "gfxprobe";

pub const DISPLAY_MANAGER_SERVICE: &str = "display-manager";
pub const DAEMON_SERVICE: &str = "optimus-manager";
pub const BUMBLEBEED_SERVICE: &str = "bumblebeed";

pub const NVIDIA_MODULE: &str = "nvidia";
