use serde_derive::{Deserialize, Serialize};

use crate::init_system::InitSystem;
use crate::render::Renderer;

/// Everything the probes know about the host at one point in time. Probes that can fail
/// are `None` when they did.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SystemSnapshot {
    pub ac_power: bool,
    pub pat_available: bool,
    pub graphical_session: bool,
    pub renderer: Option<Renderer>,
    pub offloading_available: Option<bool>,
    pub xorg_intel_module: bool,
    pub xorg_amdgpu_module: bool,
    pub patched_gdm: bool,
    pub display_manager: Option<String>,
    pub init_system: InitSystem,
    pub nvidia_module_available: bool,
    pub nvidia_module_loaded: bool,
    pub login_manager_active: bool,
    pub daemon_active: bool,
    pub bumblebeed_active: bool,
}

impl SystemSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
