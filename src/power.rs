use log::{debug, trace};
use serde_derive::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ProbeError;

/// One entry of the power supply class
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PowerSource {
    #[serde(rename = "type")]
    pub type_: String,
    pub online: bool,
}

impl PowerSource {
    /// Read `type` and `online` under `path`. Batteries have no `online` and fail here.
    pub fn read(path: &Path) -> Result<Self, ProbeError> {
        let type_path = path.join("type");
        let type_ = fs::read_to_string(&type_path)
            .map_err(|e| ProbeError::from_io(e, type_path))?
            .trim()
            .to_owned();
        let online_path = path.join("online");
        let online = fs::read(&online_path).map_err(|e| ProbeError::from_io(e, online_path))?;
        Ok(Self {
            type_,
            online: online.first() == Some(&b'1'),
        })
    }

    pub fn is_mains(&self) -> bool {
        self.type_ == "Mains"
    }
}

/// True when any mains adapter reports online. Entries that can't be read are skipped.
pub fn is_ac_power_connected(power_supply_dir: &Path, log_target: &str) -> bool {
    let entries = match fs::read_dir(power_supply_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(
                target: log_target,
                "is_ac_power_connected: {}: {e}",
                power_supply_dir.display()
            );
            return false;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        match PowerSource::read(&path) {
            Ok(source) if source.is_mains() && source.online => {
                trace!(target: log_target, "is_ac_power_connected: {} online", path.display());
                return true;
            }
            Ok(_) => {}
            Err(e) => debug!(target: log_target, "is_ac_power_connected: skipping {e}"),
        }
    }
    false
}
