use log::{debug, trace};
use std::time::Duration;
use zbus::proxy::CacheProperties;
use zbus::zvariant::OwnedObjectPath;
use zbus::{blocking, proxy};

use crate::error::ProbeError;

const NO_SUCH_UNIT: &str = "org.freedesktop.systemd1.NoSuchUnit";

#[proxy(
    interface = "org.freedesktop.systemd1.Manager",
    default_service = "org.freedesktop.systemd1",
    default_path = "/org/freedesktop/systemd1"
)]
trait SystemdManager {
    fn get_unit(&self, name: &str) -> zbus::Result<OwnedObjectPath>;
}

#[proxy(
    interface = "org.freedesktop.systemd1.Unit",
    default_service = "org.freedesktop.systemd1"
)]
trait SystemdUnit {
    #[zbus(property)]
    fn sub_state(&self) -> zbus::Result<String>;
}

/// Source of a unit's `SubState`, e.g. "running" or "dead"
#[cfg_attr(test, mockall::automock)]
pub trait UnitStateSource {
    fn unit_sub_state(&self, unit: &str) -> Result<String, ProbeError>;
}

/// Asks systemd over the system bus. A fresh connection is made per query so a bus that
/// comes up (or goes away) after the daemon started is noticed.
#[derive(Debug, Clone)]
pub struct SystemdBus {
    timeout: Duration,
    log_target: String,
}

impl SystemdBus {
    pub fn new(timeout: Duration, log_target: &str) -> Self {
        Self {
            timeout,
            log_target: log_target.to_owned(),
        }
    }

    fn connect(&self) -> Result<blocking::Connection, ProbeError> {
        let builder = zbus::connection::Builder::system().map_err(ProbeError::BusUnavailable)?;
        let connection = zbus::block_on(builder.method_timeout(self.timeout).build())
            .map_err(ProbeError::BusUnavailable)?;
        Ok(blocking::Connection::from(connection))
    }
}

impl UnitStateSource for SystemdBus {
    fn unit_sub_state(&self, unit: &str) -> Result<String, ProbeError> {
        let connection = self.connect()?;
        let manager = SystemdManagerProxyBlocking::new(&connection)?;
        let path = manager.get_unit(unit).map_err(|e| classify(unit, e))?;
        trace!(
            target: self.log_target.as_str(),
            "unit_sub_state: {unit} is at {}",
            path.as_str()
        );

        let unit_proxy = SystemdUnitProxyBlocking::builder(&connection)
            .path(path.as_str())?
            .cache_properties(CacheProperties::No)
            .build()?;
        let state = unit_proxy.sub_state()?;
        debug!(target: self.log_target.as_str(), "unit_sub_state: {unit} SubState = {state}");
        Ok(state)
    }
}

fn classify(unit: &str, err: zbus::Error) -> ProbeError {
    match &err {
        zbus::Error::MethodError(name, ..) if name.as_str() == NO_SUCH_UNIT => {
            ProbeError::UnitNotFound(unit.to_owned())
        }
        zbus::Error::InputOutput(_) => ProbeError::BusUnavailable(err),
        _ => ProbeError::Zbus(err),
    }
}

/// Unit name systemd uses for a plain service name
pub fn service_unit(service: &str) -> String {
    format!("{service}.service")
}
