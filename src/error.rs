use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
pub enum ProbeError {
    /// A probe could not reach a conclusion, e.g. no display manager is configured
    Check(String),
    Io(PathBuf, std::io::Error),
    /// The program could not be spawned or waited on
    Command(String, std::io::Error),
    CommandTimeout(String, Duration),
    /// Connecting to or talking with the system bus failed
    BusUnavailable(zbus::Error),
    /// systemd has no unit by this name loaded
    UnitNotFound(String),
    Zbus(zbus::Error),
    ZbusFdo(zbus::fdo::Error),
    Config(String, serde_json::Error),
}

impl ProbeError {
    pub fn from_io(error: std::io::Error, detail: PathBuf) -> Self {
        Self::Io(detail, error)
    }

    /// Any error produced by the bus path of the service prober
    pub fn is_bus_error(&self) -> bool {
        matches!(
            self,
            ProbeError::BusUnavailable(_)
                | ProbeError::UnitNotFound(_)
                | ProbeError::Zbus(_)
                | ProbeError::ZbusFdo(_)
        )
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Check(detail) => write!(f, "Check failed: {}", detail),
            ProbeError::Io(path, err) => write!(f, "IO error on {}: {}", path.display(), err),
            ProbeError::Command(cmd, err) => write!(f, "Command \"{}\" failed: {}", cmd, err),
            ProbeError::CommandTimeout(cmd, timeout) => write!(
                f,
                "Command \"{}\" did not finish within {} ms",
                cmd,
                timeout.as_millis()
            ),
            ProbeError::BusUnavailable(err) => write!(f, "System bus unavailable: {}", err),
            ProbeError::UnitNotFound(unit) => write!(f, "Unit {} is not loaded", unit),
            ProbeError::Zbus(err) => write!(f, "Zbus error: {}", err),
            ProbeError::ZbusFdo(err) => write!(f, "Zbus fdo error: {}", err),
            ProbeError::Config(path, err) => {
                write!(f, "Could not parse config {}: {}", path, err)
            }
        }
    }
}

impl std::error::Error for ProbeError {}

impl From<zbus::Error> for ProbeError {
    fn from(err: zbus::Error) -> Self {
        ProbeError::Zbus(err)
    }
}

impl From<zbus::fdo::Error> for ProbeError {
    fn from(err: zbus::fdo::Error) -> Self {
        ProbeError::ZbusFdo(err)
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        ProbeError::Io(PathBuf::new(), err)
    }
}

impl From<ProbeError> for zbus::fdo::Error {
    fn from(err: ProbeError) -> Self {
        zbus::fdo::Error::Failed(err.to_string())
    }
}
