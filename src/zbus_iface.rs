use ::zbus::interface;
use log::{error, info, warn};
use zbus::zvariant::ObjectPath;

use crate::{
    checker::Checker, error::ProbeError, init_system::InitSystem, render::Renderer,
    DBUS_DEST_NAME, DBUS_IFACE_PATH, VERSION,
};

fn fail(log_target: &str, err: ProbeError) -> zbus::fdo::Error {
    error!(target: log_target, "{}", err);
    zbus::fdo::Error::from(err)
}

/// Lets the owning daemon's clients read the probes. Every method blocks for as long as the
/// underlying probe does, so serve this on a connection that isn't latency sensitive.
#[interface(name = "org.gfxprobe.Checks")]
impl Checker {
    /// Get gfxprobe version
    fn version(&self) -> zbus::fdo::Result<String> {
        Ok(VERSION.to_string())
    }

    /// All probes at once, as a JSON object
    #[zbus(name = "Snapshot")]
    fn snapshot_json(&self) -> zbus::fdo::Result<String> {
        self.snapshot()
            .to_json()
            .map_err(|err| fail(self.log_target(), ProbeError::Config("snapshot".into(), err)))
    }

    /// Whether the named service (without `.service`) is running
    #[zbus(name = "IsServiceActive")]
    fn service_active(&self, service: &str) -> zbus::fdo::Result<bool> {
        Ok(self.is_service_active(service))
    }

    /// Name of the display manager service, e.g. `gdm`
    #[zbus(name = "CurrentDisplayManager")]
    fn display_manager(&self) -> zbus::fdo::Result<String> {
        self.current_display_manager().map_err(|err| fail(self.log_target(), err))
    }

    /// Get the active renderer:
    /// ```rust
    /// enum Renderer {
    ///     Nvidia,
    ///     Integrated,
    /// }
    /// # use gfxprobe::render;
    /// # assert_eq!(render::Renderer::Nvidia as u8, 0);
    /// # assert_eq!(render::Renderer::Integrated as u8, Renderer::Integrated as u8);
    /// ```
    #[zbus(name = "ActiveRenderer")]
    fn renderer(&self) -> zbus::fdo::Result<Renderer> {
        self.active_renderer().map_err(|err| fail(self.log_target(), err))
    }

    /// Get the init system:
    /// ```rust
    /// enum InitSystem {
    ///     Systemd,
    ///     OpenRc,
    ///     Runit,
    ///     S6,
    /// }
    /// # use gfxprobe::init_system;
    /// # assert_eq!(init_system::InitSystem::S6 as u8, 3);
    /// # assert_eq!(init_system::InitSystem::Systemd as u8, InitSystem::Systemd as u8);
    /// ```
    #[zbus(name = "InitSystem")]
    fn init(&self) -> zbus::fdo::Result<InitSystem> {
        Ok(self.init_system())
    }

    #[zbus(name = "IsModuleLoaded")]
    fn module_loaded(&self, module: &str) -> zbus::fdo::Result<bool> {
        Ok(self.is_module_loaded(module))
    }

    #[zbus(name = "IsAcPowerConnected")]
    fn ac_power(&self) -> zbus::fdo::Result<bool> {
        Ok(self.is_ac_power_connected())
    }
}

impl Checker {
    pub async fn add_to_server(self, server: &zbus::ObjectServer) {
        let log_target = self.log_target().to_owned();
        server
            .at(&ObjectPath::from_str_unchecked(DBUS_IFACE_PATH), self)
            .await
            .map_err(|err| {
                warn!(target: log_target.as_str(), "Checker: add_to_server {}", err);
                err
            })
            .ok();
    }

    /// Export on `connection` at `DBUS_IFACE_PATH` and claim `DBUS_DEST_NAME`
    pub async fn serve(self, connection: &zbus::Connection) -> Result<(), ProbeError> {
        let log_target = self.log_target().to_owned();
        self.add_to_server(&connection.object_server()).await;
        connection.request_name(DBUS_DEST_NAME).await?;
        info!(target: log_target.as_str(), "Serving {DBUS_DEST_NAME} at {DBUS_IFACE_PATH}");
        Ok(())
    }
}
