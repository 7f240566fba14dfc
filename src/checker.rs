use log::warn;

use crate::command::{CommandRunner, SystemRunner};
use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::init_system::InitSystem;
use crate::render::Renderer;
use crate::service::ServiceProber;
use crate::snapshot::SystemSnapshot;
use crate::systemd::{SystemdBus, UnitStateSource};
use crate::{
    cpu, display_manager, kernel, power, render, xorg, BUMBLEBEED_SERVICE, DAEMON_SERVICE,
    DISPLAY_MANAGER_SERVICE, NVIDIA_MODULE,
};

/// All host probes behind one handle. Owns the config, the process runner and the systemd
/// bus client. Everything it runs logs under `config.log_target`.
pub struct Checker {
    config: ProbeConfig,
    runner: Box<dyn CommandRunner + Send + Sync>,
    bus: Box<dyn UnitStateSource + Send + Sync>,
}

impl Checker {
    pub fn new(config: ProbeConfig) -> Self {
        let timeout = config.command_timeout();
        let runner = SystemRunner::new(timeout, &config.log_target);
        let bus = SystemdBus::new(timeout, &config.log_target);
        Self::with_backends(config, Box::new(runner), Box::new(bus))
    }

    pub fn with_backends(
        config: ProbeConfig,
        runner: Box<dyn CommandRunner + Send + Sync>,
        bus: Box<dyn UnitStateSource + Send + Sync>,
    ) -> Self {
        Self {
            config,
            runner,
            bus,
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn log_target(&self) -> &str {
        &self.config.log_target
    }

    fn runner(&self) -> &dyn CommandRunner {
        &*self.runner
    }

    fn prober(&self) -> ServiceProber<'_> {
        let bus: Option<&dyn UnitStateSource> = if self.config.use_dbus {
            Some(&*self.bus as &dyn UnitStateSource)
        } else {
            None
        };
        ServiceProber::new(bus, self.runner(), self.log_target())
    }

    pub fn is_service_active(&self, service: &str) -> bool {
        self.prober().is_service_active(service)
    }

    pub fn is_login_manager_active(&self) -> bool {
        self.is_service_active(DISPLAY_MANAGER_SERVICE)
    }

    pub fn is_daemon_active(&self) -> bool {
        self.is_service_active(DAEMON_SERVICE)
    }

    pub fn is_bumblebeed_service_active(&self) -> bool {
        self.is_service_active(BUMBLEBEED_SERVICE)
    }

    pub fn init_system(&self) -> InitSystem {
        InitSystem::detect(self.runner(), self.log_target())
    }

    pub fn current_display_manager(&self) -> Result<String, ProbeError> {
        display_manager::current_display_manager(&self.config, self.runner())
    }

    pub fn using_patched_gdm(&self) -> bool {
        display_manager::using_patched_gdm(&self.config.gdm_prime_dirs)
    }

    pub fn is_ac_power_connected(&self) -> bool {
        power::is_ac_power_connected(&self.config.power_supply_dir, self.log_target())
    }

    pub fn is_pat_available(&self) -> bool {
        cpu::is_pat_available(&self.config.cpuinfo_path, self.log_target())
    }

    pub fn is_module_available(&self, module: &str) -> bool {
        kernel::is_module_available(self.runner(), module, self.log_target())
    }

    pub fn is_module_loaded(&self, module: &str) -> bool {
        kernel::is_module_loaded(self.runner(), module, self.log_target())
    }

    pub fn is_gl_provider_nvidia(&self) -> Result<bool, ProbeError> {
        render::is_gl_provider_nvidia(self.runner())
    }

    pub fn active_renderer(&self) -> Result<Renderer, ProbeError> {
        render::active_renderer(self.runner(), self.log_target())
    }

    pub fn check_offloading_available(&self) -> Result<bool, ProbeError> {
        render::check_offloading_available(self.runner(), self.log_target())
    }

    pub fn check_running_graphical_session(&self) -> bool {
        render::check_running_graphical_session(self.runner(), self.log_target())
    }

    pub fn is_xorg_intel_module_available(&self) -> bool {
        xorg::is_xorg_intel_module_available(&self.config.xorg_drivers_dir, self.log_target())
    }

    pub fn is_xorg_amdgpu_module_available(&self) -> bool {
        xorg::is_xorg_amdgpu_module_available(&self.config.xorg_drivers_dir, self.log_target())
    }

    /// Run every probe once, in order. Failing probes are logged and left empty.
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            ac_power: self.is_ac_power_connected(),
            pat_available: self.is_pat_available(),
            graphical_session: self.check_running_graphical_session(),
            renderer: self.ok_or_warn("active_renderer", self.active_renderer()),
            offloading_available: self
                .ok_or_warn("check_offloading_available", self.check_offloading_available()),
            xorg_intel_module: self.is_xorg_intel_module_available(),
            xorg_amdgpu_module: self.is_xorg_amdgpu_module_available(),
            patched_gdm: self.using_patched_gdm(),
            display_manager: self
                .ok_or_warn("current_display_manager", self.current_display_manager()),
            init_system: self.init_system(),
            nvidia_module_available: self.is_module_available(NVIDIA_MODULE),
            nvidia_module_loaded: self.is_module_loaded(NVIDIA_MODULE),
            login_manager_active: self.is_login_manager_active(),
            daemon_active: self.is_daemon_active(),
            bumblebeed_active: self.is_bumblebeed_service_active(),
        }
    }

    fn ok_or_warn<T>(&self, probe: &str, res: Result<T, ProbeError>) -> Option<T> {
        res.map_err(|e| warn!(target: self.log_target(), "snapshot: {probe}: {e}"))
            .ok()
    }
}
