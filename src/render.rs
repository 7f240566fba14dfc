use log::{debug, info};
use serde_derive::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use zbus::zvariant::Type;

use crate::command::{command_succeeds, CommandRunner, ProbeCommand};
use crate::error::ProbeError;

const NVIDIA_GLX_VENDOR: &str = "server glx vendor string: NVIDIA Corporation";
/// Name the nvidia driver registers its offload sink under
const NVIDIA_OFFLOAD_PROVIDER: &str = "name:NVIDIA-G0";

/// Who renders the X screen when no offload is requested
/// ```rust
/// # use gfxprobe::render::Renderer;
/// # use std::str::FromStr;
/// assert_eq!(Renderer::from_str("nvidia").unwrap(), Renderer::Nvidia);
/// assert_eq!(Renderer::Integrated.to_string(), "integrated");
/// ```
#[derive(Debug, Type, PartialEq, Eq, Copy, Clone, Deserialize, Serialize)]
pub enum Renderer {
    Nvidia,
    Integrated,
}

impl Display for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(<&str>::from(self))
    }
}

impl From<&Renderer> for &str {
    fn from(renderer: &Renderer) -> &'static str {
        match renderer {
            Renderer::Nvidia => "nvidia",
            Renderer::Integrated => "integrated",
        }
    }
}

impl FromStr for Renderer {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, ProbeError> {
        match s.to_lowercase().trim() {
            "nvidia" => Ok(Renderer::Nvidia),
            "integrated" => Ok(Renderer::Integrated),
            other => Err(ProbeError::Check(format!("Unknown renderer {other}"))),
        }
    }
}

/// Ask GLX who the server vendor is, with PRIME render offload forced off
pub fn is_gl_provider_nvidia(runner: &dyn CommandRunner) -> Result<bool, ProbeError> {
    let cmd = ProbeCommand::new("glxinfo").env("__NV_PRIME_RENDER_OFFLOAD", "0");
    let out = runner.run(&cmd)?;
    if !out.success {
        return Err(ProbeError::Check(format!(
            "Cannot run glxinfo: {}",
            out.stderr.trim()
        )));
    }
    Ok(out.stdout.lines().any(|line| line.contains(NVIDIA_GLX_VENDOR)))
}

pub fn active_renderer(
    runner: &dyn CommandRunner,
    log_target: &str,
) -> Result<Renderer, ProbeError> {
    let renderer = if is_gl_provider_nvidia(runner)? {
        Renderer::Nvidia
    } else {
        Renderer::Integrated
    };
    info!(target: log_target, "active_renderer: {renderer}");
    Ok(renderer)
}

/// The nvidia driver exposes an `NVIDIA-G0` provider only when it can act as a PRIME
/// render offload sink
pub fn check_offloading_available(
    runner: &dyn CommandRunner,
    log_target: &str,
) -> Result<bool, ProbeError> {
    let cmd = ProbeCommand::new("xrandr").arg("--listproviders");
    let out = runner.run(&cmd)?;
    if !out.success {
        return Err(ProbeError::Check(format!(
            "Cannot list xrandr providers:\n{}",
            out.stderr.trim()
        )));
    }
    let available = out
        .stdout
        .lines()
        .any(|line| is_provider_line(line) && line.contains(NVIDIA_OFFLOAD_PROVIDER));
    debug!(target: log_target, "check_offloading_available: {available}");
    Ok(available)
}

/// `Provider <n>:` at the start of the line
fn is_provider_line(line: &str) -> bool {
    line.strip_prefix("Provider ")
        .and_then(|rest| rest.split_once(':'))
        .is_some_and(|(idx, _)| !idx.is_empty() && idx.bytes().all(|b| b.is_ascii_digit()))
}

/// `xhost` only succeeds with a reachable X display we're allowed to talk to
pub fn check_running_graphical_session(runner: &dyn CommandRunner, log_target: &str) -> bool {
    command_succeeds(runner, &ProbeCommand::new("xhost"), log_target)
}
