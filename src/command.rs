use log::{trace, warn};
use std::fmt::Display;
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

use crate::error::ProbeError;

/// A program invocation with an explicit argument array. Nothing here is ever handed to a
/// shell, so names coming from callers can't smuggle in extra commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCommand {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl ProbeCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_owned(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_owned());
        self
    }

    pub fn args<'a>(mut self, args: impl IntoIterator<Item = &'a str>) -> Self {
        self.args.extend(args.into_iter().map(str::to_owned));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_owned(), value.to_owned()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn environment(&self) -> &[(String, String)] {
        &self.envs
    }

    /// `true` if this is `program` called with exactly `args`
    pub fn is(&self, program: &str, args: &[&str]) -> bool {
        self.program == program && self.args.iter().map(String::as_str).eq(args.iter().copied())
    }
}

impl Display for ProbeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (key, value) in &self.envs {
            write!(f, "{key}={value} ")?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: &str) -> Self {
        Self {
            success: true,
            stdout: stdout.to_owned(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: &str) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.to_owned(),
        }
    }
}

/// Runs external programs for the probes. The real one is [`SystemRunner`]; tests swap in a
/// mock.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    fn run(&self, cmd: &ProbeCommand) -> Result<CommandOutput, ProbeError>;
}

/// Exit-code check. Spawn failures and timeouts count as "no".
pub fn command_succeeds(
    runner: &dyn CommandRunner,
    cmd: &ProbeCommand,
    log_target: &str,
) -> bool {
    match runner.run(cmd) {
        Ok(out) => out.success,
        Err(e) => {
            trace!(target: log_target, "command_succeeds: {cmd}: {e}");
            false
        }
    }
}

/// Spawns real processes. The whole call, including reading the output, finishes within
/// `timeout`: a child still running is killed, and output pipes some leftover descendant
/// keeps open are abandoned.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
    log_target: String,
}

impl SystemRunner {
    pub fn new(timeout: Duration, log_target: &str) -> Self {
        Self {
            timeout,
            log_target: log_target.to_owned(),
        }
    }

    fn timed_out(&self, cmd: &ProbeCommand) -> ProbeError {
        ProbeError::CommandTimeout(cmd.to_string(), self.timeout)
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ProbeCommand) -> Result<CommandOutput, ProbeError> {
        let target = self.log_target.as_str();
        trace!(target: target, "run: {cmd}");
        let deadline = Instant::now() + self.timeout;
        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .envs(cmd.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProbeError::Command(cmd.to_string(), e))?;

        // Drain both pipes while waiting, glxinfo easily fills a pipe buffer
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = child
            .wait_timeout(deadline.saturating_duration_since(Instant::now()))
            .map_err(|e| ProbeError::Command(cmd.to_string(), e))?;
        let Some(status) = status else {
            warn!(target: target, "run: {cmd} timed out after {:?}, killing it", self.timeout);
            child.kill().ok();
            child.wait().ok();
            return Err(self.timed_out(cmd));
        };

        // The child is gone but a background descendant may still hold the pipes
        let (Some(stdout), Some(stderr)) = (collect(stdout, deadline), collect(stderr, deadline))
        else {
            warn!(
                target: target,
                "run: {cmd} exited but its output stayed open past {:?}",
                self.timeout
            );
            return Err(self.timed_out(cmd));
        };

        Ok(CommandOutput {
            success: status.success(),
            stdout,
            stderr,
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf).ok();
        tx.send(String::from_utf8_lossy(&buf).into_owned()).ok();
    });
    rx
}

/// `None` if the pipe is still open at `deadline`
fn collect(rx: Option<Receiver<String>>, deadline: Instant) -> Option<String> {
    let Some(rx) = rx else {
        return Some(String::new());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(out) => Some(out),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_env_and_args() {
        let cmd = ProbeCommand::new("glxinfo").env("__NV_PRIME_RENDER_OFFLOAD", "0");
        assert_eq!(cmd.to_string(), "__NV_PRIME_RENDER_OFFLOAD=0 glxinfo");
        let cmd = ProbeCommand::new("rc-status").args(["--nocolor", "default"]);
        assert_eq!(cmd.to_string(), "rc-status --nocolor default");
    }

    #[test]
    fn service_name_stays_one_argument() {
        let cmd = ProbeCommand::new("sv").args(["status", "foo; rm -rf /"]);
        assert_eq!(cmd.arguments().len(), 2);
        assert!(cmd.is("sv", &["status", "foo; rm -rf /"]));
        assert!(!cmd.is("sv", &["status", "foo;"]));
    }

    #[test]
    fn spawn_failure_is_not_success() {
        let runner = SystemRunner::new(Duration::from_secs(5), "test");
        let cmd = ProbeCommand::new("/nonexistent/gfxprobe-no-such-binary");
        assert!(matches!(runner.run(&cmd), Err(ProbeError::Command(_, _))));
        assert!(!command_succeeds(&runner, &cmd, "test"));
    }

    #[test]
    fn captures_stdout_and_status() {
        let runner = SystemRunner::new(Duration::from_secs(5), "test");
        let cmd = ProbeCommand::new("sh")
            .args(["-c", "echo $GFXPROBE_TEST; exit 3"])
            .env("GFXPROBE_TEST", "hello");
        let out = runner.run(&cmd).unwrap();
        assert!(!out.success);
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn kills_commands_past_timeout() {
        let runner = SystemRunner::new(Duration::from_millis(100), "test");
        let res = runner.run(&ProbeCommand::new("sleep").arg("5"));
        assert!(matches!(res, Err(ProbeError::CommandTimeout(_, _))));
    }

    #[test]
    fn background_child_holding_stdout_still_times_out() {
        let runner = SystemRunner::new(Duration::from_millis(200), "test");
        let start = Instant::now();
        let res = runner.run(&ProbeCommand::new("sh").args(["-c", "sleep 3 & echo hi"]));
        assert!(matches!(res, Err(ProbeError::CommandTimeout(_, _))));
        assert!(start.elapsed() < Duration::from_secs(2), "{:?}", start.elapsed());
    }
}
