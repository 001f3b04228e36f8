//! Process management - starting the application under test and stopping it

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// How long a stopped process group gets to exit after SIGTERM
const STOP_GRACE: Duration = Duration::from_millis(500);

/// Handle to a detached shell command running in its own process group
///
/// `stop` signals the whole group once; later calls do nothing. Dropping a
/// handle that was never stopped stops it.
pub struct ProcessHandle {
    command: String,
    child: Option<Child>,
}

/// Start `command` if one is configured
pub fn start_if_configured(command: Option<&str>) -> E2eResult<Option<ProcessHandle>> {
    match command.map(str::trim).filter(|c| !c.is_empty()) {
        Some(command) => ProcessHandle::spawn(command).map(Some),
        None => {
            debug!("No start command found");
            Ok(None)
        }
    }
}

impl ProcessHandle {
    /// Spawn `command` through the shell without waiting for it
    pub fn spawn(command: &str) -> E2eResult<Self> {
        info!("Starting \"{}\"", command);

        let mut cmd = shell_command(command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // own group, so stop reaches everything the shell started
            cmd.process_group(0);
        }

        let child = cmd.spawn().map_err(|e| E2eError::ProcessStart {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

        debug!("detached process {} for \"{}\"", child.id(), command);

        Ok(Self {
            command: command.to_string(),
            child: Some(child),
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Process id, until stopped
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Whether the shell process is still running
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Terminate the process group
    ///
    /// Returns `true` when this call did the stopping, `false` when the
    /// handle was already stopped.
    pub fn stop(&mut self) -> bool {
        let Some(mut child) = self.child.take() else {
            return false;
        };

        info!("stopping server process opened with: {}", self.command);

        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            let pgid = Pid::from_raw(child.id() as i32);
            if let Err(e) = killpg(pgid, Signal::SIGTERM) {
                debug!("SIGTERM to process group {} failed: {}", pgid, e);
            }

            let deadline = Instant::now() + STOP_GRACE;
            while Instant::now() < deadline {
                if matches!(child.try_wait(), Ok(Some(_))) {
                    break;
                }
                std::thread::sleep(Duration::from_millis(25));
            }

            // whatever ignored SIGTERM in the group goes now
            let _ = killpg(pgid, Signal::SIGKILL);
        }

        if let Err(e) = child.kill() {
            debug!("kill of {} returned: {}", child.id(), e);
        }
        if let Err(e) = child.wait() {
            warn!("Failed to reap \"{}\": {}", self.command, e);
        }

        true
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn shell_command(command: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}
