//! Subprocess seam for the sound server's command-line tools.

use std::io;
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use tracing::debug;

/// How long a process gets to exit after SIGTERM before it is killed.
const TERM_GRACE: Duration = Duration::from_millis(500);
const TERM_POLL: Duration = Duration::from_millis(10);

/// Captured result of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
}

/// A process launched in the background.
pub trait ManagedChild {
    fn id(&self) -> u32;

    /// Non-blocking exit check: `None` while running, else whether it succeeded.
    ///
    /// # Errors
    /// Returns an error if the process state cannot be queried.
    fn try_status(&mut self) -> io::Result<Option<bool>>;

    /// Stop the process and reap it.
    ///
    /// The process is asked to exit with SIGTERM first and only killed if it
    /// is still running after a short grace period.
    ///
    /// # Errors
    /// Returns an error if the process could not be signalled or reaped.
    fn terminate(&mut self) -> io::Result<()>;
}

/// Runs external programs. Exit status and stdout are the only signals observed.
pub trait ProcessRunner {
    type Child: ManagedChild;

    /// Run to completion and capture stdout.
    ///
    /// # Errors
    /// Returns an error if the program cannot be started.
    fn capture(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;

    /// Run to completion and report whether it exited successfully.
    ///
    /// # Errors
    /// Returns an error if the program cannot be started.
    fn run(&self, program: &str, args: &[String]) -> io::Result<bool>;

    /// Start in the background without waiting.
    ///
    /// # Errors
    /// Returns an error if the program cannot be started.
    fn launch(&self, program: &str, args: &[String]) -> io::Result<Self::Child>;
}

/// [`ProcessRunner`] backed by `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    type Child = Child;

    fn capture(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let output = Command::new(program).args(args).stdin(Stdio::null()).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }

    fn run(&self, program: &str, args: &[String]) -> io::Result<bool> {
        let output = Command::new(program).args(args).stdin(Stdio::null()).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(program, status = %output.status, stderr = %stderr.trim(), "Command failed");
        }
        Ok(output.status.success())
    }

    fn launch(&self, program: &str, args: &[String]) -> io::Result<Child> {
        Command::new(program).args(args).stdin(Stdio::null()).stdout(Stdio::null()).spawn()
    }
}

impl ManagedChild for Child {
    fn id(&self) -> u32 {
        Child::id(self)
    }

    fn try_status(&mut self) -> io::Result<Option<bool>> {
        Ok(self.try_wait()?.map(|status| status.success()))
    }

    fn terminate(&mut self) -> io::Result<()> {
        if self.try_wait()?.is_some() {
            return Ok(());
        }

        match send_sigterm(Child::id(self)) {
            Ok(()) => {
                let deadline = Instant::now() + TERM_GRACE;
                while Instant::now() < deadline {
                    if self.try_wait()?.is_some() {
                        return Ok(());
                    }
                    sleep(TERM_POLL);
                }
                debug!(pid = Child::id(self), "Process ignored SIGTERM, killing");
            }
            Err(e) => debug!(pid = Child::id(self), error = %e, "SIGTERM failed, killing"),
        }

        self.kill()?;
        self.wait()?;
        Ok(())
    }
}

#[allow(unsafe_code)] // kill(2) has no memory-safety preconditions
fn send_sigterm(pid: u32) -> io::Result<()> {
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    if unsafe { libc::kill(pid, libc::SIGTERM) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
