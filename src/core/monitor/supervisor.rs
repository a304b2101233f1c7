//! Lifetime management of the external probe process.
//!
//! The probe runs as `<exe> -i <url> <extra...> -f null -`: decoded output is
//! discarded and only the diagnostic text on stderr is kept for parsing.

use std::io::{BufRead, BufReader, Read};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{MonitorError, Result};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Timing knobs for launching and stopping the probe
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// How long the probe must survive after spawn to count as started
    pub launch_grace: Duration,
    /// How long a graceful stop may take before the process is killed
    pub stop_timeout: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            launch_grace: Duration::from_secs(1),
            stop_timeout: Duration::from_secs(2),
        }
    }
}

/// Full probe argument list after the executable
pub fn build_args(target_url: &str, extra_args: &[String]) -> Vec<String> {
    let mut args = Vec::with_capacity(extra_args.len() + 5);
    args.push("-i".to_string());
    args.push(target_url.to_string());
    args.extend(extra_args.iter().cloned());
    args.extend(["-f", "null", "-"].iter().map(|s| s.to_string()));
    args
}

/// A running probe process
pub struct ProbeProcess {
    executable: PathBuf,
    child: Option<Child>,
    stderr: Option<ChildStderr>,
    stop_timeout: Duration,
}

impl ProbeProcess {
    /// Spawn the probe and make sure it survives the launch grace period.
    ///
    /// A probe that exits during the grace period (bad URL, unknown option)
    /// is reported as a launch error carrying whatever it printed.
    pub fn start(
        executable: &Path,
        target_url: &str,
        extra_args: &[String],
        options: &SupervisorOptions,
    ) -> Result<Self> {
        let args = build_args(target_url, extra_args);
        log::info!("Launching probe: {} {}", executable.display(), args.join(" "));

        let mut command = Command::new(executable);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        // Own process group, so anything the probe starts is signalled with it
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| {
                MonitorError::launch(
                    format!("failed to spawn {}: {}", executable.display(), e),
                    "",
                )
            })?;

        thread::sleep(options.launch_grace);

        match child.try_wait() {
            Ok(Some(status)) => {
                // Leftover helpers would keep stderr open and block the drain
                kill_group(&child);
                let mut leftover = Vec::new();
                if let Some(mut stderr) = child.stderr.take() {
                    let _ = stderr.read_to_end(&mut leftover);
                }
                let diagnostics = String::from_utf8_lossy(&leftover).trim().to_string();
                log::warn!("Probe exited during startup ({})", status);
                return Err(MonitorError::launch(
                    format!("probe exited during startup ({})", status),
                    diagnostics,
                ));
            }
            Ok(None) => {}
            Err(e) => {
                force_kill(&mut child);
                let _ = child.wait();
                return Err(MonitorError::launch(
                    format!("could not query probe status: {}", e),
                    "",
                ));
            }
        }

        let stderr = child.stderr.take();
        log::info!("Probe running with pid {}", child.id());

        Ok(Self {
            executable: executable.to_path_buf(),
            child: Some(child),
            stderr,
            stop_timeout: options.stop_timeout,
        })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(|c| c.id())
    }

    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// The diagnostic line stream. Can be taken once.
    pub fn take_lines(&mut self) -> Option<ProbeLines<ChildStderr>> {
        self.stderr.take().map(ProbeLines::new)
    }

    /// Ask the probe to exit, killing it if it is still alive after the stop
    /// timeout. Calling it again after the process is gone does nothing.
    pub fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        if let Ok(Some(status)) = child.try_wait() {
            log::debug!("Probe already exited ({})", status);
            kill_group(&child);
            return;
        }

        request_termination(&mut child);

        let deadline = Instant::now() + self.stop_timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    log::info!("Probe stopped ({})", status);
                    kill_group(&child);
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL_INTERVAL),
                Ok(None) => break,
                Err(e) => {
                    log::warn!("Failed to poll probe status: {}", e);
                    break;
                }
            }
        }

        log::warn!(
            "Probe did not exit within {:?}, killing it",
            self.stop_timeout
        );
        force_kill(&mut child);
        let _ = child.wait();
    }
}

impl Drop for ProbeProcess {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: libc::c_int) -> bool {
    // SAFETY: kill(2) on the process group led by a child we spawned. The
    // group id stays reserved while any member is alive.
    let rc = unsafe { libc::kill(-(child.id() as libc::pid_t), signal) };
    if rc != 0 {
        log::debug!(
            "Signal {} to process group {} failed: {}",
            signal,
            child.id(),
            std::io::Error::last_os_error()
        );
    }
    rc == 0
}

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    signal_group(child, libc::SIGTERM);
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    // No termination signal to send; TerminateProcess is the only option
    if let Err(e) = child.kill() {
        log::debug!("Terminate failed: {}", e);
    }
}

/// Kill whatever is left of the probe's process group
#[cfg(unix)]
fn kill_group(child: &Child) {
    signal_group(child, libc::SIGKILL);
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn force_kill(child: &mut Child) {
    #[cfg(unix)]
    {
        if signal_group(child, libc::SIGKILL) {
            return;
        }
    }
    if let Err(e) = child.kill() {
        log::warn!("Failed to kill probe: {}", e);
    }
}

/// Blocking iterator over the probe's diagnostic lines.
///
/// ffmpeg redraws its progress line with `\r`, so both `\r` and `\n` end a
/// line. Empty fragments are skipped and invalid UTF-8 is replaced. The
/// iterator ends at EOF, which happens once the probe exits.
pub struct ProbeLines<R> {
    reader: BufReader<R>,
    finished: bool,
}

impl<R: Read> ProbeLines<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            finished: false,
        }
    }
}

impl<R: Read> Iterator for ProbeLines<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }

        let mut line = Vec::new();
        loop {
            let available = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::warn!("Reading probe output failed: {}", e);
                    self.finished = true;
                    break;
                }
            };

            if available.is_empty() {
                self.finished = true;
                break;
            }

            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(end) => {
                    line.extend_from_slice(&available[..end]);
                    self.reader.consume(end + 1);
                    if !line.is_empty() {
                        return Some(String::from_utf8_lossy(&line).into_owned());
                    }
                }
                None => {
                    let len = available.len();
                    line.extend_from_slice(available);
                    self.reader.consume(len);
                }
            }
        }

        if line.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&line).into_owned())
        }
    }
}
