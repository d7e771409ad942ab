use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

const STOP_TERM_TIMEOUT: Duration = Duration::from_secs(2);
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Persist a process id as a single decimal line.
pub fn write_pid_file(path: &Path, pid: u32) -> Result<()> {
    fs::write(path, format!("{}\n", pid))
        .with_context(|| format!("Failed to write pid file: {:?}", path))
}

/// Read a pid file. A missing file or unparseable content reads as absent.
pub fn read_pid_file(path: &Path) -> Result<Option<u32>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents.trim().parse::<u32>().ok()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read pid file: {:?}", path)),
    }
}

/// Probe a pid for liveness without delivering a signal.
pub fn is_alive(pid: u32) -> bool {
    // SAFETY: kill with signal 0 only performs the existence/permission check.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

fn send_signal(pid: u32, signal: libc::c_int) -> Result<()> {
    // SAFETY: plain kill(2) call; the pid is not dereferenced.
    let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        return Err(err).with_context(|| format!("Failed to signal process {}", pid));
    }
    Ok(())
}

/// Stop a process this crate did not spawn, by pid alone.
///
/// SIGTERM first so the capture binary can finalize its output file, SIGKILL
/// if it lingers past the timeout. Returns whether a live process was actually
/// stopped, so callers can tell a real stop from a stale pid.
pub fn terminate_pid(pid: u32) -> Result<bool> {
    if !is_alive(pid) {
        return Ok(false);
    }

    send_signal(pid, libc::SIGTERM)?;

    let deadline = Instant::now() + STOP_TERM_TIMEOUT;
    while Instant::now() < deadline {
        if !is_alive(pid) {
            return Ok(true);
        }
        std::thread::sleep(STOP_POLL_INTERVAL);
    }

    tracing::warn!("Process {} ignored SIGTERM, sending SIGKILL", pid);
    send_signal(pid, libc::SIGKILL)?;
    Ok(true)
}

/// Owned handle to a spawned capture process.
///
/// The pid file is written at spawn time and never cleared; it stays behind as
/// the reference external consumers use once the handle is detached.
pub struct CaptureProcess {
    child: Child,
    pid_path: PathBuf,
}

impl CaptureProcess {
    /// Spawn `program` with null stdio and persist its pid. If the pid file
    /// cannot be written the child is killed again, so no untracked capture is
    /// left running.
    pub fn spawn(program: &str, args: &[String], pid_path: &Path) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to spawn capture process: {}", program))?;

        if let Err(e) = write_pid_file(pid_path, child.id()) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        Ok(Self {
            child,
            pid_path: pid_path.to_path_buf(),
        })
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn pid_path(&self) -> &Path {
        &self.pid_path
    }

    /// Non-blocking liveness check. Reaps the child if it already exited.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Leave the process running and give up ownership. Dropping a `Child`
    /// does not kill it; the pid file remains the only reference.
    pub fn detach(self) -> u32 {
        self.child.id()
    }

    /// Stop the capture: SIGTERM, wait for exit up to the timeout, SIGKILL as
    /// a last resort, then reap.
    pub fn terminate(mut self) -> Result<()> {
        if !self.is_alive() {
            return Ok(());
        }

        send_signal(self.child.id(), libc::SIGTERM)?;

        let deadline = Instant::now() + STOP_TERM_TIMEOUT;
        while Instant::now() < deadline {
            if !self.is_alive() {
                return Ok(());
            }
            std::thread::sleep(STOP_POLL_INTERVAL);
        }

        tracing::warn!(
            "Capture process {} ignored SIGTERM, sending SIGKILL",
            self.child.id()
        );
        self.child
            .kill()
            .context("Failed to kill capture process")?;
        self.child
            .wait()
            .context("Failed to reap capture process")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn spawn_sleep(pid_path: &Path) -> CaptureProcess {
        CaptureProcess::spawn("sleep", &["30".to_string()], pid_path).unwrap()
    }

    #[test]
    fn spawn_writes_matching_pid_file() {
        let dir = tempdir().unwrap();
        let pid_path = dir.path().join("recording_pid");

        let capture = spawn_sleep(&pid_path);
        let written = fs::read_to_string(&pid_path).unwrap();

        assert_eq!(written, format!("{}\n", capture.id()));
        assert_eq!(read_pid_file(&pid_path).unwrap(), Some(capture.id()));
        assert!(capture.id() > 0);

        capture.terminate().unwrap();
    }

    #[test]
    fn terminate_stops_a_live_process() {
        let dir = tempdir().unwrap();
        let pid_path = dir.path().join("recording_pid");

        let mut capture = spawn_sleep(&pid_path);
        let pid = capture.id();
        assert!(capture.is_alive());

        capture.terminate().unwrap();
        assert!(!is_alive(pid));
    }

    #[test]
    fn terminate_pid_reports_stale_pid() {
        // Spawn through a shell that exits immediately, so the orphaned sleep
        // is reaped by init once signaled (a direct child would linger as a
        // zombie and still count as alive).
        let output = Command::new("sh")
            .arg("-c")
            .arg("sleep 30 >/dev/null 2>&1 & echo $!")
            .output()
            .unwrap();
        let pid: u32 = String::from_utf8(output.stdout)
            .unwrap()
            .trim()
            .parse()
            .unwrap();

        assert!(is_alive(pid));
        assert!(terminate_pid(pid).unwrap());
        assert!(!terminate_pid(pid).unwrap());
    }

    #[test]
    fn spawn_fails_for_missing_binary() {
        let dir = tempdir().unwrap();
        let pid_path = dir.path().join("recording_pid");

        let result = CaptureProcess::spawn("definitely-not-a-real-binary", &[], &pid_path);

        assert!(result.is_err());
        assert!(!pid_path.exists());
    }

    #[test]
    fn pid_file_roundtrip_and_garbage() {
        let dir = tempdir().unwrap();
        let pid_path = dir.path().join("recording_pid");

        assert_eq!(read_pid_file(&pid_path).unwrap(), None);

        write_pid_file(&pid_path, 12345).unwrap();
        assert_eq!(read_pid_file(&pid_path).unwrap(), Some(12345));

        fs::write(&pid_path, "not a pid\n").unwrap();
        assert_eq!(read_pid_file(&pid_path).unwrap(), None);
    }

    #[test]
    fn own_process_is_alive() {
        assert!(is_alive(std::process::id()));
    }
}
