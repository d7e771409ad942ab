use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// Last commanded action, stored as the control file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlWord {
    Start,
    Stop,
}

impl ControlWord {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }

    /// Parse control file content. Anything other than start/stop (including
    /// the `ready` seed the daemon writes on first run) is treated as no
    /// command.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// Result of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    Stopped,
}

/// Exclusive flock held for the duration of a state mutation.
struct StateLock {
    file: File,
}

impl StateLock {
    fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open lock file: {:?}", path))?;

        let fd = file.as_raw_fd();
        // SAFETY: `fd` is a valid descriptor and the file handle is retained
        // for the lifetime of the lock.
        let rc = unsafe { libc::flock(fd, libc::LOCK_EX) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            return Err(err).with_context(|| format!("Failed to acquire lock: {:?}", path));
        }

        Ok(Self { file })
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let fd = self.file.as_raw_fd();
        // SAFETY: `fd` belongs to `file`, still alive here; unlocking is idempotent.
        let _ = unsafe { libc::flock(fd, libc::LOCK_UN) };
    }
}

/// Recording session state, backed by the marker and control files.
///
/// The marker's existence is the sole source of truth for "recording is
/// active"; the control file carries the last commanded action for whoever
/// consumes it. Mutations run under an exclusive flock on a sibling lock file
/// so concurrent toggles serialize instead of racing on the marker.
pub struct SessionState {
    marker_path: PathBuf,
    control_path: PathBuf,
    lock_path: PathBuf,
}

impl SessionState {
    pub fn new(marker_path: PathBuf, control_path: PathBuf) -> Self {
        let lock_path = marker_path.with_extension("lock");
        Self {
            marker_path,
            control_path,
            lock_path,
        }
    }

    /// Whether a recording session is currently active.
    pub fn is_recording(&self) -> bool {
        self.marker_path.exists()
    }

    /// Flip the recording state: create the marker and command `start`, or
    /// delete it and command `stop`.
    pub fn toggle(&self) -> Result<Transition> {
        let _guard = StateLock::acquire(&self.lock_path)?;

        if self.marker_path.exists() {
            fs::remove_file(&self.marker_path)
                .with_context(|| format!("Failed to remove marker file: {:?}", self.marker_path))?;
            self.write_control(ControlWord::Stop)?;
            Ok(Transition::Stopped)
        } else {
            fs::write(&self.marker_path, b"")
                .with_context(|| format!("Failed to create marker file: {:?}", self.marker_path))?;
            self.write_control(ControlWord::Start)?;
            Ok(Transition::Started)
        }
    }

    /// Overwrite the control file with the given command word.
    pub fn write_control(&self, word: ControlWord) -> Result<()> {
        fs::write(&self.control_path, format!("{}\n", word.as_str()))
            .with_context(|| format!("Failed to write control file: {:?}", self.control_path))
    }

    /// Read the current command word. A missing file or unrecognized content
    /// reads as no command.
    pub fn read_control(&self) -> Result<Option<ControlWord>> {
        match fs::read_to_string(&self.control_path) {
            Ok(contents) => Ok(ControlWord::parse(&contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read control file: {:?}", self.control_path)),
        }
    }

    /// Seed the control file if it does not exist yet, so consumers have
    /// something to poll before the first toggle.
    pub fn ensure_control_file(&self) -> Result<()> {
        if self.control_path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.control_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create control directory: {:?}", parent))?;
        }
        fs::write(&self.control_path, "ready\n")
            .with_context(|| format!("Failed to create control file: {:?}", self.control_path))
    }
}
