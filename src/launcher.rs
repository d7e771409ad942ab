use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::process::CaptureProcess;

/// Discard any previous session and recreate the scratch directory.
///
/// Destructive: a prior recording that was never consumed is gone after this.
pub fn reset_scratch_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to remove scratch directory: {:?}", dir));
        }
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create scratch directory: {:?}", dir))
}

/// Arguments for the capture program: 16-bit capture from the default input
/// device at the configured rate and channel count.
fn capture_args(config: &Config) -> Vec<String> {
    vec![
        "-q".to_string(),
        "-r".to_string(),
        config.sample_rate.to_string(),
        "-c".to_string(),
        config.channels.to_string(),
        "-b".to_string(),
        "16".to_string(),
        config.recording_path().to_string_lossy().into_owned(),
    ]
}

/// Reset the scratch directory and start a background capture, persisting the
/// new process id.
///
/// A capture process that starts but cannot open the input device exits on its
/// own; only spawn failures are observed here.
pub fn launch(config: &Config) -> Result<CaptureProcess> {
    reset_scratch_dir(&config.scratch_dir)?;

    let args = capture_args(config);
    tracing::info!(
        "Starting capture: {} {} -> {:?}",
        config.capture_program,
        args.join(" "),
        config.recording_path()
    );

    let capture = CaptureProcess::spawn(&config.capture_program, &args, &config.pid_path())?;
    tracing::info!("Capture process started (pid {})", capture.id());
    Ok(capture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn reset_empties_existing_scratch_dir() {
        let dir = tempdir().unwrap();
        let scratch = dir.path().join("tmp");
        fs::create_dir_all(scratch.join("nested")).unwrap();
        fs::write(scratch.join("recording.wav"), b"stale").unwrap();
        fs::write(scratch.join("nested/leftover"), b"junk").unwrap();

        reset_scratch_dir(&scratch).unwrap();

        assert!(scratch.is_dir());
        assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);
    }

    #[test]
    fn reset_creates_missing_scratch_dir() {
        let dir = tempdir().unwrap();
        let scratch = dir.path().join("does/not/exist");

        reset_scratch_dir(&scratch).unwrap();

        assert!(scratch.is_dir());
    }

    #[test]
    fn capture_args_follow_config() {
        let mut config = Config::default();
        config.scratch_dir = PathBuf::from("/scratch");
        config.sample_rate = 44100;
        config.channels = 2;

        let args = capture_args(&config);

        assert_eq!(
            args,
            vec![
                "-q",
                "-r",
                "44100",
                "-c",
                "2",
                "-b",
                "16",
                "/scratch/recording.wav"
            ]
        );
    }
}
