use anyhow::{Context, Result};
use std::time::Duration;

use crate::audio::WavInfo;
use crate::config::Config;
use crate::launcher;
use crate::process::{self, CaptureProcess};
use crate::state::ControlWord;

/// Watch the control file and drive the capture process.
///
/// Reacts only to changes of the commanded word, so rereading the same
/// `start` on every poll does not respawn the capture. The daemon prefers the
/// process handle it owns; the pid file is the fallback for a capture that
/// outlived a previous daemon.
pub async fn run(config: Config) -> Result<()> {
    let state = config.session_state();
    state
        .ensure_control_file()
        .context("Failed to create control file")?;

    let mut capture: Option<CaptureProcess> = None;
    let mut last_word: Option<ControlWord> = None;
    let mut ticker = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));

    tracing::info!(
        "Recording daemon started, watching {:?}",
        config.control_path
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let word = match state.read_control() {
                    Ok(word) => word,
                    Err(e) => {
                        tracing::warn!("Failed to read control file: {}", e);
                        continue;
                    }
                };

                if word == last_word {
                    continue;
                }

                match word {
                    Some(ControlWord::Start) => handle_start(&config, &mut capture),
                    Some(ControlWord::Stop) => handle_stop(&config, &mut capture).await,
                    None => {}
                }

                last_word = word;
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    if let Some(live) = capture.take() {
        stop_owned_capture(live, &config).await;
    }

    tracing::info!("Daemon shutdown complete");
    Ok(())
}

fn handle_start(config: &Config, capture: &mut Option<CaptureProcess>) {
    if capture.as_mut().is_some_and(|c| c.is_alive()) {
        tracing::debug!("Capture already running, ignoring start");
        return;
    }

    match launcher::launch(config) {
        Ok(live) => *capture = Some(live),
        Err(e) => tracing::error!("Failed to start capture: {}", e),
    }
}

async fn handle_stop(config: &Config, capture: &mut Option<CaptureProcess>) {
    if let Some(live) = capture.take() {
        stop_owned_capture(live, config).await;
        return;
    }

    // No owned handle: a previous daemon may have launched the capture. Verify
    // the stored pid is alive before signaling it.
    match process::read_pid_file(&config.pid_path()) {
        Ok(Some(pid)) => {
            let stopped = tokio::task::spawn_blocking(move || process::terminate_pid(pid)).await;
            match stopped {
                Ok(Ok(true)) => {
                    tracing::info!("Stopped orphaned capture process (pid {})", pid);
                    log_recording(config);
                }
                Ok(Ok(false)) => {
                    tracing::debug!("Pid file names {} but no such process is running", pid)
                }
                Ok(Err(e)) => tracing::error!("Failed to stop capture process {}: {}", pid, e),
                Err(e) => tracing::error!("Capture shutdown task panicked: {}", e),
            }
        }
        Ok(None) => tracing::debug!("Stop requested but no capture is running"),
        Err(e) => tracing::warn!("Failed to read pid file: {}", e),
    }
}

async fn stop_owned_capture(capture: CaptureProcess, config: &Config) {
    let pid = capture.id();
    // terminate() sleeps while polling for exit, so run it off the runtime
    let result = tokio::task::spawn_blocking(move || capture.terminate()).await;

    match result {
        Ok(Ok(())) => {
            tracing::info!("Capture stopped (pid {})", pid);
            log_recording(config);
        }
        Ok(Err(e)) => tracing::error!("Failed to stop capture: {}", e),
        Err(e) => tracing::error!("Capture shutdown task panicked: {}", e),
    }
}

fn log_recording(config: &Config) {
    let path = config.recording_path();
    match WavInfo::probe(&path) {
        Ok(info) => tracing::info!(
            "Captured {:.1}s of {}-channel audio at {}Hz in {:?}",
            info.duration_secs(),
            info.channels,
            info.sample_rate,
            path
        ),
        Err(e) => tracing::warn!("Finished recording is unreadable: {}", e),
    }
}
