mod audio;
mod config;
mod daemon;
mod launcher;
mod notify;
mod process;
mod state;

use anyhow::Result;
use clap::{Parser, Subcommand};

use config::Config;
use state::Transition;

#[derive(Parser)]
#[command(name = "s2t")]
#[command(about = "Speech-to-text recording controller")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flip the recording state and notify the desktop
    Toggle,
    /// Reset the scratch directory and start a background capture
    Record,
    /// Watch the control file and drive the capture process
    Daemon,
    /// Report marker, control and capture process state
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load()?;
    config.validate()?;

    match cli.command {
        Commands::Toggle => toggle(&config),
        Commands::Record => record(&config),
        Commands::Daemon => daemon::run(config).await,
        Commands::Status => status(&config),
    }
}

/// Flip the marker, command the new action, and notify the desktop.
fn toggle(config: &Config) -> Result<()> {
    let state = config.session_state();
    let transition = state.toggle()?;

    match transition {
        Transition::Started => tracing::info!("Recording started"),
        Transition::Stopped => tracing::info!("Recording stopped"),
    }

    if config.notifications {
        notify::notify_transition(transition);
    }

    Ok(())
}

/// Start a background capture and leave it running; the pid file is the
/// reference the stop path uses.
fn record(config: &Config) -> Result<()> {
    let capture = launcher::launch(config)?;
    let pid = capture.detach();
    tracing::info!("Capture running in the background (pid {})", pid);
    Ok(())
}

/// Print the observable session state, flagging marker/process drift.
fn status(config: &Config) -> Result<()> {
    let state = config.session_state();
    let recording = state.is_recording();
    let control = state.read_control()?;
    let pid = process::read_pid_file(&config.pid_path())?;
    let alive = pid.is_some_and(process::is_alive);

    println!("recording: {}", if recording { "active" } else { "idle" });
    println!(
        "control:   {}",
        control.map(|word| word.as_str()).unwrap_or("-")
    );
    match pid {
        Some(pid) => println!(
            "capture:   pid {} ({})",
            pid,
            if alive { "alive" } else { "dead" }
        ),
        None => println!("capture:   -"),
    }

    if recording && !alive {
        tracing::warn!("Marker is present but no capture process is running");
    }

    Ok(())
}
