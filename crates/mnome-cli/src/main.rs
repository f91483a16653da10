//! mnome - Console metronome
//!
//! Reads commands like `start`, `bpm 120` or `pattern *++` from stdin and
//! clicks along on the default sound device.

mod audio;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use mnome_core::{AudioSink, ChannelSink, Config, Metronome, NullSink, ShutdownHandle};

#[derive(Parser)]
#[command(name = "mnome")]
#[command(author, version, about = "Console metronome", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path (default: ~/.config/mnome/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Beats per minute (1-1000)
    #[arg(short, long)]
    bpm: Option<u32>,

    /// Accent pattern, '*' for accented and '+' for normal beats
    #[arg(short, long)]
    pattern: Option<String>,

    /// Run without a sound device
    #[arg(long)]
    no_audio: bool,

    /// Output device name
    #[arg(short, long)]
    device: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration file
    Init,
    /// Show the configuration file path
    ConfigPath,
    /// List available audio output devices
    ListDevices,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init) => {
            let path = Config::create_default_config_file()?;
            println!("Created default config at: {}", path.display());
            return Ok(());
        }
        Some(Commands::ConfigPath) => {
            let path = Config::config_path()?;
            println!("{}", path.display());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            let devices = audio::list_output_devices()?;
            if devices.is_empty() {
                println!("No audio output devices found");
            } else {
                println!("Available audio output devices:");
                for (name, is_default) in devices {
                    let marker = if is_default { " (default)" } else { "" };
                    println!("  {}{}", name, marker);
                }
            }
            return Ok(());
        }
        None => {}
    }

    // Load config
    let mut config = if let Some(path) = &cli.config {
        Config::load_from(path).with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        Config::load_or_default()
    };

    // Apply CLI overrides
    if let Some(bpm) = cli.bpm {
        config.player.bpm = bpm;
    }
    if let Some(pattern) = cli.pattern {
        config.player.pattern = pattern;
    }
    if cli.no_audio {
        config.audio.enabled = false;
    }
    if cli.device.is_some() {
        config.audio.device = cli.device;
    }
    config.validate()?;

    run(config)
}

fn run(config: Config) -> Result<()> {
    // `_output` keeps the stream alive until the metronome is done
    let (sink, sample_rate, _output): (Arc<dyn AudioSink>, u32, _) = if config.audio.enabled {
        let (sink, frames) = ChannelSink::bounded(config.audio.queue_frames);
        match audio::open_output(config.audio.device.as_deref(), frames) {
            Ok(output) => {
                log::info!("Audio: {} at {} Hz", output.device_name(), output.sample_rate());
                (Arc::new(sink), output.sample_rate(), Some(output))
            }
            Err(e) => {
                log::warn!("Audio output unavailable, running silently: {:#}", e);
                (Arc::new(NullSink), config.player.sample_rate, None)
            }
        }
    } else {
        (Arc::new(NullSink), config.player.sample_rate, None)
    };

    let app = Metronome::new(&config, sink, sample_rate)?;
    spawn_signal_handler(app.shutdown_handle())?;

    println!("mnome - type 'help' for a list of commands");
    app.start()?;
    app.wait_for_stop()?;
    Ok(())
}

/// First SIGINT/SIGTERM shuts down; a second one exits right away.
fn spawn_signal_handler(handle: ShutdownHandle) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handler")?;
    thread::Builder::new()
        .name("mnome-signals".to_string())
        .spawn(move || {
            for (count, signal) in signals.forever().enumerate() {
                if count == 0 {
                    log::info!("Received signal {}, shutting down (press Enter to leave)", signal);
                    handle.shutdown();
                } else {
                    std::process::exit(130);
                }
            }
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}
