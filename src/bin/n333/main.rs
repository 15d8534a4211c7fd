//! n333 - two-oscillator terminal synthesizer
//!
//! Run with: cargo run --release -- [--config synth.toml] [--midi-port 0]

mod app;
mod ui;

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Mutex,
};

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use n333_synth::{config::SynthConfig, params::PlaybackMode};
use tracing_subscriber::EnvFilter;

use app::App;

#[derive(Parser, Debug)]
#[command(name = "n333")]
#[command(about = "Two-oscillator polyphonic synthesizer for the terminal")]
#[command(version)]
struct Args {
    /// TOML file with startup parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// MIDI input port index (see --list-midi)
    #[arg(long)]
    midi_port: Option<usize>,

    /// List MIDI input ports and exit
    #[arg(long)]
    list_midi: bool,

    /// Where log output goes; the terminal belongs to the UI
    #[arg(long, default_value = "n333.log")]
    log_file: PathBuf,

    /// Start in monophonic mode
    #[arg(long)]
    mono: bool,
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let args = Args::parse();

    if args.list_midi {
        return list_midi();
    }

    init_logging(&args.log_file)?;

    let mut config = match &args.config {
        Some(path) => SynthConfig::load(path)
            .wrap_err_with(|| format!("failed to load {}", path.display()))?,
        None => SynthConfig::default(),
    };
    if args.mono {
        config.mode = PlaybackMode::Monophonic;
    }

    let app = App::new(&config, args.midi_port)?;

    let terminal = ratatui::init();
    let res = app.run(terminal);
    ratatui::restore();
    res
}

fn init_logging(path: &Path) -> EyreResult<()> {
    let file = File::create(path)
        .wrap_err_with(|| format!("failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "n333_synth=info,n333=info".into()),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[cfg(feature = "midi-io")]
fn list_midi() -> EyreResult<()> {
    let ports = n333_synth::io::port::list_ports()?;
    if ports.is_empty() {
        println!("No MIDI input ports found");
    }
    for port in ports {
        println!("{:>3}  {}", port.index, port.name);
    }
    Ok(())
}

#[cfg(not(feature = "midi-io"))]
fn list_midi() -> EyreResult<()> {
    println!("Built without MIDI support (feature `midi-io`)");
    Ok(())
}
