//! polyrobin - play step patterns through the default output device
//!
//! Run with:
//!   cargo run -- --track "kick=0 1 2 3" --track "hihat,rim=@offbeat" --seconds 8

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use polyrobin::graph::EffectParams;
use polyrobin::io::{CpalSink, SampleBank, SampleLibrary};
use polyrobin::runtime::Runtime;
use polyrobin::sequencing::presets;
use polyrobin::{EngineConfig, TransportController};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polyrobin")]
#[command(about = "Step-sequencer rhythm engine", long_about = None)]
struct Cli {
    /// Tempo in beats per minute
    #[arg(short, long, default_value = "120")]
    bpm: f64,

    /// How long to play, in seconds
    #[arg(short, long, default_value = "8.0")]
    seconds: f32,

    /// Track as `samples=pattern`, e.g. `kick,snare=0 1 2 3`. Prefix the
    /// pattern with `@` to use a preset (`hihat=@offbeat`). Repeatable.
    #[arg(short, long = "track")]
    tracks: Vec<String>,

    /// Load a WAV file as a named sample: `name=path.wav`. Repeatable.
    #[arg(long = "sample")]
    samples: Vec<String>,

    /// Directory holding the default kit (bd.wav, sd.wav, 1.wav ...)
    #[arg(long)]
    samples_dir: Option<PathBuf>,

    /// Per-track division: `track=n`. Repeatable.
    #[arg(short, long = "division")]
    divisions: Vec<String>,

    /// Per-track effect: `track=name`. Repeatable.
    #[arg(short, long = "effect")]
    effects: Vec<String>,

    /// Print the pattern presets and exit
    #[arg(long)]
    list_presets: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if cli.list_presets {
        for (name, text) in presets::PRESETS {
            println!("{:<16} {}", name, text);
        }
        return Ok(());
    }

    let mut bank = SampleBank::new();
    bank.preload_defaults(cli.samples_dir.as_deref());
    for spec in &cli.samples {
        let (name, path) = split_pair(spec, "--sample")?;
        bank.load_sample(name, &PathBuf::from(path));
    }

    let config = EngineConfig {
        default_bpm: cli.bpm,
        ..EngineConfig::default()
    };
    let mut engine = TransportController::new(
        config,
        Box::new(CpalSink::new(bank.clone())),
        Box::new(bank),
    );
    engine.init();

    if engine.is_degraded() {
        info!("Running without audio output");
    }

    for (index, spec) in cli.tracks.iter().enumerate() {
        let (samples, pattern) = split_pair(spec, "--track")?;
        let pattern = match pattern.strip_prefix('@') {
            Some(name) => presets::get(name).ok_or_else(|| eyre!("unknown preset: {}", name))?,
            None => pattern,
        };

        for sample in samples.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            engine
                .add_sample(index, sample)
                .wrap_err_with(|| format!("adding {} to track {}", sample, index))?;
        }
        engine.set_pattern(index, pattern)?;
    }

    for spec in &cli.divisions {
        let (track, division) = split_pair(spec, "--division")?;
        let track: usize = track.parse().wrap_err("track index")?;
        let division: u32 = division.parse().wrap_err("division")?;
        engine.set_division(track, division)?;
    }

    for spec in &cli.effects {
        let (track, name) = split_pair(spec, "--effect")?;
        let track: usize = track.parse().wrap_err("track index")?;
        engine.apply_effect_named(track, name, EffectParams::new())?;
    }

    info!(
        bpm = cli.bpm,
        tracks = cli.tracks.len(),
        samples = engine.available_samples().len(),
        "Starting playback"
    );

    let mut runtime = Runtime::spawn(engine, Duration::from_millis(1)).wrap_err("starting clock thread")?;
    runtime.with_engine(|engine| engine.start_global())?;

    thread::sleep(Duration::from_secs_f32(cli.seconds.max(0.0)));

    runtime.with_engine(|engine| engine.stop_global())?;
    runtime.shutdown();
    info!("Done");
    Ok(())
}

fn split_pair<'a>(spec: &'a str, flag: &str) -> Result<(&'a str, &'a str)> {
    spec.split_once('=')
        .map(|(left, right)| (left.trim(), right.trim()))
        .ok_or_else(|| eyre!("{} expects key=value, got {:?}", flag, spec))
}
