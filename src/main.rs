use anyhow::{Context, Result};
use clap::Parser;
use deckplay::audio::available_outputs;
use deckplay::catalog::Catalog;
use deckplay::config::{self, PlayerConfig};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Plays a folder of audio tracks paired with a folder of cover images.
#[derive(Parser, Debug)]
#[command(name = "deckplay")]
#[command(version)]
struct Args {
    /// Folder with the audio files
    #[arg(long, env = "DECKPLAY_MUSIC_DIR")]
    music_dir: Option<PathBuf>,

    /// Folder with one cover image per audio file, in the same sort order
    #[arg(long, env = "DECKPLAY_COVER_DIR")]
    cover_dir: Option<PathBuf>,

    /// Driver tick interval in milliseconds
    #[arg(long = "tick-ms")]
    tick_ms: Option<u64>,

    /// Open the first track paused instead of playing it
    #[arg(long)]
    no_autoplay: bool,

    /// Output device name (see --list-outputs)
    #[arg(long)]
    output_device: Option<String>,

    /// Keep time without producing sound
    #[arg(long)]
    simulated_output: bool,

    /// Print the catalog and exit
    #[arg(long)]
    list: bool,

    /// Print the available output devices and exit
    #[arg(long)]
    list_outputs: bool,

    /// Save the effective configuration and exit
    #[arg(long)]
    write_config: bool,
}

impl Args {
    fn apply(&self, config: &mut PlayerConfig) {
        if let Some(dir) = &self.music_dir {
            config.music_dir = dir.clone();
        }
        if let Some(dir) = &self.cover_dir {
            config.cover_dir = dir.clone();
        }
        if let Some(ms) = self.tick_ms {
            config.tick_interval_ms = ms;
        }
        if self.no_autoplay {
            config.autoplay = false;
        }
        if let Some(name) = &self.output_device {
            config.output_device = Some(name.clone());
        }
        if self.simulated_output {
            config.simulated_output = true;
        }
        config.music_dir = config::normalize_path(&config.music_dir);
        config.cover_dir = config::normalize_path(&config.cover_dir);
    }

    fn is_interactive(&self) -> bool {
        !(self.list || self.list_outputs || self.write_config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = config::load_config()?;
    args.apply(&mut config);
    init_tracing(args.is_interactive())?;

    if args.write_config {
        let path = config::save_config(&config)?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    if args.list_outputs {
        for name in available_outputs() {
            println!("{name}");
        }
        return Ok(());
    }

    if args.list {
        let catalog = Catalog::load(&config.music_dir, &config.cover_dir)
            .context("failed to build track catalog")?;
        for (index, track) in catalog.tracks().iter().enumerate() {
            println!(
                "{index:>3}  {}  ({})",
                track.title(),
                track.audio_path.display()
            );
        }
        return Ok(());
    }

    deckplay::app::run(&config)
}

/// The terminal UI owns stdout while playing, so interactive runs log to a file.
fn init_tracing(to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env("DECKPLAY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("deckplay=info"));

    if to_file {
        let path = config::log_path()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}
