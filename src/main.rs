//! wordpace - command-line paced reader
//!
//! Minimal presentation layer over the session controller: loads a text
//! file, paces through it at the requested rate, and prints each revealed
//! word. Cue activity is rendered as tracing output (there is no real
//! speech capability on a terminal), which exercises the full provider
//! contract end to end.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{debug, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordpace::{Config, CueHandle, CueProvider, PlaybackState, ReaderEvent, SessionController};

/// Command-line arguments for wordpace
#[derive(Parser, Debug)]
#[command(name = "wordpace")]
#[command(about = "Paced word-reveal reader")]
#[command(version)]
struct Args {
    /// Text file to read
    text_file: PathBuf,

    /// Reading rate in words per minute (clamped to the configured range)
    #[arg(short, long, env = "WORDPACE_RATE")]
    rate: Option<u32>,

    /// Disable speech cues
    #[arg(long)]
    no_audio: bool,

    /// Optional TOML configuration file
    #[arg(short, long, env = "WORDPACE_CONFIG")]
    config: Option<PathBuf>,
}

/// Cue provider that renders cues as log lines.
#[derive(Default)]
struct LogCueProvider {
    next_id: AtomicU64,
}

impl CueProvider for LogCueProvider {
    fn request_cue(&self, word: &str, rate_multiplier: f64) -> CueHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(id, word, rate_multiplier, "speech cue");
        CueHandle::new(id)
    }

    fn cancel_cue(&self, handle: CueHandle) {
        trace!(id = handle.id(), "speech cue cancelled");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordpace=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_toml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let text = std::fs::read_to_string(&args.text_file)
        .with_context(|| format!("Failed to read {}", args.text_file.display()))?;

    let session = SessionController::new(config, Some(Arc::new(LogCueProvider::default())))
        .context("Failed to initialize session")?;

    session.load_text(&text);
    let snapshot = session.snapshot();
    if snapshot.state == PlaybackState::Idle {
        bail!(
            "no words in {}: {}",
            args.text_file.display(),
            session.last_error().unwrap_or_default()
        );
    }
    info!(total_words = snapshot.total_words, "text loaded");

    if let Some(rate) = args.rate {
        session.set_rate(rate);
    }
    if args.no_audio {
        session.set_audio_enabled(false);
    }

    let mut events = session.subscribe();

    // The first word is on display from load; ticks reveal the rest.
    println!("{}", snapshot.current_word.unwrap_or_default());
    session.play();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(ReaderEvent::WordRevealed { word, .. }) => println!("{}", word),
                    Ok(ReaderEvent::StateChanged { new_state: PlaybackState::Finished, snapshot, .. }) => {
                        info!(total_words = snapshot.total_words, "finished");
                        break;
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
            _ = signal::ctrl_c() => {
                session.pause();
                info!("interrupted, pausing");
                break;
            }
        }
    }

    Ok(())
}
