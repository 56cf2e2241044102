// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sign_transcriber::config::default_output_dir;
use sign_transcriber::recorder::SessionRecorder;
use sign_transcriber::replay::load_observations;
use sign_transcriber::{RecognitionSession, RecognizerConfig, RecognizerStatus, TemplateClassifier};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Replay recorded hand-landmark sessions through the transcription engine
#[derive(Parser, Debug)]
#[command(name = "sign_transcriber")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a JSON-lines pose recording through the recognizer
    Replay {
        /// Recording, one pose observation per line
        #[arg(short, long)]
        input: PathBuf,

        /// Label templates for the nearest-template classifier
        #[arg(short, long)]
        templates: PathBuf,

        /// Recognizer config (JSON); defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Export frames/transcript CSV and an HTML report (defaults to ~/Documents/SignTranscriber)
        #[arg(short, long, num_args = 0..=1)]
        export: Option<Option<PathBuf>>,

        /// Pace frames by their recorded timestamps
        #[arg(long)]
        realtime: bool,
    },

    /// Print or write the default recognizer config
    DefaultConfig {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("sign_transcriber=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Replay {
            input,
            templates,
            config,
            export,
            realtime,
        } => replay(input, templates, config, export, realtime).await,
        Commands::DefaultConfig { output } => {
            let config = RecognizerConfig::default();
            match output {
                Some(path) => {
                    config.save(&path)?;
                    println!("Wrote default config to {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&config)?),
            }
            Ok(())
        }
    }
}

async fn replay(
    input: PathBuf,
    templates: PathBuf,
    config: Option<PathBuf>,
    export: Option<Option<PathBuf>>,
    realtime: bool,
) -> Result<()> {
    let config = match config {
        Some(path) => RecognizerConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RecognizerConfig::default(),
    };

    let classifier = TemplateClassifier::load(&templates, config.features_per_frame)?;
    let labels = classifier.labels();
    let observations = load_observations(&input)?;
    tracing::info!(frames = observations.len(), labels = labels.len(), "Loaded recording");

    let (mut session, mut events) = RecognitionSession::start(&config, labels, Arc::new(classifier))?;
    let mut recorder = export.as_ref().map(|dir| {
        let dir = dir.clone().unwrap_or_else(default_output_dir);
        SessionRecorder::new(dir, None)
    });

    let mut previous_ts = None;
    for observation in &observations {
        if realtime {
            if let Some(previous) = previous_ts {
                let delta = observation.timestamp_ms.saturating_sub(previous);
                tokio::time::sleep(Duration::from_millis(delta)).await;
            }
            previous_ts = Some(observation.timestamp_ms);
        } else {
            // Give the worker a chance to run between frames.
            tokio::task::yield_now().await;
        }

        let outcome = session.ingest(observation)?;
        if let Some(recorder) = recorder.as_mut() {
            recorder.add_frame(outcome.diagnostics);
        }
    }

    let stats = session.stats();
    if let RecognizerStatus::Unavailable(reason) = session.status() {
        tracing::warn!(%reason, "Classifier became unavailable during replay");
    }
    let transcript = session.shutdown().await?;

    while let Ok(event) = events.try_recv() {
        if let Some(recorder) = recorder.as_mut() {
            recorder.add_event(event);
        }
    }

    println!("Frames:      {}", stats.frames);
    println!("Dispatched:  {} ({} superseded)", stats.dispatched, stats.superseded);
    println!("Transcript:  {}", transcript);

    if let Some(mut recorder) = recorder {
        recorder.set_final_transcript(transcript);
        let dir = recorder.export_csv()?;
        let report = recorder.generate_report()?;
        println!("Exported session to {} (report: {})", dir.display(), report.display());
    }

    Ok(())
}
