// Notesight Command Line Interface
// Detect banknote denominations from photos

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use notesight_eye::announce::{announcement, error_announcement};
use notesight_eye::classifier::{classify_features, fallback_scores, matching_rules};
use notesight_eye::{
    BroadcastSink, ClassificationResult, CurrencyDetector, DetectionEvent, DetectorConfig,
    Denomination, FeatureExtractor, FeatureVector, Frame, ReplaySource,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "notesight")]
#[command(about = "Notesight - Indian banknote denomination detector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one detection over the given photos
    Classify {
        /// Photos replayed as camera frames, one per sample in rotation
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Print the detection report as JSON
        #[arg(long)]
        json: bool,

        /// Samples per detection
        #[arg(long)]
        samples: Option<usize>,

        /// Pause between samples in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Configuration file (JSON or TOML)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// Show the color features and rule matches of a photo
    Features {
        image: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported denominations
    Catalog,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    match cli.command {
        Commands::Classify {
            images,
            json,
            samples,
            delay_ms,
            config,
        } => {
            let config = load_config(config.as_deref(), samples, delay_ms)?;
            classify(&images, config, json).await?;
        }
        Commands::Features { image, json } => {
            show_features(&image, json)?;
        }
        Commands::Catalog => {
            show_catalog();
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// File config, or defaults plus environment, then command-line overrides
fn load_config(
    path: Option<&Path>,
    samples: Option<usize>,
    delay_ms: Option<u64>,
) -> anyhow::Result<DetectorConfig> {
    let mut config = match path {
        Some(path) => DetectorConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => DetectorConfig::from_env(),
    };

    if let Some(samples) = samples {
        config.sample_count = samples;
    }
    if let Some(delay_ms) = delay_ms {
        config.sample_delay_ms = delay_ms;
    }

    debug!("Using config: {:?}", config);
    Ok(config)
}

fn load_frame(path: &Path) -> anyhow::Result<Frame> {
    Frame::open(path).with_context(|| format!("Failed to read image {}", path.display()))
}

/// Run a full detection with the photos as the frame source
async fn classify(images: &[PathBuf], config: DetectorConfig, json: bool) -> anyhow::Result<()> {
    let frames = images
        .iter()
        .map(|path| load_frame(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    info!("Loaded {} frame(s)", frames.len());

    let sink = Arc::new(BroadcastSink::new(config.event_capacity));
    let mut events = sink.subscribe();

    let detector = CurrencyDetector::heuristic(config, sink.clone())?;
    detector.attach_source(Arc::new(ReplaySource::new(frames)?));

    let report = detector.detect(None).await;

    let mut failure = None;
    while let Ok(event) = events.try_recv() {
        if let DetectionEvent::Failed { message, .. } = event {
            failure = Some(message);
        }
    }

    match (report, failure) {
        (Some(report), _) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Detected: {}", report.denomination);
                println!("{}", announcement(Some(report.denomination)));
                print!("Votes:");
                for (denomination, count) in report.tally.iter() {
                    print!(" {}={}", denomination, count);
                }
                println!();
                if report.held_previous {
                    println!("(no clear majority, kept previous result)");
                }
            }
        }
        (None, Some(message)) => {
            error!("Detection failed: {}", message);
            println!("{}", error_announcement(&message));
            std::process::exit(1);
        }
        (None, None) => {
            println!("{}", announcement(None));
            std::process::exit(1);
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct FeatureReport {
    features: FeatureVector,
    matching_rules: Vec<u8>,
    fallback_scores: Vec<(Denomination, f32)>,
    result: ClassificationResult,
}

/// Show what the classifier sees in a single photo
fn show_features(path: &Path, json: bool) -> anyhow::Result<()> {
    let frame = load_frame(path)?;
    let features = FeatureExtractor::default().extract(&frame)?;
    let report = FeatureReport {
        features,
        matching_rules: matching_rules(&features),
        fallback_scores: fallback_scores(&features).to_vec(),
        result: classify_features(&features),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Image: {} ({}x{})", path.display(), frame.width(), frame.height());
    println!(
        "   Mean color:    r={:.1} g={:.1} b={:.1}",
        features.red, features.green, features.blue
    );
    if report.matching_rules.is_empty() {
        println!("   Rules:         none");
    } else {
        let rules: Vec<String> = report.matching_rules.iter().map(|n| n.to_string()).collect();
        println!("   Rules:         {}", rules.join(", "));
    }
    println!("   Fallback:");
    for (denomination, score) in &report.fallback_scores {
        println!("      {:>6}  {:.3}", denomination.to_string(), score);
    }
    println!(
        "   Result:        {} ({:?})",
        report.result.denomination, report.result.source
    );

    Ok(())
}

fn show_catalog() {
    for denomination in Denomination::ALL {
        let note = denomination.note();
        let (width, height) = note.dimensions_mm;
        println!("{} - {}", denomination, note.name);
        println!("   Color:      {}", note.color);
        println!("   Size:       {} x {} mm", width, height);
        println!("   {}", note.description);
        for feature in note.features {
            println!("   - {}", feature);
        }
        println!();
    }
}
