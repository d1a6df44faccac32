use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use numsynth::{DatasetWriter, FontPool, GeneratorConfig, generate_dataset};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Renders random numbers into template regions and writes images, debug
/// overlays and labels.
#[derive(Parser, Debug)]
#[command(name = "numsynth", version)]
struct Args {
    /// Clean template image
    #[arg(long, default_value = "input.png")]
    template: PathBuf,

    /// Directory with .ttf/.otf/.ttc fonts
    #[arg(long)]
    fonts: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    out: Option<PathBuf>,

    /// Number of samples; asked on stdin when omitted
    #[arg(short = 'n', long)]
    samples: Option<u32>,

    /// Run seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// JSON config with canvas, regions and fitting options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use this font for every field
    #[arg(long)]
    font_file: Option<PathBuf>,

    /// Fail instead of pasting text that overflows its box
    #[arg(long)]
    strict_fit: bool,

    /// Also write manifest.jsonl
    #[arg(long)]
    manifest: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let fallback_filter = format!("{}={default_level}", env!("CARGO_CRATE_NAME"));
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(&args)?;
    config.validate().context("invalid configuration")?;

    let count = match args.samples {
        Some(n) => n,
        None => prompt_sample_count()?,
    };

    let template = image::open(&args.template)
        .with_context(|| format!("cannot open template {}", args.template.display()))?;
    let pool = FontPool::load(&config.font_dir, config.fallback_font.as_deref());
    for name in pool.names() {
        debug!(font = name, "pool font");
    }

    let mut writer = DatasetWriter::create(&config.out_dir, config.write_manifest)
        .with_context(|| format!("cannot prepare {}", config.out_dir.display()))?;
    let summary = generate_dataset(&config, &pool, &template, count, &mut writer)?;

    info!(
        seed = summary.seed,
        overflowed = summary.overflowed_fields,
        "generated {} samples in {}",
        summary.samples,
        config.out_dir.display()
    );
    Ok(())
}

/// File values first, then any flags given on the command line.
fn load_config(args: &Args) -> Result<GeneratorConfig> {
    let mut config = match &args.config {
        Some(path) => GeneratorConfig::from_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(dir) = &args.fonts {
        config.font_dir = dir.clone();
    }
    if let Some(out) = &args.out {
        config.out_dir = out.clone();
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.font_file.is_some() {
        config.font_file = args.font_file.clone();
    }
    config.strict_fit |= args.strict_fit;
    config.write_manifest |= args.manifest;
    Ok(config)
}

fn prompt_sample_count() -> Result<u32> {
    print!("Enter N-Sample: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    line.trim()
        .parse()
        .with_context(|| format!("not a sample count: {:?}", line.trim()))
}
