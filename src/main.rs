//! Dropforge CLI - heightfield generation and droplet erosion.
//!
//! Generates a fractal noise heightfield, reshapes it with a smoothing
//! preset, erodes it with simulated water droplets and optionally dumps the
//! result as RAW samples.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use dropforge::erosion::{ErosionParams, Termination};
use dropforge::export::{export_raw, RawExportOptions, RawFormat};
use dropforge::noise::FractalNoiseConfig;
use dropforge::pipeline::{ErosionStage, HeightmapStage, Pipeline, SmoothingStage, StageConfig};
use dropforge::terrain::{Heightfield, SmoothingChain, SmoothingOp};

/// Procedural heightfield generator with droplet erosion.
#[derive(Parser)]
#[command(name = "dropforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and erode a heightfield.
    Generate(GenerateArgs),

    /// Print the effective erosion parameters as JSON.
    Params {
        /// JSON file overriding the default erosion parameters.
        #[arg(long)]
        params: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Grid side length in cells.
    #[arg(long, default_value = "512")]
    size: usize,

    /// Noise seed.
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Noise scale; larger values give broader features.
    #[arg(long, default_value = "2048")]
    scale: f64,

    /// Number of noise octaves.
    #[arg(long, default_value = "12")]
    octaves: u32,

    /// Amplitude decay per octave.
    #[arg(long, default_value = "0.5")]
    persistence: f64,

    /// Frequency multiplier per octave.
    #[arg(long, default_value = "2.0")]
    lacunarity: f64,

    /// Elevation remap applied before erosion.
    #[arg(long, default_value = "rolling-plains")]
    smoothing: SmoothingPreset,

    /// Level used by the plateau and molone presets.
    #[arg(long, default_value = "0.5")]
    level: f64,

    /// Multiplier applied after the smoothing preset.
    #[arg(long, default_value = "256")]
    height_scale: f64,

    /// Number of droplets to simulate (0 skips erosion).
    #[arg(long, default_value = "200000")]
    droplets: u64,

    /// Split the droplet budget into this many passes.
    #[arg(long, default_value = "1")]
    passes: u32,

    /// Droplet spawn seed; defaults to the noise seed.
    #[arg(long)]
    erosion_seed: Option<u64>,

    /// JSON file with erosion parameters.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Lower bound applied to eroded heights.
    #[arg(long, requires = "clamp_max")]
    clamp_min: Option<f64>,

    /// Upper bound applied to eroded heights.
    #[arg(long, requires = "clamp_min")]
    clamp_max: Option<f64>,

    /// Write the final heightfield to this RAW file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// RAW sample format.
    #[arg(short, long, default_value = "r16")]
    format: ExportFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum SmoothingPreset {
    /// Leave the noise as is.
    None,
    /// Flatten lowlands, keep peaks.
    GreatPlains,
    /// Sharpen slopes.
    Cliff,
    /// Flatten around `--level`.
    Plateau,
    /// Terrace away from `--level`.
    Molone,
    /// Blend of great plains with the raw noise.
    RollingPlains,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    /// 16-bit RAW little-endian.
    R16,
    /// 16-bit RAW big-endian.
    R16Be,
    /// 32-bit float RAW.
    R32,
}

impl From<ExportFormat> for RawFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::R16 => RawFormat::R16LittleEndian,
            ExportFormat::R16Be => RawFormat::R16BigEndian,
            ExportFormat::R32 => RawFormat::R32Float,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => run_generate(args),
        Commands::Params { params } => {
            let params = load_params(params.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&params)?);
            Ok(())
        }
    }
}

fn load_params(path: Option<&Path>) -> anyhow::Result<ErosionParams> {
    let params = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => ErosionParams::default(),
    };
    params.validate()?;
    Ok(params)
}

fn smoothing_chain(preset: SmoothingPreset, level: f64, height_scale: f64) -> SmoothingChain {
    let chain = match preset {
        SmoothingPreset::None => SmoothingChain::new(),
        SmoothingPreset::GreatPlains => SmoothingChain::new().then(SmoothingOp::GreatPlains),
        SmoothingPreset::Cliff => SmoothingChain::new().then(SmoothingOp::Cliff),
        SmoothingPreset::Plateau => SmoothingChain::new().then(SmoothingOp::Plateau { level }),
        SmoothingPreset::Molone => SmoothingChain::new().then(SmoothingOp::Molone { level }),
        SmoothingPreset::RollingPlains => {
            SmoothingChain::new().then(SmoothingOp::PlainsBlend { weight: 0.75 })
        }
    };
    if height_scale != 1.0 {
        chain.then(SmoothingOp::Scale { factor: height_scale })
    } else {
        chain
    }
}

fn run_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let noise = FractalNoiseConfig {
        seed: args.seed,
        scale: args.scale,
        octaves: args.octaves,
        persistence: args.persistence,
        lacunarity: args.lacunarity,
    };
    noise.validate()?;
    let params = load_params(args.params.as_deref())?;
    let chain = smoothing_chain(args.smoothing, args.level, args.height_scale);
    chain.validate()?;

    println!("Dropforge - Heightfield Generator");
    println!("=================================");
    println!("Size: {}x{}", args.size, args.size);
    println!("Seed: {}", args.seed);
    println!(
        "Noise: scale={} octaves={} persistence={} lacunarity={}",
        noise.scale, noise.octaves, noise.persistence, noise.lacunarity
    );

    let mut pipeline = Pipeline::new(StageConfig::with_noise(noise));
    pipeline.add_stage(HeightmapStage);
    if !chain.is_identity() {
        pipeline.add_stage(SmoothingStage::new(chain));
    }
    if args.droplets > 0 {
        let mut stage = ErosionStage::new(params, args.droplets, args.erosion_seed.unwrap_or(args.seed))
            .with_passes(args.passes);
        if let (Some(min), Some(max)) = (args.clamp_min, args.clamp_max) {
            stage = stage.with_clamp(min, max);
        }
        println!("Erosion: {} droplets in {} pass(es)", args.droplets, args.passes);
        pipeline.add_stage(stage);
    } else {
        println!("Erosion: SKIPPED");
    }

    let mut grid = Heightfield::new(args.size)?;
    let start = Instant::now();
    let report = pipeline.run_with_callbacks(
        &mut grid,
        |name, i, total| println!("  [{}/{}] Starting: {}", i + 1, total, name),
        |name, i, total| println!("  [{}/{}] Completed: {}", i + 1, total, name),
    )?;
    println!("Generation completed in {:.2?}", start.elapsed());

    let (min_h, max_h) = grid.height_range();
    println!("Height range: [{:.4}, {:.4}]", min_h, max_h);
    println!("Mean height: {:.4}", grid.mean());

    if let Some(stats) = report.erosion() {
        println!();
        println!("Erosion statistics:");
        println!("  Droplets:       {:>10}", stats.droplets);
        println!("  Mean steps:     {:>10.2}", stats.mean_steps());
        println!("  Longest path:   {:>10}", stats.max_steps);
        println!("  Eroded:         {:>10.4}", stats.total_eroded);
        println!("  Deposited:      {:>10.4}", stats.total_deposited);
        println!("  In transit:     {:>10.4}", stats.sediment_in_transit);
        for reason in Termination::ALL {
            println!(
                "  {:<15} {:>10} ({:.1}%)",
                format!("{}:", reason.name()),
                stats.terminations.get(reason),
                stats.percent(reason)
            );
        }
    }
    for stage in &report.stages {
        if let Some(clamp) = stage.clamp {
            println!("Clamped: {} above, {} below", clamp.above, clamp.below);
        }
    }

    if let Some(path) = args.output {
        let options = RawExportOptions::fit(&grid, args.format.into());
        export_raw(&grid, &path, &options)?;
        println!();
        println!("Exported {} ({:?})", path.display(), options.format);
        println!("  Height range mapped: [{:.4}, {:.4}]", options.min_height, options.max_height);
    }

    Ok(())
}
