//! echolift-bench: CLI tool for enhancement parameter experimentation and diagnostics.
//!
//! Decodes a scan, runs the enhancement pipeline with configurable
//! parameters and prints per-stage diagnostics. Useful for:
//!
//! - Comparing presets against hand-tuned parameters
//! - Measuring per-stage durations on large scans
//! - Seeing how many samples contrast saturates or sharpen touches
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin echolift-bench -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::{Duration, Instant};

use clap::Parser;
use echolift_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use echolift_pipeline::{EnhancementMode, ParameterSet, Preset, RawImage, StageKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Enhancement parameter experimentation and diagnostics for echolift.
///
/// Runs the enhancement pipeline on a given scan with configurable
/// parameters and prints per-stage timing and sample-count diagnostics.
#[derive(Parser)]
#[command(name = "echolift-bench", version)]
struct Cli {
    /// Path to the input scan (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Run a preset instead of manual parameters ("standard",
    /// "strong-denoise", "edge-focus").
    #[arg(long, value_parser = Preset::from_str)]
    preset: Option<Preset>,

    /// Denoise strength (0.0-1.0) [default: 0.2].
    #[arg(long)]
    noise_reduction: Option<f32>,

    /// Contrast factor (0.5-2.0).
    #[arg(long, default_value_t = ParameterSet::DEFAULT.contrast())]
    contrast: f32,

    /// Sharpen amount (0.0-2.0).
    #[arg(long, default_value_t = ParameterSet::DEFAULT.sharpness())]
    sharpness: f32,

    /// Convert scans the pipeline cannot enhance directly (grayscale,
    /// 16-bit, float) to 8-bit RGBA before running.
    #[arg(long)]
    convert_rgba: bool,

    /// Write the enhanced scan to file (format from extension).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full enhancement mode as a JSON string.
    ///
    /// When provided, `--preset` and the parameter flags are ignored.
    /// The JSON must be a valid `EnhancementMode` serialization, e.g.
    /// `{"preset":"edge-focus"}`.
    #[arg(long)]
    config_json: Option<String>,
}

/// Build an [`EnhancementMode`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// other mode flags are ignored. Otherwise `--preset` wins over the
/// individual parameter flags.
fn mode_from_cli(cli: &Cli) -> Result<EnhancementMode, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    if let Some(preset) = cli.preset {
        return Ok(EnhancementMode::Preset(preset));
    }

    if let Some(warning) = noise_reduction_warning(cli) {
        eprintln!("Warning: {warning}");
    }
    // Out-of-domain values are clamped and logged by the pipeline.
    Ok(EnhancementMode::Manual(ParameterSet::new(
        cli.noise_reduction.unwrap_or(ParameterSet::DEFAULT.noise_reduction()),
        cli.contrast,
        cli.sharpness,
    )))
}

/// Warning for an explicit `--noise-reduction` above the recommended
/// range. The built-in default never triggers it.
fn noise_reduction_warning(cli: &Cli) -> Option<&'static str> {
    let requested = cli.noise_reduction?;
    let params = ParameterSet::new(requested, cli.contrast, cli.sharpness);
    (!params.within_recommended_range())
        .then_some("noise reduction above the recommended range may blur fine detail")
}

/// Decode the scan at `path`, optionally widening it to 8-bit RGBA.
fn load_scan(path: &Path, convert_rgba: bool) -> Result<RawImage, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    eprintln!("Image: {} ({} bytes)", path.display(), bytes.len());

    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| format!("Error decoding {}: {e}", path.display()))?;
    let enhanceable = matches!(
        decoded,
        image::DynamicImage::ImageRgb8(_) | image::DynamicImage::ImageRgba8(_)
    );
    if convert_rgba && !enhanceable {
        info!(color = ?decoded.color(), "converting scan to rgba8");
        return Ok(RawImage::from(decoded.to_rgba8()));
    }
    Ok(RawImage::from(decoded))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mode = match mode_from_cli(&cli) {
        Ok(m) => m,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let scan = match load_scan(&cli.image_path, cli.convert_rgba) {
        Ok(scan) => scan,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Mode: {mode:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match echolift_pipeline::diagnostics::enhance_mode_with_diagnostics(&scan, &mode, &StdClock)
        {
            Ok((result, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                // Write the enhanced scan on the first run only.
                if run == 0
                    && let Some(ref output) = cli.output
                {
                    let saved = result
                        .enhanced()
                        .to_dynamic()
                        .map_err(|e| e.to_string())
                        .and_then(|img| img.save(output).map_err(|e| e.to_string()));
                    match saved {
                        Ok(()) => eprintln!("Enhanced scan written to {}", output.display()),
                        Err(e) => {
                            eprintln!("Error writing {}: {e}", output.display());
                        }
                    }
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&PipelineDiagnostics) -> Option<Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    debug_assert!(!all_diagnostics.is_empty(), "no diagnostics to summarize");

    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-stage means.
    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Denoise", |d| d.stage(StageKind::Denoise).map(|s| s.duration)),
        ("Contrast", |d| d.stage(StageKind::Contrast).map(|s| s.duration)),
        ("Sharpen", |d| d.stage(StageKind::Sharpen).map(|s| s.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
