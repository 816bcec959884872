//! Generate a before/after comparison image: the original scan on one
//! side, the enhanced scan on the other, either split at a slider
//! position or blended along a smooth linear fade.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, ValueEnum};
use echolift_pipeline::{EnhancementMode, Preset, RawImage};
use image::{Rgba, RgbaImage};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Generate a before/after comparison image from an enhancement run.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input scan path.
    input: PathBuf,

    /// Output image path (PNG recommended).
    #[arg(short, long)]
    output: PathBuf,

    /// Enhance with this preset ("standard", "strong-denoise", "edge-focus").
    ///
    /// Without `--preset` or `--config-json` the default manual
    /// parameters are used.
    #[arg(long, value_parser = Preset::from_str)]
    preset: Option<Preset>,

    /// Full enhancement mode as a JSON string. Overrides `--preset`.
    #[arg(long)]
    config_json: Option<String>,

    /// How the two halves are combined.
    #[arg(long, value_enum, default_value_t = Style::Split)]
    style: Style,

    /// Slider position as a percentage of image width (split style).
    /// Everything left of it shows the original.
    #[arg(long, value_name = "PCT", default_value_t = 50.0)]
    split: f64,

    /// Width in pixels of the divider drawn at the split (0 disables).
    #[arg(long, value_name = "PX", default_value_t = 2)]
    divider_width: u32,

    /// Center point of the fade gradient as "X,Y" percentages of image
    /// width and height (fade style).
    #[arg(long, value_name = "X,Y", default_value = "50,50")]
    fade_center: String,

    /// Clockwise rotation of the fade gradient direction in degrees.
    /// 0 = horizontal left-to-right, 90 = top-to-bottom.
    #[arg(long, value_name = "DEG", default_value_t = 0.0)]
    fade_angle: f64,
}

/// Comparison rendering style.
#[derive(Clone, Copy, ValueEnum)]
enum Style {
    /// Hard split at the slider position, like a comparison slider.
    Split,
    /// Smooth directional blend from original to enhanced.
    Fade,
}

/// Pick the enhancement mode from `--config-json`, then `--preset`.
fn mode_from_args(args: &Args) -> Result<EnhancementMode, String> {
    if let Some(ref json) = args.config_json {
        return serde_json::from_str(json).map_err(|e| format!("--config-json: {e}"));
    }
    Ok(args
        .preset
        .map_or_else(EnhancementMode::default, EnhancementMode::Preset))
}

// ---------------------------------------------------------------------------
// Split comparison
// ---------------------------------------------------------------------------

/// Where the original ends and the enhanced scan begins.
struct SplitParams {
    /// Slider position as a fraction (0.0–1.0) of image width.
    position: f64,
    /// Divider width in pixels.
    divider_width: u32,
}

impl SplitParams {
    /// Parse `--split` (percentage) and `--divider-width`.
    fn parse(split_pct: f64, divider_width: u32) -> Result<Self, String> {
        if !(0.0..=100.0).contains(&split_pct) {
            return Err(format!("split must be within 0-100, got {split_pct}"));
        }
        Ok(Self {
            position: split_pct / 100.0,
            divider_width,
        })
    }

    /// First column showing the enhanced scan.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn boundary(&self, width: u32) -> u32 {
        (self.position * f64::from(width)).round() as u32
    }
}

/// Divider colour drawn over the split boundary.
const DIVIDER: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Original left of the slider, enhanced right of it, with an optional
/// divider centred on the boundary.
fn split_images(original: &RgbaImage, enhanced: &RgbaImage, split: &SplitParams) -> RgbaImage {
    let (width, height) = original.dimensions();
    let boundary = split.boundary(width);
    let half = split.divider_width / 2;
    let divider = boundary.saturating_sub(half)
        ..boundary
            .saturating_add(split.divider_width - half)
            .min(width);

    RgbaImage::from_fn(width, height, |x, y| {
        if divider.contains(&x) {
            DIVIDER
        } else if x < boundary {
            *original.get_pixel(x, y)
        } else {
            *enhanced.get_pixel(x, y)
        }
    })
}

// ---------------------------------------------------------------------------
// Fade comparison
// ---------------------------------------------------------------------------

/// Controls the direction, position, and orientation of the blend gradient.
struct FadeParams {
    /// Center of the fade as fractions (0.0–1.0) of image width / height.
    center_x: f64,
    center_y: f64,
    /// Clockwise rotation angle in radians.
    angle_rad: f64,
}

impl FadeParams {
    /// Parse `--fade-center "X,Y"` (percentages) and `--fade-angle` (degrees).
    fn parse(center: &str, angle_deg: f64) -> Result<Self, String> {
        let (x_str, y_str) = center
            .split_once(',')
            .ok_or_else(|| format!("fade-center must be 'X,Y', got: '{center}'"))?;

        let x_pct: f64 = x_str
            .trim()
            .parse()
            .map_err(|e| format!("invalid fade-center X '{x_str}': {e}"))?;
        let y_pct: f64 = y_str
            .trim()
            .parse()
            .map_err(|e| format!("invalid fade-center Y '{y_str}': {e}"))?;

        Ok(Self {
            center_x: x_pct / 100.0,
            center_y: y_pct / 100.0,
            angle_rad: angle_deg.to_radians(),
        })
    }
}

/// Blend two RGBA images along a directed linear gradient.
///
/// The gradient is centred on `fade.center_x/y` (as fractions of the image
/// dimensions) and rotated by `fade.angle_rad` clockwise. `t = 0.5` falls
/// exactly on the centre point; the gradient extends symmetrically to the
/// farthest image corner in each direction.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend_images(original: &RgbaImage, enhanced: &RgbaImage, fade: &FadeParams) -> RgbaImage {
    let (width, height) = original.dimensions();

    let w = f64::from(width);
    let h = f64::from(height);
    let cx = fade.center_x * w;
    let cy = fade.center_y * h;
    let (sin_a, cos_a) = fade.angle_rad.sin_cos();

    let half_extent = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
        .into_iter()
        .map(|(x, y): (f64, f64)| (x - cx).mul_add(cos_a, (y - cy) * sin_a).abs())
        .fold(0.0, f64::max);
    let inv_extent = if half_extent > f64::EPSILON {
        0.5 / half_extent
    } else {
        0.0
    };

    RgbaImage::from_fn(width, height, |x, y| {
        let proj = (f64::from(x) - cx).mul_add(cos_a, (f64::from(y) - cy) * sin_a);
        let t = proj.mul_add(inv_extent, 0.5).clamp(0.0, 1.0);

        let before = original.get_pixel(x, y);
        let after = enhanced.get_pixel(x, y);
        Rgba(std::array::from_fn(|c| {
            let val = f64::from(before[c]).mul_add(1.0 - t, f64::from(after[c]) * t);
            val.round().clamp(0.0, 255.0) as u8
        }))
    })
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Widen a pipeline image to RGBA for compositing.
fn to_rgba(image: &RawImage) -> Result<RgbaImage, echolift_pipeline::PipelineError> {
    image.to_dynamic().map(|d| d.to_rgba8())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mode = mode_from_args(&args)?;

    eprintln!("Reading scan from {}", args.input.display());
    let decoded = image::open(&args.input)?;
    let scan = match decoded {
        image::DynamicImage::ImageRgb8(_) | image::DynamicImage::ImageRgba8(_) => {
            RawImage::from(decoded)
        }
        other => {
            info!(color = ?other.color(), "converting scan to rgba8");
            RawImage::from(other.to_rgba8())
        }
    };

    eprintln!("Enhancing with {} mode...", mode.label());
    let result = echolift_pipeline::enhance_mode(&scan, &mode)?;
    let (before, after) = result.into_comparison();
    let (before, after) = (to_rgba(&before)?, to_rgba(&after)?);

    let composed = match args.style {
        Style::Split => {
            let split = SplitParams::parse(args.split, args.divider_width)
                .map_err(|e| format!("--split: {e}"))?;
            eprintln!(
                "Split at {:.0}%, divider: {}px",
                split.position * 100.0,
                split.divider_width,
            );
            split_images(&before, &after, &split)
        }
        Style::Fade => {
            let fade = FadeParams::parse(&args.fade_center, args.fade_angle)
                .map_err(|e| format!("--fade-center / --fade-angle: {e}"))?;
            eprintln!(
                "Fade center: ({:.0}%, {:.0}%), angle: {:.1}°",
                fade.center_x * 100.0,
                fade.center_y * 100.0,
                args.fade_angle,
            );
            blend_images(&before, &after, &fade)
        }
    };

    eprintln!("Saving to {}", args.output.display());
    composed.save(&args.output)?;

    eprintln!("Done.");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn solid(value: u8) -> RgbaImage {
        RgbaImage::from_pixel(10, 4, Rgba([value, value, value, 255]))
    }

    #[test]
    fn split_without_divider_switches_at_boundary() {
        let split = SplitParams::parse(30.0, 0).unwrap();
        let out = split_images(&solid(0), &solid(200), &split);
        assert_eq!(out.get_pixel(2, 1)[0], 0);
        assert_eq!(out.get_pixel(3, 1)[0], 200);
        assert_eq!(out.get_pixel(9, 3)[0], 200);
    }

    #[test]
    fn split_divider_covers_boundary() {
        let split = SplitParams::parse(50.0, 2).unwrap();
        let out = split_images(&solid(0), &solid(200), &split);
        assert_eq!(out.get_pixel(3, 0)[0], 0);
        assert_eq!(*out.get_pixel(4, 0), DIVIDER);
        assert_eq!(*out.get_pixel(5, 0), DIVIDER);
        assert_eq!(out.get_pixel(6, 0)[0], 200);
    }

    #[test]
    fn split_at_edges_shows_one_side() {
        let all_enhanced = split_images(&solid(0), &solid(200), &SplitParams::parse(0.0, 0).unwrap());
        assert!(all_enhanced.pixels().all(|p| p[0] == 200));
        let all_original =
            split_images(&solid(0), &solid(200), &SplitParams::parse(100.0, 0).unwrap());
        assert!(all_original.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn split_out_of_range_rejected() {
        assert!(SplitParams::parse(-1.0, 0).is_err());
        assert!(SplitParams::parse(100.5, 0).is_err());
    }

    #[test]
    fn fade_runs_from_original_to_enhanced() {
        let fade = FadeParams::parse("50,50", 0.0).unwrap();
        let out = blend_images(&solid(0), &solid(200), &fade);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        let row: Vec<u8> = (0..10).map(|x| out.get_pixel(x, 2)[0]).collect();
        assert!(row.windows(2).all(|w| w[0] <= w[1]));
        assert!(row[9] > 150);
        assert_eq!(out.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn fade_center_must_be_pair() {
        assert!(FadeParams::parse("50", 0.0).is_err());
        assert!(FadeParams::parse("a,50", 0.0).is_err());
    }

    #[test]
    fn mode_defaults_to_manual() {
        let args = Args::try_parse_from(["echolift-fade", "in.png", "-o", "out.png"]).unwrap();
        assert_eq!(mode_from_args(&args).unwrap(), EnhancementMode::default());
    }

    #[test]
    fn preset_accepts_display_names() {
        let args = Args::try_parse_from([
            "echolift-fade",
            "in.png",
            "-o",
            "out.png",
            "--preset",
            "Edge Focus",
        ])
        .unwrap();
        assert_eq!(
            mode_from_args(&args).unwrap(),
            EnhancementMode::Preset(Preset::EdgeFocus)
        );
    }

    #[test]
    fn unknown_preset_rejected() {
        assert!(
            Args::try_parse_from([
                "echolift-fade",
                "in.png",
                "-o",
                "out.png",
                "--preset",
                "turbo",
            ])
            .is_err()
        );
    }
}
