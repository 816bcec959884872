//! Pipeline diagnostics: timing and per-stage metrics.
//!
//! These diagnostics are permanent instrumentation for parameter
//! tuning. [`enhance_with_diagnostics`] runs the same stage chain as
//! [`crate::enhance`] while timing each stage through a caller-supplied
//! [`Clock`], so the crate itself never reads the system time.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mode::EnhancementMode;
use crate::params::ParameterSet;
use crate::pipeline::{Advance, Pipeline, Stage};
use crate::stage::{COLOR_CHANNELS, StageKind};
use crate::types::{EnhancementResult, PipelineError, RawImage};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Time source used to measure stage durations.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// One entry per stage, in execution order.
    pub stages: Vec<StageDiagnostics>,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Whole-image summary.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Which stage these numbers belong to.
    pub stage: StageKind,
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Gaussian smoothing metrics.
    Denoise {
        /// `noise_reduction` value used.
        strength: f32,
        /// Blur sigma derived from the strength.
        sigma: f32,
    },
    /// Contrast rescale metrics.
    Contrast {
        /// Contrast multiplier used.
        factor: f32,
        /// Colour samples the rescale pushed onto 0 or 255.
        saturated_samples: u64,
    },
    /// Unsharp mask metrics.
    Sharpen {
        /// Sharpening amount used.
        amount: f32,
        /// Pixels whose colour changed.
        changed_pixels: u64,
    },
}

/// High-level summary for the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Image width in pixels.
    pub image_width: u32,
    /// Image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Label recorded with the result (`"Manual"` or a preset name).
    pub label: String,
    /// Parameters the run used.
    pub params: ParameterSet,
    /// Mean colour sample value of the input.
    pub mean_intensity_before: f64,
    /// Mean colour sample value of the enhanced output.
    pub mean_intensity_after: f64,
    /// Pixels that differ between input and output.
    pub changed_pixels: u64,
}

impl PipelineDiagnostics {
    /// Diagnostics for one stage, if it ran.
    #[must_use]
    pub fn stage(&self, kind: StageKind) -> Option<&StageDiagnostics> {
        self.stages.iter().find(|s| s.stage == kind)
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Enhancement Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)  Mode: {}",
            self.summary.image_width,
            self.summary.image_height,
            self.summary.pixel_count,
            self.summary.label,
        ));
        let p = &self.summary.params;
        lines.push(format!(
            "Params: noise_reduction={:.3} contrast={:.3} sharpness={:.3}",
            p.noise_reduction(),
            p.contrast(),
            p.sharpness(),
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for diag in &self.stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            let name = stage_title(diag.stage);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        #[allow(clippy::cast_precision_loss)]
        let changed_pct = if self.summary.pixel_count > 0 {
            self.summary.changed_pixels as f64 / self.summary.pixel_count as f64 * 100.0
        } else {
            0.0
        };
        lines.push(format!(
            "Mean intensity: {:.1} -> {:.1}  |  Changed pixels: {} ({changed_pct:.1}%)",
            self.summary.mean_intensity_before,
            self.summary.mean_intensity_after,
            self.summary.changed_pixels,
        ));

        lines.join("\n")
    }
}

/// Run the pipeline with manual parameters, collecting diagnostics.
///
/// # Errors
///
/// Returns the same errors as [`crate::enhance`].
pub fn enhance_with_diagnostics<C: Clock>(
    image: &RawImage,
    params: &ParameterSet,
    clock: &C,
) -> Result<(EnhancementResult, PipelineDiagnostics), PipelineError> {
    enhance_mode_with_diagnostics(image, &EnhancementMode::Manual(*params), clock)
}

/// Run the pipeline for `mode`, collecting diagnostics.
///
/// # Errors
///
/// Returns the same errors as [`crate::enhance_mode`].
pub fn enhance_mode_with_diagnostics<C: Clock>(
    image: &RawImage,
    mode: &EnhancementMode,
    clock: &C,
) -> Result<(EnhancementResult, PipelineDiagnostics), PipelineError> {
    let total_start = clock.now();
    let mut stages = Vec::with_capacity(StageKind::ALL.len());

    let mut stage: Stage = Pipeline::from_mode(image.clone(), mode).into();
    loop {
        let start = clock.now();
        match stage.advance()? {
            Advance::Next(next) => {
                let duration = clock.elapsed(&start);
                if let (Some(kind), Some(metrics)) = (next.kind(), next.metrics()) {
                    stages.push(StageDiagnostics {
                        stage: kind,
                        duration,
                        metrics,
                    });
                }
                stage = next;
            }
            Advance::Complete(done) => {
                stage = done;
                break;
            }
        }
    }
    let result = stage.complete()?;
    let total_duration = clock.elapsed(&total_start);

    let dims = result.dimensions();
    let summary = PipelineSummary {
        image_width: dims.width,
        image_height: dims.height,
        pixel_count: dims.pixel_count(),
        label: result.label().to_string(),
        params: *result.params(),
        mean_intensity_before: mean_intensity(result.original()),
        mean_intensity_after: mean_intensity(result.enhanced()),
        changed_pixels: changed_pixels(result.original(), result.enhanced()),
    };

    Ok((
        result,
        PipelineDiagnostics {
            stages,
            total_duration,
            summary,
        },
    ))
}

/// Title-case stage name for the report table.
const fn stage_title(stage: StageKind) -> &'static str {
    match stage {
        StageKind::Denoise => "Denoise",
        StageKind::Contrast => "Contrast",
        StageKind::Sharpen => "Sharpen",
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Denoise { strength, sigma } => {
            format!("strength={strength:.3} sigma={sigma:.2}")
        }
        StageMetrics::Contrast {
            factor,
            saturated_samples,
        } => format!("factor={factor:.2} saturated={saturated_samples}"),
        StageMetrics::Sharpen {
            amount,
            changed_pixels,
        } => format!("amount={amount:.2} changed={changed_pixels}"),
    }
}

/// Count pixels whose colour samples differ between two images of the
/// same geometry. Alpha is ignored.
pub(crate) fn changed_pixels(before: &RawImage, after: &RawImage) -> u64 {
    if before.shares_buffer(after) || before.format() != after.format() {
        return 0;
    }
    let stride = before.format().channels();
    let colour = COLOR_CHANNELS.min(stride);
    before
        .pixels()
        .chunks_exact(stride)
        .zip(after.pixels().chunks_exact(stride))
        .map(|(a, b)| u64::from(a[..colour] != b[..colour]))
        .sum()
}

/// Mean colour sample value (alpha excluded) of an 8-bit image.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean_intensity(image: &RawImage) -> f64 {
    let stride = image.format().channels();
    let colour = COLOR_CHANNELS.min(stride);
    let (sum, count) = image
        .pixels()
        .chunks_exact(stride)
        .flat_map(|px| &px[..colour])
        .fold((0_u64, 0_u64), |(sum, count), &v| (sum + u64::from(v), count + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}
