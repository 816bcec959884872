//! echolift-pipeline: Pure ultrasound scan enhancement pipeline (sans-IO).
//!
//! Enhances a decoded scan through three fixed stages:
//! denoise -> contrast -> sharpen.
//!
//! Parameters come either from a caller-tuned [`ParameterSet`] ("manual
//! mode") or from a named [`Preset`] that resolves to a fixed parameter
//! set ("AI mode"). The result keeps the untouched original next to
//! every stage output, so callers can render a before/after comparison.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! pixel buffers and returns structured data. File decoding, encoding
//! and CLI handling live in `echolift-bench` and `echolift-fade`.

pub mod contrast;
pub mod denoise;
pub mod diagnostics;
pub mod enhancer;
pub mod mode;
pub mod params;
pub mod pipeline;
pub mod preset;
pub mod progress;
pub mod sharpen;
pub mod stage;
pub mod types;

pub use enhancer::{Enhancer, RunState};
pub use mode::EnhancementMode;
pub use params::{ClampAdjustment, Parameter, ParameterSet};
pub use pipeline::Pipeline;
pub use preset::Preset;
pub use progress::{NoProgress, ProgressEvent, ProgressListener, ProgressPhase};
pub use stage::{FilterStage, StageKind};
pub use types::{
    Dimensions, EnhancementResult, PipelineError, PixelFormat, RawImage, RgbImage, RgbaImage,
};

/// Enhance `image` with manual parameters.
///
/// # Pipeline steps
///
/// 1. Validate the input (non-empty, 8-bit RGB or RGBA)
/// 2. Gaussian denoise
/// 3. Contrast rescale around mid-gray
/// 4. Luminance unsharp mask
///
/// # Errors
///
/// Returns [`PipelineError::EmptyImage`] for a zero-dimension image,
/// [`PipelineError::UnsupportedFormat`] for anything but 8-bit RGB/RGBA,
/// and [`PipelineError::StageFailure`] if a stage fails.
pub fn enhance(image: &RawImage, params: &ParameterSet) -> Result<EnhancementResult, PipelineError> {
    Enhancer::new().run(image, params, &mut NoProgress)
}

/// Enhance `image` with a preset.
///
/// # Errors
///
/// Same as [`enhance`].
pub fn enhance_with_preset(
    image: &RawImage,
    preset: Preset,
) -> Result<EnhancementResult, PipelineError> {
    enhance_mode(image, &EnhancementMode::Preset(preset))
}

/// Enhance `image` in whichever mode the caller selected.
///
/// # Errors
///
/// Same as [`enhance`].
pub fn enhance_mode(
    image: &RawImage,
    mode: &EnhancementMode,
) -> Result<EnhancementResult, PipelineError> {
    Enhancer::new().run_mode(image, mode, &mut NoProgress)
}
