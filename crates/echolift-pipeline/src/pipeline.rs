//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! ```rust
//! # use echolift_pipeline::{Pipeline, ParameterSet, PipelineError, RawImage, RgbImage};
//! # fn run() -> Result<(), PipelineError> {
//! let scan = RawImage::from(RgbImage::from_pixel(8, 8, image::Rgb([90, 90, 90])));
//! let result = Pipeline::new(scan, ParameterSet::default())
//!     .denoise()?
//!     .adjust_contrast()?
//!     .sharpen()?
//!     .into_result();
//! assert_eq!(result.label(), "Manual");
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state,
//! carrying the original image and every earlier intermediate. Because
//! [`RawImage`] buffers are reference counted, carrying them forward
//! costs nothing beyond the buffers each stage allocates.
//!
//! [`Pending::denoise`] validates the input before any stage runs, so an
//! empty or wrongly formatted image surfaces as
//! [`PipelineError::EmptyImage`] or [`PipelineError::UnsupportedFormat`].
//! Errors raised by a stage after that are wrapped in
//! [`PipelineError::StageFailure`] naming the stage.

use tracing::debug;

use crate::diagnostics::{StageMetrics, changed_pixels};
use crate::mode::{EnhancementMode, MANUAL_LABEL};
use crate::params::ParameterSet;
use crate::stage::{FilterStage, StageKind, check_input};
use crate::types::{EnhancementResult, PipelineError, RawImage};

/// Run one stage against `image`, tagging any failure with the stage.
fn run_stage(
    stage: StageKind,
    image: &RawImage,
    params: &ParameterSet,
) -> Result<RawImage, PipelineError> {
    let param = stage.value_in(params);
    debug!(stage = stage.name(), param, "applying stage");
    stage
        .apply(image, param)
        .map_err(|source| PipelineError::StageFailure {
            stage,
            source: Box::new(source),
        })
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`denoise`](Self::denoise) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing, call .denoise() to continue"]
pub struct Pending {
    original: RawImage,
    params: ParameterSet,
    label: &'static str,
}

impl Pending {
    /// The input image.
    #[must_use]
    pub const fn original(&self) -> &RawImage {
        &self.original
    }

    /// The parameters this run will use.
    #[must_use]
    pub const fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// The label recorded with the result.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Check that the input can be enhanced without running any stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyImage`] or
    /// [`PipelineError::UnsupportedFormat`].
    pub fn validate(&self) -> Result<(), PipelineError> {
        check_input(&self.original)
    }

    /// Validate the input, smooth it and advance to [`Denoised`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyImage`] or
    /// [`PipelineError::UnsupportedFormat`] for invalid input, or
    /// [`PipelineError::StageFailure`] if the denoise stage fails.
    pub fn denoise(self) -> Result<Denoised, PipelineError> {
        self.validate()?;
        let denoised = run_stage(StageKind::Denoise, &self.original, &self.params)?;
        Ok(Denoised {
            original: self.original,
            params: self.params,
            label: self.label,
            denoised,
        })
    }
}

// ───────────────────────── Stage 1: Denoised ─────────────────────────

/// Pipeline state after Gaussian smoothing.
///
/// Call [`adjust_contrast`](Self::adjust_contrast) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .adjust_contrast() to continue"]
pub struct Denoised {
    original: RawImage,
    params: ParameterSet,
    label: &'static str,
    denoised: RawImage,
}

impl Denoised {
    /// The input image.
    #[must_use]
    pub const fn original(&self) -> &RawImage {
        &self.original
    }

    /// Output of the denoise stage.
    #[must_use]
    pub const fn denoised(&self) -> &RawImage {
        &self.denoised
    }

    /// Rescale contrast and advance to [`Contrasted`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StageFailure`] if the contrast stage fails.
    pub fn adjust_contrast(self) -> Result<Contrasted, PipelineError> {
        let contrasted = run_stage(StageKind::Contrast, &self.denoised, &self.params)?;
        Ok(Contrasted {
            original: self.original,
            params: self.params,
            label: self.label,
            denoised: self.denoised,
            contrasted,
        })
    }
}

// ───────────────────────── Stage 2: Contrasted ───────────────────────

/// Pipeline state after the contrast rescale.
///
/// Call [`sharpen`](Self::sharpen) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .sharpen() to continue"]
pub struct Contrasted {
    original: RawImage,
    params: ParameterSet,
    label: &'static str,
    denoised: RawImage,
    contrasted: RawImage,
}

impl Contrasted {
    /// Output of the contrast stage.
    #[must_use]
    pub const fn contrasted(&self) -> &RawImage {
        &self.contrasted
    }

    /// Apply the luminance unsharp mask and advance to [`Sharpened`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StageFailure`] if the sharpen stage fails.
    pub fn sharpen(self) -> Result<Sharpened, PipelineError> {
        let enhanced = run_stage(StageKind::Sharpen, &self.contrasted, &self.params)?;
        Ok(Sharpened {
            original: self.original,
            params: self.params,
            label: self.label,
            denoised: self.denoised,
            contrasted: self.contrasted,
            enhanced,
        })
    }
}

// ───────────────────────── Stage 3: Sharpened ────────────────────────

/// Pipeline state after sharpening, the final stage.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`EnhancementResult`].
#[must_use = "call .into_result() to extract the EnhancementResult"]
pub struct Sharpened {
    original: RawImage,
    params: ParameterSet,
    label: &'static str,
    denoised: RawImage,
    contrasted: RawImage,
    enhanced: RawImage,
}

impl Sharpened {
    /// The final enhanced image.
    #[must_use]
    pub const fn enhanced(&self) -> &RawImage {
        &self.enhanced
    }

    /// Consume the pipeline and return the full [`EnhancementResult`].
    #[must_use]
    pub fn into_result(self) -> EnhancementResult {
        EnhancementResult::new(
            self.original,
            self.denoised,
            self.contrasted,
            self.enhanced,
            self.params,
            self.label.to_string(),
        )
    }
}

// ──────────────────── PipelineStage trait + Stage enum ────────────────

/// Total number of pipeline states, [`Pending`] included.
pub const STAGE_COUNT: usize = 4;

/// Trait implemented by every pipeline state, enabling uniform iteration.
pub trait PipelineStage: Sized {
    /// Human-readable name of this state (e.g. `"source"`, `"denoise"`).
    const NAME: &str;

    /// Zero-based index of this state (`0` for Pending through `3` for
    /// Sharpened).
    const INDEX: usize;

    /// The image this state holds as its current output.
    fn output(&self) -> &RawImage;

    /// The filter stage that produced [`output`](Self::output), or `None`
    /// for [`Pending`].
    fn kind(&self) -> Option<StageKind>;

    /// Stage-specific metrics for diagnostics.
    ///
    /// Returns `None` for [`Pending`], which has not processed anything.
    fn metrics(&self) -> Option<StageMetrics>;

    /// Advance to the next state.
    ///
    /// Returns `Ok(None)` if already at the final state.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if validation or the next stage fails.
    fn next(self) -> Result<Option<Stage>, PipelineError>;

    /// Run all remaining stages and return the [`EnhancementResult`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining stage fails.
    fn complete(self) -> Result<EnhancementResult, PipelineError>;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn output(&self) -> &RawImage {
        &self.original
    }

    fn kind(&self) -> Option<StageKind> {
        None
    }

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Denoised(self.denoise()?)))
    }

    fn complete(self) -> Result<EnhancementResult, PipelineError> {
        self.denoise()?.complete()
    }
}

impl PipelineStage for Denoised {
    const NAME: &str = "denoise";
    const INDEX: usize = 1;

    fn output(&self) -> &RawImage {
        &self.denoised
    }

    fn kind(&self) -> Option<StageKind> {
        Some(StageKind::Denoise)
    }

    fn metrics(&self) -> Option<StageMetrics> {
        let strength = self.params.noise_reduction();
        Some(StageMetrics::Denoise {
            strength,
            sigma: crate::denoise::sigma_for(strength),
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Contrasted(self.adjust_contrast()?)))
    }

    fn complete(self) -> Result<EnhancementResult, PipelineError> {
        self.adjust_contrast()?.complete()
    }
}

impl PipelineStage for Contrasted {
    const NAME: &str = "contrast";
    const INDEX: usize = 2;

    fn output(&self) -> &RawImage {
        &self.contrasted
    }

    fn kind(&self) -> Option<StageKind> {
        Some(StageKind::Contrast)
    }

    fn metrics(&self) -> Option<StageMetrics> {
        let factor = self.params.contrast();
        Some(StageMetrics::Contrast {
            factor,
            saturated_samples: crate::contrast::saturated_samples(&self.denoised, factor),
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Sharpened(self.sharpen()?)))
    }

    fn complete(self) -> Result<EnhancementResult, PipelineError> {
        Ok(self.sharpen()?.into_result())
    }
}

impl PipelineStage for Sharpened {
    const NAME: &str = "sharpen";
    const INDEX: usize = 3;

    fn output(&self) -> &RawImage {
        &self.enhanced
    }

    fn kind(&self) -> Option<StageKind> {
        Some(StageKind::Sharpen)
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Sharpen {
            amount: self.params.sharpness(),
            changed_pixels: changed_pixels(&self.contrasted, &self.enhanced),
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(None)
    }

    fn complete(self) -> Result<EnhancementResult, PipelineError> {
        Ok(self.into_result())
    }
}

/// Enum wrapping all pipeline states for uniform, loopable access.
///
/// ```rust
/// # use echolift_pipeline::{Pipeline, ParameterSet, PipelineError, RawImage, RgbImage};
/// # use echolift_pipeline::pipeline::{Advance, Stage};
/// # fn run() -> Result<(), PipelineError> {
/// # let scan = RawImage::from(RgbImage::new(4, 4));
/// let mut stage: Stage = Pipeline::new(scan, ParameterSet::default()).into();
/// loop {
///     match stage.advance()? {
///         Advance::Next(next) => stage = next,
///         Advance::Complete(done) => { stage = done; break; }
///     }
/// }
/// let result = stage.complete()?;
/// # Ok(())
/// # }
/// ```
#[must_use]
pub enum Stage {
    /// See [`Pending`].
    Pending(Pending),
    /// See [`Denoised`].
    Denoised(Denoised),
    /// See [`Contrasted`].
    Contrasted(Contrasted),
    /// See [`Sharpened`].
    Sharpened(Sharpened),
}

/// Compile-time guard: adding a [`Stage`] variant makes this match
/// non-exhaustive until [`STAGE_COUNT`] is revisited.
#[allow(dead_code, clippy::match_same_arms)]
const fn _stage_count_guard(s: &Stage) {
    match s {
        Stage::Pending(_) | Stage::Denoised(_) | Stage::Contrasted(_) | Stage::Sharpened(_) => {}
    }
}

/// Result of [`Stage::advance`]: either the next state or the final
/// state returned unchanged.
#[must_use]
pub enum Advance {
    /// The pipeline advanced to this next state.
    Next(Stage),
    /// The pipeline was already at the final state.
    Complete(Stage),
}

/// Delegate a method call to whichever `Stage` variant is active.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            Self::Pending(s) => s.$method($($arg),*),
            Self::Denoised(s) => s.$method($($arg),*),
            Self::Contrasted(s) => s.$method($($arg),*),
            Self::Sharpened(s) => s.$method($($arg),*),
        }
    };
}

impl Stage {
    /// Human-readable name of the current state.
    #[must_use]
    pub fn name(&self) -> &'static str {
        delegate!(self, name)
    }

    /// Zero-based index of the current state.
    #[must_use]
    pub fn index(&self) -> usize {
        delegate!(self, index)
    }

    /// The image the current state holds as its output.
    #[must_use]
    pub fn output(&self) -> &RawImage {
        delegate!(self, output)
    }

    /// The filter stage that produced the current output.
    #[must_use]
    pub fn kind(&self) -> Option<StageKind> {
        delegate!(self, kind)
    }

    /// Stage-specific metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> Option<StageMetrics> {
        delegate!(self, metrics)
    }

    /// Whether the pipeline is at the final state.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Sharpened(_))
    }

    /// Advance to the next state, consuming the final state into `None`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the transition fails.
    pub fn next(self) -> Result<Option<Self>, PipelineError> {
        delegate!(self, next)
    }

    /// Advance to the next state, returning `self` unchanged if already
    /// complete.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the transition fails.
    pub fn advance(self) -> Result<Advance, PipelineError> {
        if self.is_complete() {
            return Ok(Advance::Complete(self));
        }
        // Non-complete states always return Ok(Some(_)) from next().
        #[allow(clippy::unreachable)]
        let next = self
            .next()?
            .unwrap_or_else(|| unreachable!("non-complete stage returned None from next()"));
        Ok(Advance::Next(next))
    }

    /// Run all remaining stages to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining stage fails.
    pub fn complete(self) -> Result<EnhancementResult, PipelineError> {
        delegate!(self, complete)
    }
}

// Lets the macro call `.name()` and `.index()` on `&self`; associated
// constants aren't reachable through `self`.
trait StageMetadata {
    fn name(&self) -> &'static str;
    fn index(&self) -> usize;
}

impl<T: PipelineStage> StageMetadata for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn index(&self) -> usize {
        T::INDEX
    }
}

impl From<Pending> for Stage {
    fn from(s: Pending) -> Self {
        Self::Pending(s)
    }
}

impl From<Denoised> for Stage {
    fn from(s: Denoised) -> Self {
        Self::Denoised(s)
    }
}

impl From<Contrasted> for Stage {
    fn from(s: Contrasted) -> Self {
        Self::Contrasted(s)
    }
}

impl From<Sharpened> for Stage {
    fn from(s: Sharpened) -> Self {
        Self::Sharpened(s)
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental enhancement pipeline.
///
/// Created via [`Pipeline::new`] or [`Pipeline::from_mode`], which store
/// the image and parameters without processing anything. Each stage
/// method consumes the current state and returns the next, making it a
/// compile-time error to skip stages or run them out of order.
pub struct Pipeline;

impl Pipeline {
    /// Start a manual-mode pipeline.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image: RawImage, params: ParameterSet) -> Pending {
        Pending {
            original: image,
            params,
            label: MANUAL_LABEL,
        }
    }

    /// Start a pipeline whose parameters and label come from `mode`.
    pub const fn from_mode(image: RawImage, mode: &EnhancementMode) -> Pending {
        Pending {
            original: image,
            params: mode.resolve(),
            label: mode.label(),
        }
    }
}
