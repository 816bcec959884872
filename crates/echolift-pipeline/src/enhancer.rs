//! Run state machine wrapped around the stage chain.
//!
//! An [`Enhancer`] starts [`Idle`](RunState::Idle), moves through
//! [`Running`](RunState::Running) while each stage executes, and ends in
//! [`Succeeded`](RunState::Succeeded) or [`Failed`](RunState::Failed).
//! Progress is reported to a [`ProgressListener`] as each stage
//! completes; see [`crate::progress`] for the exact sequence.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::mode::EnhancementMode;
use crate::params::ParameterSet;
use crate::pipeline::{Pending, Pipeline};
use crate::progress::{self, ProgressEvent, ProgressListener, ProgressPhase};
use crate::stage::StageKind;
use crate::types::{EnhancementResult, PipelineError, RawImage};

/// Where an [`Enhancer`] is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No run has started, or the machine was [`reset`](Enhancer::reset).
    #[default]
    Idle,
    /// The named stage is executing.
    Running(StageKind),
    /// The last run produced a result.
    Succeeded,
    /// The last run stopped with this error.
    Failed(PipelineError),
}

impl RunState {
    /// Whether the machine has finished a run.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }
}

/// Drives one enhancement run at a time and remembers how it ended.
///
/// The machine holds no image data: results are handed to the caller,
/// and independent enhancers can run concurrently on separate threads.
#[derive(Debug, Clone, Default)]
pub struct Enhancer {
    state: RunState,
}

impl Enhancer {
    /// A fresh machine in [`RunState::Idle`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: RunState::Idle,
        }
    }

    /// The current state.
    #[must_use]
    pub const fn state(&self) -> &RunState {
        &self.state
    }

    /// Return to [`RunState::Idle`], forgetting the last run's outcome.
    pub fn reset(&mut self) {
        self.state = RunState::Idle;
    }

    /// Enhance `image` with manual parameters.
    ///
    /// Calling `run` on a machine that already finished starts a new run;
    /// the state always reflects the most recent one.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyImage`] or
    /// [`PipelineError::UnsupportedFormat`] when the input is rejected
    /// (no progress is emitted), or [`PipelineError::StageFailure`] when a
    /// stage fails. Either way the machine ends in [`RunState::Failed`].
    pub fn run<L: ProgressListener + ?Sized>(
        &mut self,
        image: &RawImage,
        params: &ParameterSet,
        listener: &mut L,
    ) -> Result<EnhancementResult, PipelineError> {
        self.drive(Pipeline::new(image.clone(), *params), listener)
    }

    /// Enhance `image` with the parameters and label `mode` selects.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn run_mode<L: ProgressListener + ?Sized>(
        &mut self,
        image: &RawImage,
        mode: &EnhancementMode,
        listener: &mut L,
    ) -> Result<EnhancementResult, PipelineError> {
        self.drive(Pipeline::from_mode(image.clone(), mode), listener)
    }

    fn drive<L: ProgressListener + ?Sized>(
        &mut self,
        pending: Pending,
        listener: &mut L,
    ) -> Result<EnhancementResult, PipelineError> {
        match self.advance(pending, listener) {
            Ok(result) => {
                self.state = RunState::Succeeded;
                info!(
                    label = result.label(),
                    width = result.dimensions().width,
                    height = result.dimensions().height,
                    "enhancement run succeeded"
                );
                listener.on_progress(ProgressEvent::at(ProgressPhase::Done, progress::FINISHED));
                Ok(result)
            }
            Err(err) => {
                warn!(error = %err, "enhancement run failed");
                self.state = RunState::Failed(err.clone());
                Err(err)
            }
        }
    }

    fn advance<L: ProgressListener + ?Sized>(
        &mut self,
        pending: Pending,
        listener: &mut L,
    ) -> Result<EnhancementResult, PipelineError> {
        self.state = RunState::Running(StageKind::Denoise);
        pending.validate()?;
        listener.on_progress(ProgressEvent::at(ProgressPhase::Uploading, progress::STARTED));

        let denoised = pending.denoise()?;
        listener.on_progress(ProgressEvent::at(ProgressPhase::Uploading, progress::DENOISED));

        self.state = RunState::Running(StageKind::Contrast);
        let contrasted = denoised.adjust_contrast()?;
        listener.on_progress(ProgressEvent::at(ProgressPhase::Enhancing, progress::CONTRASTED));

        self.state = RunState::Running(StageKind::Sharpen);
        let sharpened = contrasted.sharpen()?;
        listener.on_progress(ProgressEvent::at(ProgressPhase::Finalizing, progress::SHARPENED));

        Ok(sharpened.into_result())
    }
}
