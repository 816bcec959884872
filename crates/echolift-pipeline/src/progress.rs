//! Progress events emitted while an [`Enhancer`](crate::Enhancer) runs.
//!
//! Events are tied to real stage completion. A successful run emits
//! exactly five events, in this order:
//!
//! | phase        | fraction | emitted                      |
//! |--------------|----------|------------------------------|
//! | `Uploading`  | 0.0      | before denoise               |
//! | `Uploading`  | 1/3      | after denoise                |
//! | `Enhancing`  | 2/3      | after contrast               |
//! | `Finalizing` | 0.95     | after sharpen                |
//! | `Done`       | 1.0      | after the result is assembled |
//!
//! A failed run stops emitting at the point of failure. Nothing is
//! emitted before `run` is called or after a terminal state is reached.

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

/// Fraction reported when a run starts.
pub const STARTED: f32 = 0.0;
/// Fraction reported once denoise has completed.
pub const DENOISED: f32 = 1.0 / 3.0;
/// Fraction reported once contrast has completed.
pub const CONTRASTED: f32 = 2.0 / 3.0;
/// Fraction reported once sharpen has completed.
pub const SHARPENED: f32 = 0.95;
/// Fraction reported with [`ProgressPhase::Done`].
pub const FINISHED: f32 = 1.0;

/// Coarse phase of a run, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    /// Input accepted, denoise running.
    Uploading,
    /// Contrast running.
    Enhancing,
    /// Sharpen running, result being assembled.
    Finalizing,
    /// Result available.
    Done,
}

impl ProgressPhase {
    /// Caption shown next to a progress bar.
    #[must_use]
    pub const fn status_text(self) -> &'static str {
        match self {
            Self::Uploading => "Uploading scan...",
            Self::Enhancing => "AI Enhancing...",
            Self::Finalizing => "Finalizing output...",
            Self::Done => "Done!",
        }
    }
}

/// One discrete status update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Phase the run is in.
    pub phase: ProgressPhase,
    /// Completion in `[0.0, 1.0]`, when known.
    pub fraction: Option<f32>,
}

impl ProgressEvent {
    /// An event with a known completion fraction.
    #[must_use]
    pub const fn at(phase: ProgressPhase, fraction: f32) -> Self {
        Self {
            phase,
            fraction: Some(fraction),
        }
    }

    /// Caption for this event's phase.
    #[must_use]
    pub const fn status_text(&self) -> &'static str {
        self.phase.status_text()
    }
}

/// Receives progress events synchronously as stages complete.
pub trait ProgressListener {
    /// Called once per event, in order.
    fn on_progress(&mut self, event: ProgressEvent);
}

impl<F: FnMut(ProgressEvent)> ProgressListener for F {
    fn on_progress(&mut self, event: ProgressEvent) {
        self(event);
    }
}

/// Collects every event.
impl ProgressListener for Vec<ProgressEvent> {
    fn on_progress(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

/// Streams events to another thread. A dropped receiver is ignored: the
/// run does not depend on anyone watching it.
impl ProgressListener for Sender<ProgressEvent> {
    fn on_progress(&mut self, event: ProgressEvent) {
        let _ = self.send(event);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn on_progress(&mut self, _event: ProgressEvent) {}
}
