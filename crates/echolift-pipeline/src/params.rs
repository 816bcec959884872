//! Validated parameters for one enhancement run.
//!
//! A [`ParameterSet`] is always in domain. Construction never fails:
//! out-of-domain values are clamped to the nearest boundary and every
//! clamp is both logged (`tracing::warn!`) and returned to the caller as
//! a [`ClampAdjustment`] by [`ParameterSet::with_adjustments`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Names one field of a [`ParameterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    /// Denoise strength.
    NoiseReduction,
    /// Contrast multiplier around mid-gray.
    Contrast,
    /// Luminance sharpening amount.
    Sharpness,
}

impl Parameter {
    /// Every parameter, in pipeline order.
    pub const ALL: [Self; 3] = [Self::NoiseReduction, Self::Contrast, Self::Sharpness];

    /// Inclusive `(min, max)` domain.
    #[must_use]
    pub const fn domain(self) -> (f32, f32) {
        match self {
            Self::NoiseReduction => (0.0, 1.0),
            Self::Contrast => (0.5, 2.0),
            Self::Sharpness => (0.0, 2.0),
        }
    }

    /// The value at which the corresponding stage leaves the image
    /// unchanged.
    #[must_use]
    pub const fn identity(self) -> f32 {
        match self {
            Self::NoiseReduction | Self::Sharpness => 0.0,
            Self::Contrast => 1.0,
        }
    }

    /// Clamp `value` into this parameter's domain.
    ///
    /// NaN has no nearest boundary and maps to [`identity`](Self::identity).
    #[must_use]
    pub fn clamp(self, value: f32) -> f32 {
        if value.is_nan() {
            return self.identity();
        }
        let (min, max) = self.domain();
        value.clamp(min, max)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoiseReduction => "noise_reduction",
            Self::Contrast => "contrast",
            Self::Sharpness => "sharpness",
        })
    }
}

/// Noise reduction values above this still work but tend to over-smooth
/// fine speckle structure.
pub const RECOMMENDED_MAX_NOISE_REDUCTION: f32 = 0.1;

/// Record of one value that was moved into its domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClampAdjustment {
    /// Which field was clamped.
    pub parameter: Parameter,
    /// The value the caller asked for.
    pub requested: f32,
    /// The value the pipeline will use.
    pub applied: f32,
}

/// Numeric configuration for one enhancement run.
///
/// Fields are private so the domain invariant cannot be bypassed.
/// Deserialization goes through the same clamping constructor; missing
/// fields take their [`Default`] values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawParameters")]
pub struct ParameterSet {
    noise_reduction: f32,
    contrast: f32,
    sharpness: f32,
}

impl ParameterSet {
    /// Every stage at its identity value.
    pub const IDENTITY: Self = Self {
        noise_reduction: 0.0,
        contrast: 1.0,
        sharpness: 0.0,
    };

    /// Manual-mode starting point.
    pub const DEFAULT: Self = Self {
        noise_reduction: 0.2,
        contrast: 1.0,
        sharpness: 0.4,
    };

    /// Build a parameter set, clamping each value into its domain.
    #[must_use]
    pub fn new(noise_reduction: f32, contrast: f32, sharpness: f32) -> Self {
        Self::with_adjustments(noise_reduction, contrast, sharpness).0
    }

    /// Like [`new`](Self::new), but also report which values were clamped.
    ///
    /// The returned list is empty when every value was already in domain.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn with_adjustments(
        noise_reduction: f32,
        contrast: f32,
        sharpness: f32,
    ) -> (Self, Vec<ClampAdjustment>) {
        let mut adjustments = Vec::new();
        let mut take = |parameter: Parameter, requested: f32| {
            let applied = parameter.clamp(requested);
            if requested.is_nan() || applied != requested {
                warn!(
                    %parameter,
                    requested,
                    applied,
                    "enhancement parameter clamped to domain"
                );
                adjustments.push(ClampAdjustment {
                    parameter,
                    requested,
                    applied,
                });
            }
            applied
        };
        let params = Self {
            noise_reduction: take(Parameter::NoiseReduction, noise_reduction),
            contrast: take(Parameter::Contrast, contrast),
            sharpness: take(Parameter::Sharpness, sharpness),
        };
        (params, adjustments)
    }

    /// Build from constants that are in domain by construction.
    pub(crate) const fn from_table(noise_reduction: f32, contrast: f32, sharpness: f32) -> Self {
        Self {
            noise_reduction,
            contrast,
            sharpness,
        }
    }

    /// Denoise strength in `[0.0, 1.0]`.
    #[must_use]
    pub const fn noise_reduction(&self) -> f32 {
        self.noise_reduction
    }

    /// Contrast multiplier in `[0.5, 2.0]`.
    #[must_use]
    pub const fn contrast(&self) -> f32 {
        self.contrast
    }

    /// Sharpening amount in `[0.0, 2.0]`.
    #[must_use]
    pub const fn sharpness(&self) -> f32 {
        self.sharpness
    }

    /// Look up a field by name.
    #[must_use]
    pub const fn get(&self, parameter: Parameter) -> f32 {
        match parameter {
            Parameter::NoiseReduction => self.noise_reduction,
            Parameter::Contrast => self.contrast,
            Parameter::Sharpness => self.sharpness,
        }
    }

    /// Whether every stage would leave the image unchanged.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_identity(&self) -> bool {
        Parameter::ALL
            .iter()
            .all(|&p| self.get(p) == p.identity())
    }

    /// Whether the denoise strength is inside the range that avoids
    /// over-smoothing.
    #[must_use]
    pub fn within_recommended_range(&self) -> bool {
        self.noise_reduction <= RECOMMENDED_MAX_NOISE_REDUCTION
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Unvalidated wire form of [`ParameterSet`].
#[derive(Deserialize)]
#[serde(default)]
struct RawParameters {
    noise_reduction: f32,
    contrast: f32,
    sharpness: f32,
}

impl Default for RawParameters {
    fn default() -> Self {
        let d = ParameterSet::DEFAULT;
        Self {
            noise_reduction: d.noise_reduction,
            contrast: d.contrast,
            sharpness: d.sharpness,
        }
    }
}

impl From<RawParameters> for ParameterSet {
    fn from(raw: RawParameters) -> Self {
        Self::new(raw.noise_reduction, raw.contrast, raw.sharpness)
    }
}
