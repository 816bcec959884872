//! Filter stages: pure image-to-image transforms with one scalar knob.
//!
//! This module defines the [`FilterStage`] trait and the [`StageKind`]
//! enum that implements it for the three enhancement stages. Each stage
//! also lives in its own module ([`denoise`](crate::denoise),
//! [`contrast`](crate::contrast), [`sharpen`](crate::sharpen)) as a free
//! function that can be tested without the rest of the chain.
//!
//! # Contract
//!
//! - zero-dimension input fails with [`PipelineError::EmptyImage`];
//! - anything but 8-bit RGB/RGBA fails with
//!   [`PipelineError::UnsupportedFormat`];
//! - at the stage's identity parameter the output is pixel-equal to the
//!   input;
//! - the input is never written to, and dimensions, format and alpha
//!   are preserved.

use std::fmt;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::params::{Parameter, ParameterSet};
use crate::types::{PipelineError, RawImage};

/// Identifies one of the three enhancement stages.
///
/// The declaration order is the execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Gaussian smoothing driven by `noise_reduction`.
    Denoise,
    /// Intensity rescale around mid-gray driven by `contrast`.
    Contrast,
    /// Luminance unsharp mask driven by `sharpness`.
    Sharpen,
}

impl StageKind {
    /// Every stage, in execution order.
    pub const ALL: [Self; 3] = [Self::Denoise, Self::Contrast, Self::Sharpen];

    /// The parameter that drives this stage.
    #[must_use]
    pub const fn parameter(self) -> Parameter {
        match self {
            Self::Denoise => Parameter::NoiseReduction,
            Self::Contrast => Parameter::Contrast,
            Self::Sharpen => Parameter::Sharpness,
        }
    }

    /// This stage's knob value within `params`.
    #[must_use]
    pub const fn value_in(self, params: &ParameterSet) -> f32 {
        params.get(self.parameter())
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for single-parameter image transforms.
pub trait FilterStage {
    /// Lowercase stage name, used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// The parameter value at which [`apply`](Self::apply) is the identity.
    fn identity(&self) -> f32;

    /// Transform `image` into a new image.
    ///
    /// `param` is clamped into the stage's domain before use.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyImage`] or
    /// [`PipelineError::UnsupportedFormat`] when the input cannot be
    /// processed.
    fn apply(&self, image: &RawImage, param: f32) -> Result<RawImage, PipelineError>;
}

impl FilterStage for StageKind {
    fn name(&self) -> &'static str {
        match *self {
            Self::Denoise => "denoise",
            Self::Contrast => "contrast",
            Self::Sharpen => "sharpen",
        }
    }

    fn identity(&self) -> f32 {
        self.parameter().identity()
    }

    fn apply(&self, image: &RawImage, param: f32) -> Result<RawImage, PipelineError> {
        match *self {
            Self::Denoise => crate::denoise::denoise(image, param),
            Self::Contrast => crate::contrast::adjust_contrast(image, param),
            Self::Sharpen => crate::sharpen::sharpen(image, param),
        }
    }
}

/// Reject inputs no stage can process.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyImage`] for a zero width or height and
/// [`PipelineError::UnsupportedFormat`] for anything but 8-bit RGB/RGBA.
pub fn check_input(image: &RawImage) -> Result<(), PipelineError> {
    if image.is_empty() {
        return Err(PipelineError::EmptyImage);
    }
    if !image.format().is_enhanceable() {
        return Err(PipelineError::UnsupportedFormat(image.format()));
    }
    Ok(())
}

/// Number of colour (non-alpha) channels in an enhanceable image.
pub(crate) const COLOR_CHANNELS: usize = 3;

/// Extract one channel of an 8-bit interleaved image as a grayscale plane.
///
/// # Errors
///
/// Returns [`PipelineError::BufferSizeMismatch`] if the buffer does not
/// hold `width * height` pixels. [`RawImage::new`] rules this out.
pub(crate) fn channel_plane(
    image: &RawImage,
    channel: usize,
) -> Result<GrayImage, PipelineError> {
    let stride = image.format().channels();
    let samples = image
        .pixels()
        .iter()
        .skip(channel)
        .step_by(stride)
        .copied()
        .collect();
    plane(image, samples)
}

/// Rec. 601 luma weights for R, G, B.
pub(crate) const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Rec. 601 luma plane of an 8-bit RGB/RGBA image.
///
/// # Errors
///
/// Same as [`channel_plane`].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn luma_plane(image: &RawImage) -> Result<GrayImage, PipelineError> {
    let stride = image.format().channels();
    let samples = image
        .pixels()
        .chunks_exact(stride)
        .map(|px| {
            let y = LUMA_WEIGHTS[0].mul_add(
                f32::from(px[0]),
                LUMA_WEIGHTS[1].mul_add(f32::from(px[1]), LUMA_WEIGHTS[2] * f32::from(px[2])),
            );
            y.round().clamp(0.0, 255.0) as u8
        })
        .collect();
    plane(image, samples)
}

/// Wrap one sample per pixel of `image` as a grayscale plane.
fn plane(image: &RawImage, samples: Vec<u8>) -> Result<GrayImage, PipelineError> {
    let (width, height) = (image.width(), image.height());
    let actual = samples.len();
    GrayImage::from_raw(width, height, samples).ok_or(PipelineError::BufferSizeMismatch {
        expected: width as usize * height as usize,
        actual,
    })
}

/// Round and saturate a sample into `0..=255`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn saturate(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{PixelFormat, RgbImage, RgbaImage};

    fn gradient_rgba() -> RawImage {
        RawImage::from(RgbaImage::from_fn(6, 5, |x, y| {
            let v = u8::try_from(x * 40 + y * 3).unwrap();
            image::Rgba([v, 255 - v, v / 2, 200])
        }))
    }

    #[test]
    fn stages_in_execution_order() {
        let names: Vec<&str> = StageKind::ALL.iter().map(FilterStage::name).collect();
        assert_eq!(names, vec!["denoise", "contrast", "sharpen"]);
    }

    #[test]
    fn every_stage_is_identity_at_its_identity_value() {
        let img = gradient_rgba();
        for stage in StageKind::ALL {
            let out = stage.apply(&img, stage.identity()).unwrap();
            assert_eq!(out, img, "{stage} changed the image at identity");
        }
    }

    #[test]
    fn every_stage_rejects_empty_image() {
        let img = RawImage::new(0, 3, PixelFormat::Rgb8, Vec::new()).unwrap();
        for stage in StageKind::ALL {
            assert_eq!(stage.apply(&img, 0.5), Err(PipelineError::EmptyImage));
        }
    }

    #[test]
    fn every_stage_rejects_grayscale() {
        let img = RawImage::new(2, 2, PixelFormat::Luma8, vec![1, 2, 3, 4]).unwrap();
        for stage in StageKind::ALL {
            assert_eq!(
                stage.apply(&img, 1.0),
                Err(PipelineError::UnsupportedFormat(PixelFormat::Luma8))
            );
        }
    }

    #[test]
    fn every_stage_preserves_geometry_and_alpha() {
        let img = gradient_rgba();
        for stage in StageKind::ALL {
            let out = stage.apply(&img, 1.5).unwrap();
            assert_eq!(out.dimensions(), img.dimensions());
            assert_eq!(out.format(), PixelFormat::Rgba8);
            for px in out.pixels().chunks_exact(4) {
                assert_eq!(px[3], 200, "{stage} altered alpha");
            }
        }
    }

    #[test]
    fn every_stage_leaves_input_untouched() {
        let img = gradient_rgba();
        let snapshot = img.pixels().to_vec();
        for stage in StageKind::ALL {
            let out = stage.apply(&img, 2.0).unwrap();
            assert!(!out.shares_buffer(&img));
        }
        assert_eq!(img.pixels(), &snapshot[..]);
    }

    #[test]
    fn apply_clamps_parameter() {
        let img = gradient_rgba();
        let clamped = StageKind::Contrast.apply(&img, 50.0).unwrap();
        let at_max = StageKind::Contrast.apply(&img, 2.0).unwrap();
        assert_eq!(clamped, at_max);
    }

    #[test]
    fn stage_parameter_lookup() {
        let params = ParameterSet::new(0.05, 1.5, 0.9);
        assert!((StageKind::Denoise.value_in(&params) - 0.05).abs() < f32::EPSILON);
        assert!((StageKind::Contrast.value_in(&params) - 1.5).abs() < f32::EPSILON);
        assert!((StageKind::Sharpen.value_in(&params) - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn channel_plane_extracts_interleaved_samples() {
        let img = RawImage::from(RgbImage::from_fn(2, 1, |x, _| {
            image::Rgb([10 + u8::try_from(x).unwrap(), 20, 30])
        }));
        assert_eq!(channel_plane(&img, 0).unwrap().as_raw(), &vec![10, 11]);
        assert_eq!(channel_plane(&img, 2).unwrap().as_raw(), &vec![30, 30]);
    }

    #[test]
    fn luma_of_gray_is_gray() {
        let img = RawImage::from(RgbImage::from_pixel(3, 3, image::Rgb([128, 128, 128])));
        assert!(luma_plane(&img).unwrap().pixels().all(|p| p.0[0] == 128));
    }

    #[test]
    fn green_is_brightest_luma() {
        let img = RawImage::from(RgbImage::from_fn(3, 1, |x, _| match x {
            0 => image::Rgb([255, 0, 0]),
            1 => image::Rgb([0, 255, 0]),
            _ => image::Rgb([0, 0, 255]),
        }));
        let luma = luma_plane(&img).unwrap();
        let (r, g, b) = (
            luma.get_pixel(0, 0).0[0],
            luma.get_pixel(1, 0).0[0],
            luma.get_pixel(2, 0).0[0],
        );
        assert!(g > r && r > b, "expected green > red > blue, got {r} {g} {b}");
    }

    #[test]
    fn short_buffer_is_an_error_not_a_black_plane() {
        let img = RawImage::unchecked(2, 2, PixelFormat::Rgb8, vec![9; 9]);
        let expected = Err(PipelineError::BufferSizeMismatch {
            expected: 4,
            actual: 3,
        });
        assert_eq!(channel_plane(&img, 0), expected);
        assert_eq!(luma_plane(&img), expected);
    }

    #[test]
    fn saturate_clips_instead_of_wrapping() {
        assert_eq!(saturate(-20.0), 0);
        assert_eq!(saturate(300.0), 255);
        assert_eq!(saturate(71.6), 72);
    }
}
