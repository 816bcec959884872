//! Gaussian smoothing for speckle reduction.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`] to smooth each colour
//! channel independently. Alpha is carried over unchanged.
//!
//! The strength knob `noise_reduction` (domain `[0.0, 1.0]`) maps
//! linearly to the blur sigma through [`DENOISE_SIGMA_SCALE`], so the
//! recommended operating range `[0.0, 0.1]` corresponds to sigma
//! `[0.0, 1.0]`.

use crate::params::Parameter;
use crate::stage::{channel_plane, check_input};
use crate::types::{PipelineError, RawImage};

/// Sigma (in pixels) per unit of `noise_reduction`.
pub const DENOISE_SIGMA_SCALE: f32 = 10.0;

/// Blur sigma used for a given denoise strength.
///
/// The strength is clamped into `[0.0, 1.0]` first (NaN counts as
/// `0.0`), so the result is always finite and in `[0.0, 10.0]`.
#[must_use]
pub fn sigma_for(strength: f32) -> f32 {
    Parameter::NoiseReduction.clamp(strength) * DENOISE_SIGMA_SCALE
}

/// Smooth an RGB/RGBA image by blurring each colour channel.
///
/// `strength` is clamped into `[0.0, 1.0]`. `imageproc`'s blur panics
/// on `sigma <= 0.0`, so a zero strength returns the input unchanged
/// (sharing its buffer) without calling it.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyImage`] or
/// [`PipelineError::UnsupportedFormat`] for inputs no stage can process.
pub fn denoise(image: &RawImage, strength: f32) -> Result<RawImage, PipelineError> {
    check_input(image)?;

    let sigma = sigma_for(strength);
    if sigma <= 0.0 {
        return Ok(image.clone());
    }

    let blurred = [
        channel_plane(image, 0)?,
        channel_plane(image, 1)?,
        channel_plane(image, 2)?,
    ]
    .map(|plane| imageproc::filter::gaussian_blur_f32(&plane, sigma));

    let stride = image.format().channels();
    let mut out = image.pixels().to_vec();
    for (i, px) in out.chunks_exact_mut(stride).enumerate() {
        for (c, plane) in blurred.iter().enumerate() {
            px[c] = plane.as_raw()[i];
        }
    }
    Ok(image.with_pixels(out))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{RgbImage, RgbaImage};

    /// A test image with a sharp dark-to-bright boundary at x=5.
    fn sharp_edge_image() -> RawImage {
        RawImage::from(RgbImage::from_fn(10, 10, |x, _y| {
            if x < 5 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        }))
    }

    #[test]
    fn zero_strength_returns_identical_image() {
        let img = sharp_edge_image();
        let out = denoise(&img, 0.0).unwrap();
        assert_eq!(img, out);
    }

    #[test]
    fn negative_and_nan_strength_return_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(denoise(&img, -1.0).unwrap(), img);
        assert_eq!(denoise(&img, f32::NAN).unwrap(), img);
    }

    #[test]
    fn sigma_scales_linearly() {
        assert!((sigma_for(0.1) - 1.0).abs() < 1e-6);
        assert!((sigma_for(0.25) - 2.5).abs() < 1e-6);
        assert!(sigma_for(0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn sigma_stays_finite_for_out_of_domain_strength() {
        assert!((sigma_for(f32::INFINITY) - DENOISE_SIGMA_SCALE).abs() < 1e-6);
        assert!((sigma_for(7.5) - DENOISE_SIGMA_SCALE).abs() < 1e-6);
        assert!(sigma_for(f32::NEG_INFINITY).abs() < f32::EPSILON);
        assert!(sigma_for(f32::NAN).abs() < f32::EPSILON);
    }

    #[test]
    fn infinite_strength_matches_full_strength() {
        let img = sharp_edge_image();
        let full = denoise(&img, 1.0).unwrap();
        assert_eq!(denoise(&img, f32::INFINITY).unwrap(), full);
        assert_eq!(denoise(&img, 3.0).unwrap(), full);
    }

    #[test]
    fn output_dimensions_preserved() {
        let img = RawImage::from(RgbImage::new(17, 31));
        let out = denoise(&img, 0.14).unwrap();
        assert_eq!(out.width(), 17);
        assert_eq!(out.height(), 31);
    }

    #[test]
    fn smooths_sharp_edge() {
        let img = sharp_edge_image();
        let out = denoise(&img, 0.2).unwrap();

        let left_of_edge = out.pixel(4, 5).unwrap()[0];
        let right_of_edge = out.pixel(5, 5).unwrap()[0];
        assert!(
            left_of_edge > 0,
            "expected smoothing to raise left-of-edge above 0, got {left_of_edge}",
        );
        assert!(
            right_of_edge < 255,
            "expected smoothing to lower right-of-edge below 255, got {right_of_edge}",
        );
    }

    #[test]
    fn stronger_denoise_spreads_further() {
        let img = sharp_edge_image();
        let light = denoise(&img, 0.05).unwrap();
        let heavy = denoise(&img, 0.3).unwrap();
        // Two pixels away from the edge, only the heavy blur reaches.
        let light_px = light.pixel(2, 5).unwrap()[0];
        let heavy_px = heavy.pixel(2, 5).unwrap()[0];
        assert!(heavy_px > light_px, "heavy={heavy_px} light={light_px}");
    }

    #[test]
    fn uniform_image_stays_uniform() {
        let img = RawImage::from(RgbImage::from_pixel(10, 10, image::Rgb([100, 150, 200])));
        let out = denoise(&img, 0.14).unwrap();
        let expected: [u8; 3] = [100, 150, 200];
        for px in out.pixels().chunks_exact(3) {
            for (c, &exp) in expected.iter().enumerate() {
                let diff = i16::from(px[c]) - i16::from(exp);
                assert!(diff.abs() <= 1, "channel {c}: expected ~{exp}, got {}", px[c]);
            }
        }
    }

    #[test]
    fn alpha_is_not_blurred() {
        let img = RawImage::from(RgbaImage::from_fn(8, 8, |x, _| {
            image::Rgba([0, 0, 0, if x < 4 { 0 } else { 255 }])
        }));
        let out = denoise(&img, 0.3).unwrap();
        for (src, dst) in img.pixels().chunks_exact(4).zip(out.pixels().chunks_exact(4)) {
            assert_eq!(src[3], dst[3]);
        }
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn matches_per_channel_gray_blur() {
        let img = RawImage::from(RgbImage::from_fn(10, 10, |x, y| {
            image::Rgb([
                ((x * 25) % 256) as u8,
                ((y * 30) % 256) as u8,
                (((x + y) * 20) % 256) as u8,
            ])
        }));
        let strength = 0.14;
        let out = denoise(&img, strength).unwrap();

        for c in 0..3 {
            let plane = channel_plane(&img, c).unwrap();
            let expected = imageproc::filter::gaussian_blur_f32(&plane, sigma_for(strength));
            assert_eq!(channel_plane(&out, c).unwrap(), expected, "mismatch in channel {c}");
        }
    }
}
