//! Contrast rescale around mid-gray.
//!
//! Each colour sample is mapped through
//! `out = clamp(round(factor * (v - 128) + 128), 0, 255)`, so `factor > 1`
//! pushes samples away from mid-gray and `factor < 1` pulls them toward
//! it. The mapping depends only on the sample value, so it is built
//! once as a 256-entry lookup table and applied per channel. Alpha is
//! left untouched.

use crate::params::Parameter;
use crate::stage::{COLOR_CHANNELS, check_input, saturate};
use crate::types::{PipelineError, RawImage};

/// Fixed point of the contrast mapping.
pub const CONTRAST_MIDPOINT: f32 = 128.0;

/// Build the sample lookup table for a contrast factor.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn contrast_lut(factor: f32) -> [u8; 256] {
    std::array::from_fn(|v| {
        let v = f32::from(v as u8);
        saturate(factor.mul_add(v - CONTRAST_MIDPOINT, CONTRAST_MIDPOINT))
    })
}

/// Rescale intensities of an RGB/RGBA image around mid-gray.
///
/// `factor` is clamped into `[0.5, 2.0]` (NaN counts as `1.0`). A
/// factor of exactly `1.0` returns the input unchanged (sharing its
/// buffer).
///
/// # Errors
///
/// Returns [`PipelineError::EmptyImage`] or
/// [`PipelineError::UnsupportedFormat`] for inputs no stage can process.
#[allow(clippy::float_cmp)]
pub fn adjust_contrast(image: &RawImage, factor: f32) -> Result<RawImage, PipelineError> {
    check_input(image)?;

    let factor = Parameter::Contrast.clamp(factor);
    if factor == 1.0 {
        return Ok(image.clone());
    }

    let lut = contrast_lut(factor);
    let stride = image.format().channels();
    let mut out = image.pixels().to_vec();
    for px in out.chunks_exact_mut(stride) {
        for sample in &mut px[..COLOR_CHANNELS] {
            *sample = lut[usize::from(*sample)];
        }
    }
    Ok(image.with_pixels(out))
}

/// Count colour samples that the given factor pushes onto 0 or 255 from
/// somewhere else.
#[must_use]
pub(crate) fn saturated_samples(image: &RawImage, factor: f32) -> u64 {
    if image.is_empty() || !image.format().is_enhanceable() {
        return 0;
    }
    let lut = contrast_lut(factor);
    let stride = image.format().channels();
    let count = image
        .pixels()
        .chunks_exact(stride)
        .flat_map(|px| &px[..COLOR_CHANNELS])
        .filter(|&&v| {
            let mapped = lut[usize::from(v)];
            (mapped == 0 || mapped == 255) && mapped != v
        })
        .count();
    count as u64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{RgbImage, RgbaImage};

    fn gray(value: u8) -> RawImage {
        RawImage::from(RgbImage::from_pixel(4, 4, image::Rgb([value; 3])))
    }

    #[test]
    fn unit_factor_is_identity() {
        let img = RawImage::from(RgbImage::from_fn(5, 5, |x, y| {
            image::Rgb([
                u8::try_from(x * 50).unwrap(),
                u8::try_from(y * 50).unwrap(),
                17,
            ])
        }));
        let out = adjust_contrast(&img, 1.0).unwrap();
        assert_eq!(out, img);
        assert!(out.shares_buffer(&img));
    }

    #[test]
    fn doubling_contrast_moves_gray_away_from_midpoint() {
        let out = adjust_contrast(&gray(100), 2.0).unwrap();
        assert!(out.pixels().iter().all(|&v| v == 72));
    }

    #[test]
    fn halving_contrast_moves_gray_toward_midpoint() {
        let out = adjust_contrast(&gray(100), 0.5).unwrap();
        assert!(out.pixels().iter().all(|&v| v == 114));
        let out = adjust_contrast(&gray(200), 0.5).unwrap();
        assert!(out.pixels().iter().all(|&v| v == 164));
    }

    #[test]
    fn out_of_domain_factor_is_clamped() {
        let img = gray(100);
        assert_eq!(
            adjust_contrast(&img, 5.0).unwrap(),
            adjust_contrast(&img, 2.0).unwrap()
        );
        assert_eq!(
            adjust_contrast(&img, 0.1).unwrap(),
            adjust_contrast(&img, 0.5).unwrap()
        );
        assert_eq!(
            adjust_contrast(&img, f32::INFINITY).unwrap(),
            adjust_contrast(&img, 2.0).unwrap()
        );
        assert!(adjust_contrast(&img, f32::NAN).unwrap().shares_buffer(&img));
    }

    #[test]
    fn midpoint_is_fixed() {
        for factor in [0.5, 0.8, 1.3, 2.0] {
            let out = adjust_contrast(&gray(128), factor).unwrap();
            assert!(out.pixels().iter().all(|&v| v == 128), "factor {factor}");
        }
    }

    #[test]
    fn saturates_instead_of_wrapping() {
        let dark = adjust_contrast(&gray(10), 2.0).unwrap();
        assert!(dark.pixels().iter().all(|&v| v == 0));
        let bright = adjust_contrast(&gray(250), 2.0).unwrap();
        assert!(bright.pixels().iter().all(|&v| v == 255));
    }

    #[test]
    fn lut_is_monotonic() {
        for factor in [0.5, 1.0, 1.7, 2.0] {
            let lut = contrast_lut(factor);
            assert!(lut.windows(2).all(|w| w[0] <= w[1]), "factor {factor}");
        }
    }

    #[test]
    fn unit_lut_is_identity() {
        let lut = contrast_lut(1.0);
        for (i, &v) in lut.iter().enumerate() {
            assert_eq!(usize::from(v), i);
        }
    }

    #[test]
    fn alpha_is_untouched() {
        let img = RawImage::from(RgbaImage::from_pixel(3, 3, image::Rgba([20, 60, 220, 37])));
        let out = adjust_contrast(&img, 2.0).unwrap();
        for px in out.pixels().chunks_exact(4) {
            assert_eq!(px, &[0, 0, 255, 37]);
        }
    }

    #[test]
    fn counts_newly_saturated_samples() {
        // 10 -> 0 and 250 -> 255 at factor 2.0; 128 stays put.
        let img = RawImage::from(RgbImage::from_fn(3, 1, |x, _| match x {
            0 => image::Rgb([10, 10, 10]),
            1 => image::Rgb([128, 128, 128]),
            _ => image::Rgb([250, 250, 250]),
        }));
        assert_eq!(saturated_samples(&img, 2.0), 6);
        assert_eq!(saturated_samples(&img, 1.0), 0);
    }

    #[test]
    fn already_saturated_samples_are_not_counted() {
        assert_eq!(saturated_samples(&gray(0), 2.0), 0);
        assert_eq!(saturated_samples(&gray(255), 2.0), 0);
    }
}
