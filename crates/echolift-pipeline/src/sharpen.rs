//! Luminance unsharp mask.
//!
//! Detail is extracted from the Rec. 601 luma plane only
//! (`detail = luma - blur(luma)`) and the same scaled detail is added to
//! each colour channel. Working on luma sharpens edges without
//! amplifying chroma noise or shifting hue.
//!
//! Detail of magnitude [`DETAIL_THRESHOLD`] or less is treated as zero,
//! so flat regions (where the blur only contributes rounding error)
//! come out bit-identical to the input.

use crate::params::Parameter;
use crate::stage::{COLOR_CHANNELS, check_input, luma_plane, saturate};
use crate::types::{PipelineError, RawImage};

/// Blur sigma used to build the unsharp mask.
pub const SHARPEN_SIGMA: f32 = 1.0;

/// Largest luma detail (in sample units) that is ignored.
pub const DETAIL_THRESHOLD: i16 = 1;

/// Signed luma detail per pixel, row-major, with the threshold applied.
fn luma_detail(image: &RawImage) -> Result<Vec<i16>, PipelineError> {
    let luma = luma_plane(image)?;
    let blurred = imageproc::filter::gaussian_blur_f32(&luma, SHARPEN_SIGMA);
    Ok(luma
        .as_raw()
        .iter()
        .zip(blurred.as_raw())
        .map(|(&y, &b)| {
            let d = i16::from(y) - i16::from(b);
            if d.abs() <= DETAIL_THRESHOLD { 0 } else { d }
        })
        .collect())
}

/// Sharpen an RGB/RGBA image by `amount` times its luma detail.
///
/// `amount` is clamped into `[0.0, 2.0]` (NaN counts as `0.0`). An
/// amount of zero returns the input unchanged, sharing its buffer.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyImage`] or
/// [`PipelineError::UnsupportedFormat`] for inputs no stage can process.
pub fn sharpen(image: &RawImage, amount: f32) -> Result<RawImage, PipelineError> {
    check_input(image)?;

    let amount = Parameter::Sharpness.clamp(amount);
    if amount <= 0.0 {
        return Ok(image.clone());
    }

    let detail = luma_detail(image)?;
    let stride = image.format().channels();
    let mut out = image.pixels().to_vec();
    for (px, &d) in out.chunks_exact_mut(stride).zip(&detail) {
        if d == 0 {
            continue;
        }
        let boost = amount * f32::from(d);
        for sample in &mut px[..COLOR_CHANNELS] {
            *sample = saturate(f32::from(*sample) + boost);
        }
    }
    Ok(image.with_pixels(out))
}
