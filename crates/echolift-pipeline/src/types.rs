//! Shared types for the echolift enhancement pipeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::params::ParameterSet;
use crate::stage::StageKind;

/// Re-export `RgbImage` so callers can build inputs without depending
/// on `image` directly.
pub use image::RgbImage;

/// Re-export `RgbaImage` so callers can build inputs without depending
/// on `image` directly.
pub use image::RgbaImage;

/// Pixel layout of a [`RawImage`] buffer.
///
/// Only [`Rgb8`](Self::Rgb8) and [`Rgba8`](Self::Rgba8) can be enhanced.
/// The remaining variants exist so a decoded image can be handed to the
/// pipeline as-is and rejected with [`PipelineError::UnsupportedFormat`]
/// instead of being silently converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit grayscale.
    Luma8,
    /// 8-bit grayscale with alpha.
    LumaA8,
    /// Interleaved 8-bit RGB.
    Rgb8,
    /// Interleaved 8-bit RGBA.
    Rgba8,
    /// 16-bit grayscale (native endian).
    Luma16,
    /// 16-bit grayscale with alpha (native endian).
    LumaA16,
    /// Interleaved 16-bit RGB (native endian).
    Rgb16,
    /// Interleaved 16-bit RGBA (native endian).
    Rgba16,
    /// Interleaved 32-bit float RGB.
    Rgb32F,
    /// Interleaved 32-bit float RGBA.
    Rgba32F,
}

impl PixelFormat {
    /// Number of channels per pixel.
    #[must_use]
    pub const fn channels(self) -> usize {
        match self {
            Self::Luma8 | Self::Luma16 => 1,
            Self::LumaA8 | Self::LumaA16 => 2,
            Self::Rgb8 | Self::Rgb16 | Self::Rgb32F => 3,
            Self::Rgba8 | Self::Rgba16 | Self::Rgba32F => 4,
        }
    }

    /// Number of bytes per channel sample.
    #[must_use]
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::Luma8 | Self::LumaA8 | Self::Rgb8 | Self::Rgba8 => 1,
            Self::Luma16 | Self::LumaA16 | Self::Rgb16 | Self::Rgba16 => 2,
            Self::Rgb32F | Self::Rgba32F => 4,
        }
    }

    /// Number of bytes per pixel.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        self.channels() * self.bytes_per_sample()
    }

    /// Whether the last channel is alpha.
    #[must_use]
    pub const fn has_alpha(self) -> bool {
        matches!(
            self,
            Self::LumaA8 | Self::LumaA16 | Self::Rgba8 | Self::Rgba16 | Self::Rgba32F
        )
    }

    /// Whether the enhancement stages can process this format.
    #[must_use]
    pub const fn is_enhanceable(self) -> bool {
        matches!(self, Self::Rgb8 | Self::Rgba8)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// An immutable, decoded pixel buffer.
///
/// The buffer is reference counted: cloning a `RawImage` is cheap and
/// the clone shares its pixels with the source (see
/// [`shares_buffer`](Self::shares_buffer)). No operation in this crate
/// writes into an existing buffer; every stage allocates its output.
///
/// Equality compares dimensions, format and pixel bytes, so two images
/// are equal exactly when they are pixel-identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawImageProxy", into = "RawImageProxy")]
pub struct RawImage {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Arc<[u8]>,
}

impl RawImage {
    /// Wrap an interleaved pixel buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::BufferSizeMismatch`] if `pixels` does not
    /// hold exactly `width * height` pixels of `format`.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> Result<Self, PipelineError> {
        let expected = buffer_len(width, height, format);
        if pixels.len() != expected {
            return Err(PipelineError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self::from_parts(width, height, format, pixels))
    }

    /// Build an image whose buffer length is already known to match.
    pub(crate) fn from_parts(width: u32, height: u32, format: PixelFormat, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), buffer_len(width, height, format));
        Self {
            width,
            height,
            format,
            pixels: pixels.into(),
        }
    }

    /// Build an image without checking the buffer length.
    #[cfg(test)]
    pub(crate) fn unchecked(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> Self {
        Self {
            width,
            height,
            format,
            pixels: pixels.into(),
        }
    }

    /// Build a new image with the same geometry and format as `self`.
    pub(crate) fn with_pixels(&self, pixels: Vec<u8>) -> Self {
        Self::from_parts(self.width, self.height, self.format, pixels)
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width and height.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Pixel layout of the buffer.
    #[must_use]
    pub const fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw interleaved pixel bytes, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns `true` if either dimension is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns `true` if `self` and `other` point at the same pixel buffer.
    #[must_use]
    pub fn shares_buffer(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }

    /// The bytes of the pixel at `(x, y)`, or `None` if out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let start = (y as usize * self.width as usize + x as usize) * bpp;
        self.pixels.get(start..start + bpp)
    }

    /// Convert into an `image` crate buffer for encoding or display.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnsupportedFormat`] for formats wider than
    /// 8 bits per sample.
    pub fn to_dynamic(&self) -> Result<image::DynamicImage, PipelineError> {
        let (w, h, raw) = (self.width, self.height, self.pixels.to_vec());
        let converted = match self.format {
            PixelFormat::Luma8 => image::GrayImage::from_raw(w, h, raw).map(Into::into),
            PixelFormat::LumaA8 => image::GrayAlphaImage::from_raw(w, h, raw).map(Into::into),
            PixelFormat::Rgb8 => RgbImage::from_raw(w, h, raw).map(Into::into),
            PixelFormat::Rgba8 => RgbaImage::from_raw(w, h, raw).map(Into::into),
            other => return Err(PipelineError::UnsupportedFormat(other)),
        };
        converted.ok_or(PipelineError::BufferSizeMismatch {
            expected: buffer_len(w, h, self.format),
            actual: self.pixels.len(),
        })
    }
}

impl From<RgbImage> for RawImage {
    fn from(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_parts(width, height, PixelFormat::Rgb8, image.into_raw())
    }
}

impl From<RgbaImage> for RawImage {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_parts(width, height, PixelFormat::Rgba8, image.into_raw())
    }
}

impl From<image::DynamicImage> for RawImage {
    /// Keep the decoder's pixel layout so unsupported formats surface as
    /// [`PipelineError::UnsupportedFormat`] at `run` time.
    fn from(image: image::DynamicImage) -> Self {
        use image::DynamicImage as D;

        let (width, height) = (image.width(), image.height());
        let format = match &image {
            D::ImageLuma8(_) => PixelFormat::Luma8,
            D::ImageLumaA8(_) => PixelFormat::LumaA8,
            D::ImageRgb8(_) => PixelFormat::Rgb8,
            D::ImageRgba8(_) => PixelFormat::Rgba8,
            D::ImageLuma16(_) => PixelFormat::Luma16,
            D::ImageLumaA16(_) => PixelFormat::LumaA16,
            D::ImageRgb16(_) => PixelFormat::Rgb16,
            D::ImageRgba16(_) => PixelFormat::Rgba16,
            D::ImageRgb32F(_) => PixelFormat::Rgb32F,
            D::ImageRgba32F(_) => PixelFormat::Rgba32F,
            _ => return Self::from(image.to_rgba8()),
        };
        Self::from_parts(width, height, format, image.as_bytes().to_vec())
    }
}

/// Expected buffer length in bytes for the given geometry.
fn buffer_len(width: u32, height: u32, format: PixelFormat) -> usize {
    width as usize * height as usize * format.bytes_per_pixel()
}

/// Serde-compatible proxy for `RawImage`.
///
/// Deserialization goes through [`RawImage::new`] so a mismatched
/// buffer length is rejected.
#[derive(Serialize, Deserialize)]
struct RawImageProxy {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl From<RawImage> for RawImageProxy {
    fn from(image: RawImage) -> Self {
        Self {
            width: image.width,
            height: image.height,
            format: image.format,
            pixels: image.pixels.to_vec(),
        }
    }
}

impl TryFrom<RawImageProxy> for RawImage {
    type Error = PipelineError;

    fn try_from(proxy: RawImageProxy) -> Result<Self, Self::Error> {
        Self::new(proxy.width, proxy.height, proxy.format, proxy.pixels)
    }
}

/// Result of one enhancement run.
///
/// Holds the untouched input alongside every stage output so callers
/// can diff stages or render a before/after comparison. `original`
/// shares its buffer with the image passed to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementResult {
    original: RawImage,
    denoised: RawImage,
    contrasted: RawImage,
    enhanced: RawImage,
    params: ParameterSet,
    label: String,
}

impl EnhancementResult {
    pub(crate) const fn new(
        original: RawImage,
        denoised: RawImage,
        contrasted: RawImage,
        enhanced: RawImage,
        params: ParameterSet,
        label: String,
    ) -> Self {
        Self {
            original,
            denoised,
            contrasted,
            enhanced,
            params,
            label,
        }
    }

    /// The input image, unmodified.
    #[must_use]
    pub const fn original(&self) -> &RawImage {
        &self.original
    }

    /// Output of the denoise stage.
    #[must_use]
    pub const fn denoised(&self) -> &RawImage {
        &self.denoised
    }

    /// Output of the contrast stage.
    #[must_use]
    pub const fn contrasted(&self) -> &RawImage {
        &self.contrasted
    }

    /// Final enhanced image (output of the sharpen stage).
    #[must_use]
    pub const fn enhanced(&self) -> &RawImage {
        &self.enhanced
    }

    /// Output of a given stage.
    #[must_use]
    pub const fn stage_output(&self, stage: StageKind) -> &RawImage {
        match stage {
            StageKind::Denoise => &self.denoised,
            StageKind::Contrast => &self.contrasted,
            StageKind::Sharpen => &self.enhanced,
        }
    }

    /// The (already clamped) parameters the run used.
    #[must_use]
    pub const fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// How the parameters were chosen: `"Manual"` or a preset's display
    /// name. Record stores keep this next to the enhanced image.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Dimensions shared by every image in the result.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.original.dimensions()
    }

    /// Consume the result, keeping only the original and enhanced images.
    #[must_use]
    pub fn into_comparison(self) -> (RawImage, RawImage) {
        (self.original, self.enhanced)
    }
}

/// Errors that can occur during pipeline processing.
///
/// Every variant is terminal for the run that produced it. The pipeline
/// never retries and never falls back to the unmodified input.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// The image has zero width or height.
    #[error("image has zero width or height")]
    EmptyImage,

    /// The pixel format is not interleaved 8-bit RGB or RGBA.
    #[error("unsupported pixel format {0:?}: expected 8-bit RGB or RGBA")]
    UnsupportedFormat(PixelFormat),

    /// A preset name did not match any known preset.
    #[error("unknown preset {0:?}")]
    UnknownPreset(String),

    /// A pixel buffer's length does not match its declared geometry.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSizeMismatch {
        /// Length implied by width, height and format.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// A filter stage failed after the input passed validation.
    #[error("{stage} stage failed: {source}")]
    StageFailure {
        /// The stage that failed.
        stage: StageKind,
        /// What went wrong inside the stage.
        source: Box<PipelineError>,
    },
}
