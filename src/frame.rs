//! The exported frame and the raster surface it is drawn on.

use std::{sync::Arc, time::Duration};

use image::{RgbImage, codecs::jpeg::JpegEncoder};

use crate::error::ExtractionError;

/// Largest width or height accepted for the off-screen surface.
pub const MAX_SURFACE_DIMENSION: u32 = 16_384;

/// A last frame, encoded as JPEG and ready to be downloaded.
///
/// Created once per successful run. Cloning shares the encoded bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFrame {
    pub(crate) jpeg: Arc<[u8]>,
    pub(crate) file_name: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) position: Duration,
    pub(crate) duration: Duration,
}

impl ExtractedFrame {
    /// The encoded JPEG payload.
    pub fn bytes(&self) -> &[u8] {
        &self.jpeg
    }

    /// Suggested download name, `<base-name>_last_frame.jpg`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Pixel dimensions `(width, height)`, equal to the video's native size.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Timeline position the seek landed on.
    ///
    /// Can be slightly before [`duration`](ExtractedFrame::duration) because
    /// the last decodable frame rarely sits exactly at the reported end.
    pub fn position(&self) -> Duration {
        self.position
    }

    /// Duration the stream reported when metadata became ready.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Allocate a blank surface of `width` × `height`.
///
/// # Errors
///
/// [`ExtractionError::RenderFailed`] for empty or oversized dimensions.
pub(crate) fn allocate_surface(width: u32, height: u32) -> Result<RgbImage, ExtractionError> {
    if width == 0 || height == 0 {
        return Err(ExtractionError::RenderFailed(format!(
            "cannot draw onto a {width}x{height} surface"
        )));
    }
    if width > MAX_SURFACE_DIMENSION || height > MAX_SURFACE_DIMENSION {
        return Err(ExtractionError::RenderFailed(format!(
            "{width}x{height} exceeds the maximum surface size of {MAX_SURFACE_DIMENSION}x{MAX_SURFACE_DIMENSION}"
        )));
    }
    Ok(RgbImage::new(width, height))
}

/// Encode `surface` as a baseline JPEG at `quality` (1–100).
///
/// # Errors
///
/// [`ExtractionError::RenderFailed`] if the encoder rejects the image.
pub fn encode_jpeg(surface: &RgbImage, quality: u8) -> Result<Vec<u8>, ExtractionError> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(surface)
        .map_err(|error| ExtractionError::RenderFailed(format!("JPEG encoding failed: {error}")))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surfaces_reject_degenerate_sizes() {
        assert!(matches!(
            allocate_surface(0, 480),
            Err(ExtractionError::RenderFailed(_))
        ));
        assert!(matches!(
            allocate_surface(MAX_SURFACE_DIMENSION + 1, 2),
            Err(ExtractionError::RenderFailed(_))
        ));
        assert_eq!(allocate_surface(4, 3).unwrap().dimensions(), (4, 3));
    }

    #[test]
    fn encoded_jpeg_decodes_to_same_size() {
        let surface = RgbImage::from_pixel(32, 18, image::Rgb([200, 40, 90]));
        let bytes = encode_jpeg(&surface, 100).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 18));
    }
}
