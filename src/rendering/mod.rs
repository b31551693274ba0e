//! Ticket rendering: composition, layout, paint and raster.

pub mod compose;
pub mod font;
pub mod layout;
pub mod paint;
pub mod raster;

use std::io::Cursor;
use std::sync::Arc;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};

use crate::assets::AssetSet;
use crate::rendering::compose::TicketView;
use crate::{Error, Result};

/// Oversampling factor applied to captures unless configured otherwise.
pub const DEFAULT_SCALE: u32 = 2;
pub const MAX_SCALE: u32 = 8;
/// Largest bitmap a capture may allocate (256 MiB of RGBA).
pub const MAX_PIXELS: u64 = 1 << 26;

/// An RGBA bitmap of the capture region at device resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBuffer {
    image: RgbaImage,
}

impl RasterBuffer {
    /// A fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    /// Like `new`, but refuses empty or oversized bitmaps.
    pub fn try_new(width: u32, height: u32) -> Result<Self> {
        let pixels = u64::from(width) * u64::from(height);
        if pixels == 0 || pixels > MAX_PIXELS {
            return Err(Error::CaptureFailure(format!(
                "cannot allocate a {}x{} raster",
                width, height
            )));
        }
        Ok(Self::new(width, height))
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    /// True when every pixel is fully opaque.
    pub fn is_opaque(&self) -> bool {
        self.image.pixels().all(|p| p.0[3] == 255)
    }

    /// Encode as an RGBA PNG. The output carries no timestamps, so equal
    /// buffers always encode to equal bytes.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        PngEncoder::new(&mut out).write_image(
            self.image.as_raw(),
            self.width(),
            self.height(),
            ColorType::Rgba8,
        )?;
        Ok(out.into_inner())
    }
}

/// Handle to a mounted, painted capture region.
///
/// Obtaining one means the region's assets are decoded and its geometry is
/// fixed; the exporter refuses to capture without it.
#[derive(Debug, Clone)]
pub struct CaptureRegion {
    pub card_width: u32,
    pub scale: u32,
    pub assets: Arc<AssetSet>,
}

impl CaptureRegion {
    /// A region with no logo or background.
    pub fn new(card_width: u32, scale: u32) -> Self {
        Self {
            card_width,
            scale,
            assets: Arc::new(AssetSet::default()),
        }
    }
}

/// A rasterization backend. Runs on the exporter's worker thread.
pub trait Capture: Send {
    /// Paint `view` into a new bitmap at `region.scale` times CSS size.
    fn capture(&mut self, region: &CaptureRegion, view: &TicketView) -> Result<RasterBuffer>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_transparent() {
        let b = RasterBuffer::new(4, 3);
        assert_eq!(b.width(), 4);
        assert_eq!(b.height(), 3);
        assert_eq!(b.pixel(2, 1), [0, 0, 0, 0]);
        assert!(!b.is_opaque());
    }

    #[test]
    fn oversized_buffers_are_refused() {
        assert!(RasterBuffer::try_new(1024, 936).is_ok());
        assert!(RasterBuffer::try_new(0, 10).is_err());
        assert!(RasterBuffer::try_new(u32::MAX, u32::MAX).is_err());
        assert!(RasterBuffer::try_new(1 << 14, 1 << 13).is_err());
    }

    #[test]
    fn png_encoding_has_signature_and_is_stable() {
        let b = RasterBuffer::new(16, 8);
        let a = b.encode_png().unwrap();
        assert_eq!(&a[0..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(a, b.encode_png().unwrap());
    }
}
