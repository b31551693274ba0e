//! Single-page PDF wrapping a captured raster.
//!
//! The page is A4 wide and as tall as the bitmap's aspect ratio requires. The
//! PNG's compressed image data is embedded as-is (FlateDecode with PNG
//! predictors); alpha travels in a separate soft mask. No document ID or
//! timestamps are written, so the same raster always yields the same bytes.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::rendering::RasterBuffer;
use crate::{Error, Result};

pub const MM_PER_INCH: f64 = 25.4;
pub const POINTS_PER_INCH: f64 = 72.0;
pub const A4_WIDTH_MM: f64 = 210.0;
/// A4 width in PDF points (~595.28).
pub const A4_WIDTH_PT: f64 = A4_WIDTH_MM / MM_PER_INCH * POINTS_PER_INCH;

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// Page height that keeps the bitmap's aspect ratio at `page_width`.
pub fn page_height(bitmap_width: u32, bitmap_height: u32, page_width: f64) -> f64 {
    if bitmap_width == 0 {
        return 0.0;
    }
    bitmap_height as f64 * page_width / bitmap_width as f64
}

/// Concatenate the IDAT chunks of a PNG: a zlib stream of filtered scanlines.
fn png_idat(png: &[u8]) -> Result<Vec<u8>> {
    if png.len() < 8 || &png[..8] != PNG_SIGNATURE {
        return Err(Error::DocumentError("Not a PNG stream".into()));
    }
    let mut data = Vec::new();
    let mut pos = 8;
    while pos + 8 <= png.len() {
        let len = u32::from_be_bytes([png[pos], png[pos + 1], png[pos + 2], png[pos + 3]]) as usize;
        let kind = &png[pos + 4..pos + 8];
        let start = pos + 8;
        let end = start
            .checked_add(len)
            .filter(|end| end + 4 <= png.len())
            .ok_or_else(|| Error::DocumentError("Truncated PNG chunk".into()))?;
        match kind {
            b"IDAT" => data.extend_from_slice(&png[start..end]),
            b"IEND" => break,
            _ => {}
        }
        pos = end + 4; // skip CRC
    }
    if data.is_empty() {
        return Err(Error::DocumentError("PNG has no image data".into()));
    }
    Ok(data)
}

fn encode_channel_png(raw: &[u8], width: u32, height: u32, color: image::ColorType) -> Result<Vec<u8>> {
    use image::ImageEncoder;
    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out).write_image(raw, width, height, color)?;
    Ok(out)
}

fn image_stream(idat: Vec<u8>, width: u32, height: u32, colors: i64, color_space: &str) -> Stream {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
        "DecodeParms" => dictionary! {
            "Predictor" => 15,
            "Colors" => colors,
            "BitsPerComponent" => 8,
            "Columns" => i64::from(width),
        },
    };
    let mut stream = Stream::new(dict, idat);
    stream.allows_compression = false;
    stream
}

/// Build a one-page PDF showing `raster` across the full page.
pub fn build_document(raster: &RasterBuffer) -> Result<Vec<u8>> {
    let (w, h) = (raster.width(), raster.height());
    if w == 0 || h == 0 {
        return Err(Error::DocumentError("Cannot embed an empty raster".into()));
    }
    let page_w = A4_WIDTH_PT;
    let page_h = page_height(w, h, page_w);

    let rgba = raster.image().as_raw();
    let rgb: Vec<u8> = rgba.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect();
    let color_idat = png_idat(&encode_channel_png(&rgb, w, h, image::ColorType::Rgb8)?)?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut color = image_stream(color_idat, w, h, 3, "DeviceRGB");
    if !raster.is_opaque() {
        let alpha: Vec<u8> = rgba.chunks_exact(4).map(|p| p[3]).collect();
        let alpha_idat = png_idat(&encode_channel_png(&alpha, w, h, image::ColorType::L8)?)?;
        let smask_id = doc.add_object(image_stream(alpha_idat, w, h, 1, "DeviceGray"));
        color.dict.set("SMask", smask_id);
    }
    let image_id = doc.add_object(color);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(page_w as _),
                    0.into(),
                    0.into(),
                    Object::Real(page_h as _),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| Error::DocumentError(format!("Failed to encode page content: {}", e)))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), Object::Real(page_w as _), Object::Real(page_h as _)],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| Error::DocumentError(format!("Failed to write PDF: {}", e)))?;
    log::debug!(
        "built document {:.2}x{:.2} pt from {}x{} raster ({} bytes)",
        page_w,
        page_h,
        w,
        h,
        buffer.len()
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn a4_width_in_points() {
        assert!((A4_WIDTH_PT - 595.2756).abs() < 0.001);
    }

    #[test]
    fn page_height_keeps_aspect_ratio() {
        for (w, h) in [(1024u32, 1100u32), (100, 100), (3000, 17), (17, 3000)] {
            let ph = page_height(w, h, A4_WIDTH_PT);
            assert!((ph - h as f64 * A4_WIDTH_PT / w as f64).abs() < 0.01);
            assert!((ph / A4_WIDTH_PT - h as f64 / w as f64).abs() < 1e-9);
        }
        assert_eq!(page_height(0, 10, A4_WIDTH_PT), 0.0);
    }

    #[test]
    fn idat_extraction_rejects_non_png() {
        assert!(png_idat(b"not a png").is_err());
    }

    #[test]
    fn builds_single_page_pdf_with_proportional_mediabox() {
        let raster = RasterBuffer::from_image(RgbaImage::from_pixel(40, 20, Rgba([200, 10, 10, 255])));
        let bytes = build_document(&raster).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page = doc.get_dictionary(*pages.get(&1).unwrap()).unwrap();
        let media = page.get(b"MediaBox").unwrap().as_array().unwrap();
        let as_f64 = |o: &Object| match o {
            Object::Real(v) => *v as f64,
            Object::Integer(v) => *v as f64,
            _ => panic!("unexpected {:?}", o),
        };
        assert!((as_f64(&media[2]) - A4_WIDTH_PT).abs() < 0.01);
        assert!((as_f64(&media[3]) - A4_WIDTH_PT / 2.0).abs() < 0.01);
    }

    #[test]
    fn transparent_raster_gets_a_soft_mask() {
        let opaque = RasterBuffer::from_image(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255])));
        let clear = RasterBuffer::new(8, 8);
        let with_mask = |r: &RasterBuffer| {
            let doc = Document::load_mem(&build_document(r).unwrap()).unwrap();
            doc.objects.values().any(|o| match o {
                Object::Stream(s) => s.dict.get(b"SMask").is_ok(),
                _ => false,
            })
        };
        assert!(!with_mask(&opaque));
        assert!(with_mask(&clear));
    }

    #[test]
    fn same_raster_same_bytes() {
        let raster = RasterBuffer::from_image(RgbaImage::from_pixel(30, 70, Rgba([9, 9, 9, 128])));
        assert_eq!(build_document(&raster).unwrap(), build_document(&raster).unwrap());
    }
}
