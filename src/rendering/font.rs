//! Text shaping against the embedded DejaVu Sans faces.
//!
//! Runs are shaped with rustybuzz, so Arabic gets its joined contextual forms
//! and right-to-left visual order. Glyph positions stay in font units; the
//! rasterizer scales them to device pixels.

use rustybuzz::{Direction, Face, UnicodeBuffer};

static REGULAR: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Weight {
    #[default]
    Regular,
    Bold,
}

impl Weight {
    fn data(self) -> &'static [u8] {
        match self {
            Weight::Regular => REGULAR,
            Weight::Bold => BOLD,
        }
    }

    /// Parse the embedded face for this weight.
    pub fn face(self) -> Option<Face<'static>> {
        Face::from_slice(self.data(), 0)
    }
}

/// A glyph relative to the start of its run, in font units (y up).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedGlyph {
    pub id: u16,
    pub x: i32,
    pub y: i32,
}

/// A shaped run of one weight, in visual (left-to-right) order.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedRun {
    pub weight: Weight,
    pub direction: Direction,
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    pub glyphs: Vec<PlacedGlyph>,
    /// Total advance in font units.
    pub advance: i32,
}

impl ShapedRun {
    pub fn px_per_unit(&self, size: f32) -> f32 {
        size / f32::from(self.units_per_em.max(1))
    }

    pub fn width(&self, size: f32) -> f32 {
        self.advance as f32 * self.px_per_unit(size)
    }

    /// Offset of the baseline from the top of a line box, with the leading
    /// split evenly above and below the glyph box.
    pub fn baseline(&self, size: f32, line_height: f32) -> f32 {
        let k = self.px_per_unit(size);
        let content = (f32::from(self.ascender) - f32::from(self.descender)) * k;
        (line_height - content) / 2.0 + f32::from(self.ascender) * k
    }
}

/// Right-to-left as soon as the text holds a Hebrew or Arabic code point.
pub fn detect_direction(text: &str) -> Direction {
    let rtl = text.chars().any(|ch| {
        matches!(
            ch as u32,
            0x0590..=0x08FF | 0xFB1D..=0xFDFF | 0xFE70..=0xFEFF | 0x1EE00..=0x1EEFF
        )
    });
    if rtl {
        Direction::RightToLeft
    } else {
        Direction::LeftToRight
    }
}

/// Shape `text` with the face for `weight`.
///
/// Returns `None` only if the embedded face cannot be parsed.
pub fn shape(text: &str, weight: Weight) -> Option<ShapedRun> {
    let face = weight.face()?;
    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    buffer.set_direction(detect_direction(text));
    buffer.guess_segment_properties();
    let direction = buffer.direction();
    let output = rustybuzz::shape(&face, &[], buffer);

    let mut pen = 0i32;
    let mut glyphs = Vec::with_capacity(output.glyph_infos().len());
    for (info, pos) in output.glyph_infos().iter().zip(output.glyph_positions()) {
        glyphs.push(PlacedGlyph {
            id: info.glyph_id as u16,
            x: pen + pos.x_offset,
            y: pos.y_offset,
        });
        pen += pos.x_advance;
    }

    Some(ShapedRun {
        weight,
        direction,
        units_per_em: face.units_per_em() as u16,
        ascender: face.ascender() as i16,
        descender: face.descender() as i16,
        glyphs,
        advance: pen,
    })
}

/// Rendered width of `text` at `size` CSS px, rounded up.
pub fn text_width(text: &str, weight: Weight, size: u32) -> u32 {
    shape(text, weight)
        .map(|run| run.width(size as f32).ceil() as u32)
        .unwrap_or(0)
}
