//! Software rasterizer for the ticket display list

use image::imageops::{self, FilterType};
use image::{Rgba as Pixel, RgbaImage};
use rustybuzz::ttf_parser::{GlyphId, OutlineBuilder};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

use crate::assets::AssetSet;
use crate::rendering::compose::TicketView;
use crate::rendering::font;
use crate::rendering::layout::{layout_ticket, Rect, MAX_CARD_WIDTH};
use crate::rendering::paint::{build_display_list, ImageSlot, PaintCommand, Rgba, TextSpan};
use crate::rendering::{Capture, CaptureRegion, RasterBuffer, MAX_SCALE};
use crate::{Error, Result};

/// Source-over compositing of a straight-alpha colour onto `dst`.
fn blend(dst: &mut Pixel<u8>, src: [u8; 4]) {
    let sa = src[3] as u32;
    if sa == 0 {
        return;
    }
    if sa == 255 {
        dst.0 = src;
        return;
    }
    let da = dst.0[3] as u32;
    let inv = 255 - sa;
    let out_a = sa * 255 + da * inv; // scaled by 255
    if out_a == 0 {
        dst.0 = [0, 0, 0, 0];
        return;
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (src[c] as u32 * sa * 255 + dst.0[c] as u32 * da * inv) / out_a;
        out[c] = v.min(255) as u8;
    }
    out[3] = (out_a / 255).min(255) as u8;
    dst.0 = out;
}

/// Whether the pixel at (px, py) lies inside `rect` with corner radius `r`.
/// Works on doubled coordinates so pixel centres stay integral.
fn inside_rounded(px: i32, py: i32, rect: &Rect, r: u32) -> bool {
    if r == 0 {
        return true;
    }
    let r = r as i64 * 2;
    let cx = 2 * px as i64 + 1;
    let cy = 2 * py as i64 + 1;
    let (left, right) = (2 * rect.x as i64, 2 * rect.right() as i64);
    let (top, bottom) = (2 * rect.y as i64, 2 * rect.bottom() as i64);
    let ox = if cx < left + r {
        left + r
    } else if cx > right - r {
        right - r
    } else {
        return true;
    };
    let oy = if cy < top + r {
        top + r
    } else if cy > bottom - r {
        bottom - r
    } else {
        return true;
    };
    let (dx, dy) = (cx - ox, cy - oy);
    dx * dx + dy * dy <= r * r
}

/// Intersect `rect` with the canvas; returns pixel ranges.
fn clamp_to(canvas: &RgbaImage, rect: &Rect) -> Option<(u32, u32, u32, u32)> {
    let x0 = rect.x.max(0);
    let y0 = rect.y.max(0);
    let x1 = rect.right().min(canvas.width() as i32);
    let y1 = rect.bottom().min(canvas.height() as i32);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

fn fill_rect(canvas: &mut RgbaImage, rect: &Rect, radius: u32, rgba: Rgba) {
    let Some((x0, y0, x1, y1)) = clamp_to(canvas, rect) else {
        return;
    };
    let src = [rgba.0, rgba.1, rgba.2, rgba.3];
    for y in y0..y1 {
        for x in x0..x1 {
            if inside_rounded(x as i32, y as i32, rect, radius) {
                blend(canvas.get_pixel_mut(x, y), src);
            }
        }
    }
}

/// Scale `src` to exactly `w`x`h`, either stretched or cropped to cover.
fn fit_image(src: &RgbaImage, w: u32, h: u32, cover: bool) -> RgbaImage {
    if !cover || src.width() == 0 || src.height() == 0 {
        return imageops::resize(src, w, h, FilterType::Triangle);
    }
    let sx = w as f64 / src.width() as f64;
    let sy = h as f64 / src.height() as f64;
    let s = sx.max(sy);
    let rw = ((src.width() as f64 * s).ceil() as u32).max(w);
    let rh = ((src.height() as f64 * s).ceil() as u32).max(h);
    let resized = imageops::resize(src, rw, rh, FilterType::Triangle);
    imageops::crop_imm(&resized, (rw - w) / 2, (rh - h) / 2, w, h).to_image()
}

fn draw_image(canvas: &mut RgbaImage, src: &RgbaImage, rect: &Rect, radius: u32, cover: bool) {
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    let fitted = fit_image(src, rect.width, rect.height, cover);
    let Some((x0, y0, x1, y1)) = clamp_to(canvas, rect) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            if !inside_rounded(x as i32, y as i32, rect, radius) {
                continue;
            }
            let sp = fitted.get_pixel((x as i32 - rect.x) as u32, (y as i32 - rect.y) as u32).0;
            blend(canvas.get_pixel_mut(x, y), sp);
        }
    }
}

/// Feeds glyph outlines (font units, y up) into a device-space path.
struct GlyphPen<'a> {
    builder: &'a mut PathBuilder,
    origin_x: f32,
    baseline: f32,
    k: f32,
}

impl GlyphPen<'_> {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.k, self.baseline - y * self.k)
    }
}

impl OutlineBuilder for GlyphPen<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Shape and fill a line of spans, centered in `line`, clipped to `clip`.
/// All geometry is in device pixels.
fn draw_text(
    canvas: &mut RgbaImage,
    line: &Rect,
    spans: &[TextSpan],
    size: f32,
    rgba: Rgba,
    clip: &Rect,
) -> Result<()> {
    let runs = spans
        .iter()
        .map(|span| font::shape(&span.text, span.weight))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| Error::CaptureFailure("embedded font could not be parsed".into()))?;
    let total: f32 = runs.iter().map(|run| run.width(size)).sum();
    if total <= 0.0 {
        return Ok(());
    }

    // the coverage mask spans the visible part of the clip box, origin (x0, y0)
    let x0 = clip.x.max(0);
    let y0 = clip.y.max(0);
    let x1 = clip.right().min(canvas.width() as i32);
    let y1 = clip.bottom().min(canvas.height() as i32);
    if x0 >= x1 || y0 >= y1 {
        return Ok(());
    }
    let Some(mut mask) = Pixmap::new((x1 - x0) as u32, (y1 - y0) as u32) else {
        return Ok(());
    };

    let mut builder = PathBuilder::new();
    let mut pen_x = line.x as f32 + (line.width as f32 - total) / 2.0 - x0 as f32;
    for run in &runs {
        let k = run.px_per_unit(size);
        let baseline = line.y as f32 + run.baseline(size, line.height as f32) - y0 as f32;
        if let Some(face) = run.weight.face() {
            for glyph in run.glyphs.iter().filter(|g| g.id != 0) {
                let mut pen = GlyphPen {
                    builder: &mut builder,
                    origin_x: pen_x + glyph.x as f32 * k,
                    baseline: baseline - glyph.y as f32 * k,
                    k,
                };
                face.outline_glyph(GlyphId(glyph.id), &mut pen);
            }
        }
        pen_x += run.width(size);
    }
    let Some(path) = builder.finish() else {
        return Ok(());
    };

    let mut paint = Paint::default();
    paint.set_color_rgba8(255, 255, 255, 255);
    paint.anti_alias = true;
    mask.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);

    let width = mask.width();
    for (i, px) in mask.pixels().iter().enumerate() {
        let coverage = px.alpha() as u32;
        if coverage == 0 {
            continue;
        }
        let x = x0 as u32 + i as u32 % width;
        let y = y0 as u32 + i as u32 / width;
        let alpha = (rgba.3 as u32 * coverage + 127) / 255;
        blend(canvas.get_pixel_mut(x, y), [rgba.0, rgba.1, rgba.2, alpha as u8]);
    }
    Ok(())
}

/// Execute a display list onto a transparent canvas of `size` (CSS px) at `scale`.
pub fn rasterize(
    commands: &[PaintCommand],
    size: (u32, u32),
    scale: u32,
    assets: &AssetSet,
) -> Result<RasterBuffer> {
    let mut buffer = RasterBuffer::try_new(
        size.0.saturating_mul(scale),
        size.1.saturating_mul(scale),
    )?;
    let canvas = buffer.image_mut();

    for cmd in commands {
        match cmd {
            PaintCommand::SolidRect { rect, radius, rgba } => {
                fill_rect(canvas, &rect.scaled(scale), radius * scale, *rgba);
            }
            PaintCommand::Image {
                rect,
                slot,
                radius,
                cover,
            } => {
                let src = match slot {
                    ImageSlot::Background => assets.background.as_ref(),
                    ImageSlot::Logo => assets.logo.as_ref(),
                };
                if let Some(src) = src {
                    draw_image(canvas, src, &rect.scaled(scale), radius * scale, *cover);
                }
            }
            PaintCommand::Text {
                line,
                spans,
                size,
                rgba,
                clip,
            } => {
                draw_text(
                    canvas,
                    &line.scaled(scale),
                    spans,
                    (size * scale) as f32,
                    *rgba,
                    &clip.scaled(scale),
                )?;
            }
        }
    }

    Ok(buffer)
}

/// The default capture backend: layout, paint, and rasterize in software.
#[derive(Debug, Default, Clone)]
pub struct Rasterizer;

impl Rasterizer {
    pub fn new() -> Self {
        Rasterizer
    }
}

impl Capture for Rasterizer {
    fn capture(&mut self, region: &CaptureRegion, view: &TicketView) -> Result<RasterBuffer> {
        if region.scale == 0 || region.scale > MAX_SCALE {
            return Err(Error::CaptureFailure(format!(
                "Unsupported oversampling factor {}",
                region.scale
            )));
        }
        if region.card_width > MAX_CARD_WIDTH {
            return Err(Error::CaptureFailure(format!(
                "Card width {}px exceeds {}px",
                region.card_width, MAX_CARD_WIDTH
            )));
        }
        let nodes = layout_ticket(view, region.card_width);
        let card = nodes
            .first()
            .map(|n| n.lb.rect)
            .ok_or_else(|| Error::CaptureFailure("Empty layout".into()))?;
        let commands = build_display_list(&nodes, &region.assets);
        let buffer = rasterize(
            &commands,
            (card.width, card.height),
            region.scale,
            &region.assets,
        )?;
        log::debug!(
            "captured {}x{} css px at {}x -> {}x{}",
            card.width,
            card.height,
            region.scale,
            buffer.width(),
            buffer.height()
        );
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::TicketFields;
    use crate::rendering::compose::compose;
    use crate::rendering::paint::{RED_600, WHITE};
    use std::sync::Arc;

    fn region(assets: AssetSet) -> CaptureRegion {
        CaptureRegion {
            assets: Arc::new(assets),
            ..CaptureRegion::new(512, 2)
        }
    }

    fn capture(fields: TicketFields) -> RasterBuffer {
        Rasterizer::new()
            .capture(&region(AssetSet::default()), &compose(&fields))
            .unwrap()
    }

    fn red_pixels_in(buf: &RasterBuffer, css: Rect) -> usize {
        let r = css.scaled(2);
        let mut n = 0;
        for y in r.y as u32..r.bottom() as u32 {
            for x in r.x as u32..r.right() as u32 {
                let p = buf.pixel(x, y);
                if p[0] > 150 && p[1] < 120 && p[2] < 120 {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn blend_over_transparent_keeps_source() {
        let mut p = Pixel([0, 0, 0, 0]);
        blend(&mut p, [10, 20, 30, 128]);
        assert_eq!(p.0, [10, 20, 30, 128]);
        let mut q = Pixel([255, 255, 255, 255]);
        blend(&mut q, [0, 0, 0, 0]);
        assert_eq!(q.0, [255, 255, 255, 255]);
    }

    #[test]
    fn rounded_corners_exclude_the_corner_pixel() {
        let r = Rect::new(0, 0, 20, 20);
        assert!(!inside_rounded(0, 0, &r, 8));
        assert!(inside_rounded(10, 10, &r, 8));
        assert!(inside_rounded(0, 10, &r, 8));
        assert!(inside_rounded(0, 0, &r, 0));
    }

    #[test]
    fn capture_is_oversampled_and_transparent_outside_boxes() {
        let view = compose(&TicketFields::default());
        let css = layout_ticket(&view, 512)[0].lb.rect;
        let buf = Rasterizer::new().capture(&region(AssetSet::default()), &view).unwrap();
        assert_eq!(buf.width(), css.width * 2);
        assert_eq!(buf.height(), css.height * 2);
        // no background asset: the capture adds no colour
        assert_eq!(buf.pixel(0, 0), [0, 0, 0, 0]);
        assert_eq!(buf.pixel(buf.width() - 1, buf.height() - 1), [0, 0, 0, 0]);
    }

    #[test]
    fn pills_are_painted_white_with_red_text() {
        let view = compose(&TicketFields {
            person_name: "Ali".into(),
            ..Default::default()
        });
        let buf = Rasterizer::new().capture(&region(AssetSet::default()), &view).unwrap();
        let pixels: Vec<[u8; 4]> = buf.image().pixels().map(|p| p.0).collect();
        let white = [WHITE.0, WHITE.1, WHITE.2, WHITE.3];
        let red = [RED_600.0, RED_600.1, RED_600.2, RED_600.3];
        assert!(pixels.contains(&white));
        assert!(pixels.contains(&red));
    }

    #[test]
    fn background_asset_covers_the_card() {
        let bg = RgbaImage::from_pixel(10, 5, Pixel([0, 0, 255, 255]));
        let assets = AssetSet {
            logo: None,
            background: Some(bg),
        };
        let view = compose(&TicketFields::default());
        let buf = Rasterizer::new().capture(&region(assets), &view).unwrap();
        // interior near the left edge, outside every box
        let p = buf.pixel(8, buf.height() / 2);
        assert!(p[0] < 5 && p[1] < 5 && p[2] > 250 && p[3] > 250, "got {:?}", p);
        // rounded card corner stays transparent
        assert_eq!(buf.pixel(0, 0)[3], 0);
    }

    #[test]
    fn different_arabic_words_produce_different_pixels() {
        let with_event = |name: &str| TicketFields {
            event_name: name.into(),
            ..Default::default()
        };
        let a = capture(with_event("الدب"));
        let b = capture(with_event("ابتث"));
        assert_ne!(a.image().as_raw(), b.image().as_raw());

        // the event pill carries red ink and nothing outside it changed
        let event_pill = Rect::new(264, 248, 224, 48);
        assert!(red_pixels_in(&a, event_pill) > 50);
        let name_pill = Rect::new(24, 184, 464, 48);
        let s = name_pill.scaled(2);
        for y in s.y as u32..s.bottom() as u32 {
            for x in s.x as u32..s.right() as u32 {
                assert_eq!(a.pixel(x, y), b.pixel(x, y));
            }
        }
    }

    #[test]
    fn placeholders_are_drawn_as_shaped_arabic() {
        let buf = capture(TicketFields::default());
        // every pill and panel shows its placeholder text
        for rect in [
            Rect::new(24, 184, 464, 48),
            Rect::new(24, 248, 224, 48),
            Rect::new(264, 248, 224, 48),
            Rect::new(24, 312, 224, 96),
            Rect::new(264, 312, 224, 96),
        ] {
            assert!(red_pixels_in(&buf, rect) > 50, "no ink in {:?}", rect);
        }
    }

    #[test]
    fn text_is_centered_in_its_pill() {
        let buf = capture(TicketFields {
            person_name: "Ali".into(),
            ..Default::default()
        });
        let pill = Rect::new(24, 184, 464, 48).scaled(2);
        let (mut min_x, mut max_x) = (u32::MAX, 0);
        for y in pill.y as u32..pill.bottom() as u32 {
            for x in pill.x as u32..pill.right() as u32 {
                let p = buf.pixel(x, y);
                if p[0] > 150 && p[1] < 120 {
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                }
            }
        }
        assert!(min_x < max_x);
        let centre = (pill.x + pill.width as i32 / 2) as i64;
        let ink_centre = (min_x as i64 + max_x as i64) / 2;
        assert!((ink_centre - centre).abs() <= 4, "{} vs {}", ink_centre, centre);
    }

    #[test]
    fn oversized_width_is_rejected() {
        let view = compose(&TicketFields::default());
        let r = CaptureRegion::new(3_000_000_000, 2);
        assert!(matches!(
            Rasterizer::new().capture(&r, &view),
            Err(Error::CaptureFailure(_))
        ));
    }

    #[test]
    fn invalid_scale_is_rejected() {
        let mut r = region(AssetSet::default());
        r.scale = 0;
        let view = compose(&TicketFields::default());
        assert!(matches!(
            Rasterizer::new().capture(&r, &view),
            Err(Error::CaptureFailure(_))
        ));
    }
}
