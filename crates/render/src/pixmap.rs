//! Probe surface backed by a tiny-skia pixmap
//!
//! Glyph outlines come from registered font programs parsed with ttf-parser.
//! Text is laid out unshaped (one glyph per char, horizontal advances only),
//! which is enough to find the topmost painted row.

use crate::font_metrics::{FontDescriptor, FontError, ProbeSurface, TextBaseline, PROBE_CANVAS_SIZE};
use std::collections::HashMap;
use std::sync::Arc;
use tiny_skia::{Color, FillRule, Paint, Path, PathBuilder, Pixmap, Transform};
use ttf_parser::{GlyphId, OutlineBuilder};

/// White-background raster that paints black glyph outlines
pub struct PixmapProbeSurface {
    pixmap: Pixmap,
    fonts: HashMap<String, Arc<Vec<u8>>>,
}

impl PixmapProbeSurface {
    /// Create a surface of the standard probe size
    pub fn new() -> Result<Self, FontError> {
        Self::with_size(PROBE_CANVAS_SIZE, PROBE_CANVAS_SIZE)
    }

    /// Create a surface with explicit dimensions
    pub fn with_size(width: u32, height: u32) -> Result<Self, FontError> {
        let mut pixmap =
            Pixmap::new(width, height).ok_or(FontError::PixmapAllocation { width, height })?;
        pixmap.fill(Color::WHITE);
        Ok(Self {
            pixmap,
            fonts: HashMap::new(),
        })
    }

    /// Register a font program under a family name
    ///
    /// The data is validated up front so later paints only fail on lookup.
    pub fn register_font(&mut self, family: &str, data: Vec<u8>) -> Result<(), FontError> {
        ttf_parser::Face::parse(&data, 0).map_err(|err| FontError::Parse(err.to_string()))?;
        self.fonts.insert(family.to_ascii_lowercase(), Arc::new(data));
        Ok(())
    }

    /// Whether any font is registered for `family`
    pub fn has_family(&self, family: &str) -> bool {
        self.fonts.contains_key(&family.to_ascii_lowercase())
    }

    fn resolve(&self, font: &FontDescriptor) -> Option<Arc<Vec<u8>>> {
        font.families()
            .find_map(|name| self.fonts.get(&name.to_ascii_lowercase()))
            .cloned()
    }
}

impl ProbeSurface for PixmapProbeSurface {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn clear(&mut self) {
        self.pixmap.fill(Color::WHITE);
    }

    fn fill_text(
        &mut self,
        font: &FontDescriptor,
        text: &str,
        x: f32,
        y: f32,
        baseline: TextBaseline,
    ) -> Result<(), FontError> {
        let data = self
            .resolve(font)
            .ok_or_else(|| FontError::UnknownFamily(font.family.clone()))?;
        let face =
            ttf_parser::Face::parse(&data, 0).map_err(|err| FontError::Parse(err.to_string()))?;

        let scale = font.size_px / face.units_per_em().max(1) as f32;
        let baseline_y = match baseline {
            TextBaseline::Alphabetic => y,
            TextBaseline::Top => y + face.ascender() as f32 * scale,
        };

        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, 255);
        paint.anti_alias = true;

        let mut pen_x = x;
        for ch in text.chars() {
            let Some(glyph) = face.glyph_index(ch) else {
                pen_x += font.size_px * 0.5;
                continue;
            };

            let mut builder = GlyphPathBuilder::new(pen_x, baseline_y, scale);
            if face.outline_glyph(glyph, &mut builder).is_some() {
                if let Some(path) = builder.finish() {
                    self.pixmap.fill_path(
                        &path,
                        &paint,
                        FillRule::Winding,
                        Transform::identity(),
                        None,
                    );
                }
            }

            pen_x += advance(&face, glyph, scale, font.size_px);
            if pen_x > self.pixmap.width() as f32 {
                break;
            }
        }

        Ok(())
    }

    fn row_has_ink(&self, y: u32) -> bool {
        let width = self.pixmap.width() as usize;
        let start = y as usize * width;
        self.pixmap
            .pixels()
            .get(start..start + width)
            .is_some_and(|row| row.iter().any(|px| px.red() < 255))
    }
}

fn advance(face: &ttf_parser::Face<'_>, glyph: GlyphId, scale: f32, size_px: f32) -> f32 {
    let advance = face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * scale;
    if advance > 0.0 {
        advance
    } else {
        size_px * 0.5
    }
}

/// Converts y-up font units into y-down raster pixels
struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }

    fn finish(self) -> Option<Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
