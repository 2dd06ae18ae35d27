//! Render-alignment pass
//!
//! The overlay draws text with a generic font, so each span's natural width
//! differs from the width of the same run on the raster. This pass measures
//! every span and records the correction that stretches it back onto the
//! raster glyphs.

use crate::text_layer::{Alignment, FontSpec, LayerTree, SpanRole};

/// Measures the advance width of a string
pub trait TextMeasure {
    /// Width of `text` in pixels when drawn with `font`
    fn measure_text(&mut self, text: &str, font: &FontSpec) -> f32;
}

/// Counters from one alignment pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignmentStats {
    /// Spans that received a correction
    pub aligned: usize,

    /// Whitespace-only spans left alone
    pub whitespace: usize,

    /// Spans that measured zero width
    pub zero_width: usize,
}

/// Compute the correction for one span
pub fn compute_alignment(
    text: &str,
    design_width: f32,
    measured: f32,
    role: SpanRole,
    angle_deg: f32,
) -> Alignment {
    if measured <= 0.0 {
        return Alignment::Unaligned;
    }

    let char_count = text.chars().count();
    if char_count == 1 {
        Alignment::FixedWidth(design_width)
    } else if angle_deg == 0.0 || role == SpanRole::Inline {
        Alignment::LetterSpacing((design_width - measured) / char_count as f32)
    } else {
        Alignment::Transform {
            rotation_deg: angle_deg,
            scale_x: design_width / measured,
        }
    }
}

/// Measure every non-whitespace span and store its alignment
pub fn align_spans<M>(tree: &mut LayerTree, measure: &mut M) -> AlignmentStats
where
    M: TextMeasure + ?Sized,
{
    let mut stats = AlignmentStats::default();

    for id in 0..tree.span_count() {
        let Some(span) = tree.span(id) else {
            continue;
        };
        if span.is_whitespace {
            stats.whitespace += 1;
            continue;
        }

        let Some(font) = tree.span_font(id).cloned() else {
            continue;
        };
        let angle_deg = tree.block(span.block).map_or(0.0, |block| block.angle_deg);
        let text = span.text().to_string();
        let (design_width, role) = (span.design_width, span.role);

        let measured = measure.measure_text(&text, &font);
        let alignment = compute_alignment(&text, design_width, measured, role, angle_deg);
        if alignment == Alignment::Unaligned {
            stats.zero_width += 1;
        } else {
            stats.aligned += 1;
        }

        if let Some(span) = tree.span_mut(id) {
            span.alignment = alignment;
        }
    }

    stats
}
