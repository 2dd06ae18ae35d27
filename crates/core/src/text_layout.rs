//! Layout assembler: glyph runs to blocks, rows and spans
//!
//! Runs arrive one at a time in reading order. Each run either continues the
//! current row, starts the next row of the current block, or opens a new
//! block. The thresholds below were tuned against real documents and are
//! load-bearing; do not retune them without a reference corpus.

use crate::geometry::GlyphRunGeometry;
use crate::text_layer::{
    BlockId, FontSpec, LayerTree, LineContainer, Node, SpanId, SpanRole, TextSpan, VerticalScale,
};
use kurbo::Point;

/// Gaps wider than `font_height / WHITESPACE_GAP_DIVISOR` become whitespace nodes
const WHITESPACE_GAP_DIVISOR: f32 = 5.0;

/// A new row may start at most this many font heights from the block's x
const NEW_LINE_MAX_X_SHIFT: f32 = 8.0;

/// Row pitch must match the known line height within this fraction
const LINE_HEIGHT_TOLERANCE: f32 = 0.01;

/// Without a known line height, the first row pitch must be below this many font heights
const FIRST_LINE_MAX_PITCH: f32 = 1.5;

/// Where a run lands relative to the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Continues the current row
    SameLine,
    /// Starts the next row of the current block
    NewLine,
    /// Opens a new block
    NewBlock,
}

/// Streaming state carried from one run to the next
#[derive(Debug, Clone, Default)]
struct Cursor {
    block: Option<BlockId>,
    x: f32,
    x_end: f32,
    y: f32,
    y_start: f32,
    font_height: f32,
    font_name: String,
    font_family: String,
    line_height: f32,
    row_count: usize,
    last_inline: Option<SpanId>,
    block_building: bool,
}

/// Builds a [`LayerTree`] from glyph runs
#[derive(Debug, Clone)]
pub struct LayoutAssembler {
    tree: LayerTree,
    cursor: Cursor,
    multiline: bool,
}

impl Default for LayoutAssembler {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LayoutAssembler {
    /// Create an assembler; with `multiline` off every run opens a block
    pub fn new(multiline: bool) -> Self {
        Self {
            tree: LayerTree::new(),
            cursor: Cursor::default(),
            multiline,
        }
    }

    /// Drop everything built so far
    pub fn reset(&mut self) {
        self.tree = LayerTree::new();
        self.cursor = Cursor::default();
    }

    /// The tree built so far
    pub fn tree(&self) -> &LayerTree {
        &self.tree
    }

    /// Mutable access to the tree
    pub fn tree_mut(&mut self) -> &mut LayerTree {
        &mut self.tree
    }

    /// Finish the last block and hand over the tree
    pub fn into_tree(mut self) -> LayerTree {
        self.finalize();
        self.tree
    }

    /// Decide where `geom` goes without changing any state
    pub fn classify(&self, geom: &GlyphRunGeometry) -> Placement {
        let cursor = &self.cursor;
        if !self.multiline || geom.angle != 0.0 || cursor.block.is_none() {
            return Placement::NewBlock;
        }

        let font_height = geom.font_height();
        let same_height = font_height == cursor.font_height;
        let delta_x = (geom.x - cursor.x).abs();
        let delta_y = (geom.y - cursor.y).abs();

        let same_line = (same_height || cursor.block_building)
            && (geom.x - cursor.x_end).abs() < cursor.font_height
            && delta_y < cursor.font_height / 2.0;
        if same_line {
            return Placement::SameLine;
        }

        let known_pitch = cursor.line_height != 0.0
            && geom.y > cursor.y
            && (delta_y - cursor.line_height).abs() < cursor.line_height * LINE_HEIGHT_TOLERANCE;
        let first_pitch = cursor.line_height == 0.0
            && delta_y > font_height / 2.0
            && (cursor.block_building || geom.font_name == cursor.font_name)
            && delta_y < FIRST_LINE_MAX_PITCH * font_height;
        let new_line = same_height
            && delta_x < NEW_LINE_MAX_X_SHIFT * font_height
            && (known_pitch || first_pitch);
        if new_line {
            return Placement::NewLine;
        }

        Placement::NewBlock
    }

    /// Add one glyph run
    pub fn append(&mut self, geom: &GlyphRunGeometry) {
        let placement = self.classify(geom);
        log::trace!(
            "run at ({}, {}) font {} -> {:?}",
            geom.x,
            geom.y,
            geom.font_name,
            placement
        );

        match placement {
            Placement::SameLine => self.continue_line(geom),
            Placement::NewLine => self.start_line(geom),
            Placement::NewBlock => self.start_block(geom),
        }
    }

    /// Apply the pending line-height correction of the current block
    pub fn finalize(&mut self) {
        let cursor = &mut self.cursor;
        let Some(block_id) = cursor.block else {
            return;
        };
        if cursor.row_count == 0 {
            return;
        }

        let rows = cursor.row_count as f32;
        let total_y = cursor.y - cursor.y_start;
        let line_height_px = (total_y / rows).trunc();
        cursor.row_count = 0;

        if line_height_px <= 0.0 {
            log::debug!("block {block_id} has non-positive line height {line_height_px}, skipping scale");
            return;
        }

        let delta = cursor.font_height - cursor.line_height;
        let margin_top = (delta != 0.0).then(|| (delta / 2.0 + 0.5).floor());
        let scale = VerticalScale {
            line_height_px,
            scale_y: total_y / (rows * line_height_px),
            margin_top,
        };

        if let Some(block) = self.tree.block_mut(block_id) {
            block.vertical_scale = Some(scale);
        }
    }

    fn start_block(&mut self, geom: &GlyphRunGeometry) {
        self.finalize();

        let font_height = geom.font_height();
        self.cursor = Cursor {
            block: None,
            x: geom.x,
            x_end: geom.x_end(),
            y: geom.y,
            y_start: geom.y,
            font_height,
            font_name: geom.font_name.clone(),
            font_family: geom.font_family.clone(),
            line_height: 0.0,
            row_count: 0,
            last_inline: None,
            block_building: false,
        };

        let ascent = geom.ascent_px(font_height);
        let (sin, cos) = geom.angle.sin_cos();
        let origin = Point::new(
            (geom.x + ascent * sin) as f64,
            (geom.y - ascent * cos) as f64,
        );

        let block_id = self.tree.push_block(LineContainer {
            origin,
            angle_deg: geom.angle.to_degrees(),
            font: FontSpec::new(font_height, geom.font_family.clone()),
            font_name: geom.font_name.clone(),
            row_count: 0,
            line_height: 0.0,
            children: Vec::new(),
            block_building: false,
            vertical_scale: None,
        });
        self.tree
            .push_span(TextSpan::new(block_id, SpanRole::Block, geom.design_width()));
        self.cursor.block = Some(block_id);
    }

    fn continue_line(&mut self, geom: &GlyphRunGeometry) {
        let Some(block_id) = self.cursor.block else {
            return self.start_block(geom);
        };
        if !self.cursor.block_building {
            self.open_container(block_id);
        }

        let font_height = geom.font_height();
        let mut span = self.new_inline_span(block_id, geom);
        span.inline_block = true;

        let shift_x = geom.x - self.cursor.x_end;
        if shift_x != 0.0 {
            if shift_x > font_height / WHITESPACE_GAP_DIVISOR {
                if let Some(block) = self.tree.block_mut(block_id) {
                    block.children.push(Node::Whitespace { width: shift_x });
                }
            } else {
                span.margin_left = Some(shift_x);
            }
        }

        if let Some(previous) = self.cursor.last_inline.and_then(|id| self.tree.span_mut(id)) {
            previous.inline_block = true;
        }

        let span_id = self.tree.push_span(span);
        self.cursor.x_end = geom.x_end();
        if font_height == self.cursor.font_height {
            self.cursor.y = geom.y;
        }
        self.cursor.last_inline = Some(span_id);
    }

    fn start_line(&mut self, geom: &GlyphRunGeometry) {
        let Some(block_id) = self.cursor.block else {
            return self.start_block(geom);
        };
        if !self.cursor.block_building {
            self.open_container(block_id);
        }

        if self.cursor.line_height == 0.0 {
            self.cursor.line_height = (geom.y - self.cursor.y).abs();
        }
        self.cursor.row_count += 1;

        let mut span = self.new_inline_span(block_id, geom);
        let shift_x = geom.x - self.cursor.x;
        if shift_x != 0.0 {
            span.margin_left = Some(shift_x);
        }

        if let Some(block) = self.tree.block_mut(block_id) {
            block.children.push(Node::Line);
            block.row_count += 1;
            block.line_height = self.cursor.line_height;
        }
        let span_id = self.tree.push_span(span);

        self.cursor.y = geom.y;
        self.cursor.x_end = geom.x_end();
        self.cursor.last_inline = Some(span_id);
    }

    /// Turn a single-run block into a container of inline spans
    fn open_container(&mut self, block_id: BlockId) {
        let first = self.tree.block(block_id).and_then(|block| block.spans().next());
        if let Some(span) = first.and_then(|id| self.tree.span_mut(id)) {
            span.role = SpanRole::Inline;
        }
        if let Some(block) = self.tree.block_mut(block_id) {
            block.block_building = true;
        }
        self.cursor.block_building = true;
    }

    fn new_inline_span(&self, block_id: BlockId, geom: &GlyphRunGeometry) -> TextSpan {
        let font_height = geom.font_height();
        let mut span = TextSpan::new(block_id, SpanRole::Inline, geom.design_width());
        if font_height != self.cursor.font_height || geom.font_family != self.cursor.font_family {
            span.font = Some(FontSpec::new(font_height, geom.font_family.clone()));
            span.font_name = Some(geom.font_name.clone());
        }
        span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(x: f32, y: f32, width: f32) -> GlyphRunGeometry {
        GlyphRunGeometry::new(x, y, 12.0, width).with_font("f1", "serif")
    }

    fn assemble(runs: &[GlyphRunGeometry]) -> LayerTree {
        let mut assembler = LayoutAssembler::new(true);
        for geom in runs {
            assembler.append(geom);
        }
        assembler.into_tree()
    }

    #[test]
    fn test_first_run_opens_block() {
        let tree = assemble(&[run(10.0, 100.0, 50.0)]);
        assert_eq!(tree.block_count(), 1);
        assert_eq!(tree.span_count(), 1);

        let block = tree.block(0).unwrap();
        assert_eq!(block.origin, Point::new(10.0, 88.0));
        assert!(!block.block_building);
        assert_eq!(tree.span(0).unwrap().role, SpanRole::Block);
        assert_eq!(tree.span(0).unwrap().design_width, 50.0);
    }

    #[test]
    fn test_adjacent_runs_share_a_line() {
        let tree = assemble(&[run(0.0, 100.0, 50.0), run(52.0, 100.0, 40.0)]);

        assert_eq!(tree.block_count(), 1);
        let block = tree.block(0).unwrap();
        assert!(block.block_building);
        assert_eq!(block.row_count, 0);
        assert_eq!(block.children, vec![Node::Span(0), Node::Span(1)]);

        let second = tree.span(1).unwrap();
        assert_eq!(second.role, SpanRole::Inline);
        assert_eq!(second.margin_left, Some(2.0));
        assert!(second.inline_block);
        assert_eq!(tree.span(0).unwrap().role, SpanRole::Inline);
    }

    #[test]
    fn test_wide_gap_inserts_whitespace() {
        let tree = assemble(&[run(0.0, 100.0, 50.0), run(58.0, 100.0, 40.0)]);

        let block = tree.block(0).unwrap();
        assert_eq!(
            block.children,
            vec![Node::Span(0), Node::Whitespace { width: 8.0 }, Node::Span(1)]
        );
        assert_eq!(tree.span(1).unwrap().margin_left, None);
    }

    #[test]
    fn test_exact_abutment_has_no_margin() {
        let tree = assemble(&[run(0.0, 100.0, 50.0), run(50.0, 100.0, 40.0)]);
        assert_eq!(tree.span(1).unwrap().margin_left, None);
    }

    #[test]
    fn test_previous_inline_span_becomes_inline_block() {
        let tree = assemble(&[
            run(0.0, 100.0, 50.0),
            run(50.0, 100.0, 40.0),
            run(90.0, 100.0, 40.0),
        ]);
        assert!(!tree.span(0).unwrap().inline_block);
        assert!(tree.span(1).unwrap().inline_block);
        assert!(tree.span(2).unwrap().inline_block);
    }

    #[test]
    fn test_next_row_stays_in_block() {
        let tree = assemble(&[run(0.0, 100.0, 50.0), run(0.0, 116.0, 50.0)]);

        assert_eq!(tree.block_count(), 1);
        let block = tree.block(0).unwrap();
        assert_eq!(block.row_count, 1);
        assert_eq!(block.line_height, 16.0);
        assert_eq!(block.children, vec![Node::Span(0), Node::Line, Node::Span(1)]);
        assert_eq!(tree.span(1).unwrap().margin_left, None);
    }

    #[test]
    fn test_next_row_margin_is_relative_to_block_x() {
        let tree = assemble(&[run(10.0, 100.0, 50.0), run(25.0, 116.0, 50.0)]);
        assert_eq!(tree.span(1).unwrap().margin_left, Some(15.0));
    }

    #[test]
    fn test_row_pitch_must_match_known_line_height() {
        let tree = assemble(&[
            run(0.0, 100.0, 50.0),
            run(0.0, 116.0, 50.0),
            run(0.0, 132.1, 50.0),
            run(0.0, 150.0, 50.0),
        ]);

        assert_eq!(tree.block_count(), 2);
        assert_eq!(tree.block(0).unwrap().row_count, 2);
        assert_eq!(tree.block(1).unwrap().spans().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_first_row_pitch_limits() {
        // 20 >= 1.5 * 12, too far for a first row
        let far = assemble(&[run(0.0, 100.0, 50.0), run(0.0, 120.0, 50.0)]);
        assert_eq!(far.block_count(), 2);

        // 5 <= 12 / 2, too close to be a new row and too far for the same row
        let close = assemble(&[run(0.0, 100.0, 50.0), run(0.0, 105.0, 50.0)]);
        assert_eq!(close.block_count(), 2);
    }

    #[test]
    fn test_first_row_requires_same_font_name() {
        let other_font = GlyphRunGeometry::new(0.0, 116.0, 12.0, 50.0).with_font("f2", "serif");
        let tree = assemble(&[run(0.0, 100.0, 50.0), other_font]);
        assert_eq!(tree.block_count(), 2);
    }

    #[test]
    fn test_new_row_far_left_shift_opens_block() {
        let tree = assemble(&[run(0.0, 100.0, 50.0), run(100.0, 116.0, 50.0)]);
        assert_eq!(tree.block_count(), 2);
    }

    #[test]
    fn test_font_height_change_opens_block() {
        let bigger = GlyphRunGeometry::new(52.0, 100.0, 18.0, 40.0).with_font("f1", "serif");
        let tree = assemble(&[run(0.0, 100.0, 50.0), bigger]);
        assert_eq!(tree.block_count(), 2);
    }

    #[test]
    fn test_font_change_inside_block_keeps_own_font() {
        let bigger = GlyphRunGeometry::new(90.0, 100.0, 18.0, 40.0).with_font("f2", "serif");
        let tree = assemble(&[run(0.0, 100.0, 50.0), run(50.0, 100.0, 40.0), bigger]);

        assert_eq!(tree.block_count(), 1);
        let span = tree.span(2).unwrap();
        assert_eq!(span.font, Some(FontSpec::new(18.0, "serif")));
        assert_eq!(span.font_name.as_deref(), Some("f2"));
        assert!(tree.span(1).unwrap().font.is_none());
    }

    #[test]
    fn test_rotated_run_always_opens_block() {
        let rotated = run(52.0, 100.0, 40.0).with_angle(std::f32::consts::FRAC_PI_2);
        let tree = assemble(&[run(0.0, 100.0, 50.0), rotated]);

        assert_eq!(tree.block_count(), 2);
        let block = tree.block(1).unwrap();
        assert!((block.angle_deg - 90.0).abs() < 1e-4);
        assert!((block.origin.x - 64.0).abs() < 1e-4);
        assert!((block.origin.y - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_multiline_disabled() {
        let mut assembler = LayoutAssembler::new(false);
        assembler.append(&run(0.0, 100.0, 50.0));
        assembler.append(&run(50.0, 100.0, 40.0));
        assembler.append(&run(0.0, 116.0, 40.0));
        assert_eq!(assembler.into_tree().block_count(), 3);
    }

    #[test]
    fn test_ascent_and_descent_position_block() {
        let tree = assemble(&[
            run(0.0, 100.0, 50.0).with_ascent(0.75),
            run(0.0, 300.0, 50.0).with_descent(-0.25),
        ]);
        assert_eq!(tree.block(0).unwrap().origin, Point::new(0.0, 91.0));
        assert_eq!(tree.block(1).unwrap().origin, Point::new(0.0, 291.0));
    }

    #[test]
    fn test_vertical_scale_on_finalize() {
        let tree = assemble(&[
            run(0.0, 100.0, 50.0),
            run(0.0, 115.5, 50.0),
            run(0.0, 131.0, 50.0),
        ]);

        let scale = tree.block(0).unwrap().vertical_scale.unwrap();
        assert_eq!(scale.line_height_px, 15.0);
        assert!((scale.scale_y - 31.0 / 30.0).abs() < 1e-6);
        // (12 - 15.5) / 2 = -1.75, rounded half up
        assert_eq!(scale.margin_top, Some(-2.0));
    }

    #[test]
    fn test_vertical_scale_applied_before_next_block() {
        let mut assembler = LayoutAssembler::new(true);
        assembler.append(&run(0.0, 100.0, 50.0));
        assembler.append(&run(0.0, 112.0, 50.0));
        assembler.append(&run(300.0, 500.0, 50.0));

        let scale = assembler.tree().block(0).unwrap().vertical_scale.unwrap();
        assert_eq!(scale.line_height_px, 12.0);
        assert_eq!(scale.scale_y, 1.0);
        assert_eq!(scale.margin_top, None);
        assert!(assembler.tree().block(1).unwrap().vertical_scale.is_none());
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut assembler = LayoutAssembler::new(true);
        assembler.append(&run(0.0, 100.0, 50.0));
        assembler.append(&run(0.0, 116.0, 50.0));
        assembler.finalize();
        let first = assembler.tree().clone();
        assembler.finalize();
        assert_eq!(assembler.tree(), &first);
    }

    #[test]
    fn test_single_row_block_has_no_scale() {
        let tree = assemble(&[run(0.0, 100.0, 50.0), run(50.0, 100.0, 50.0)]);
        assert!(tree.block(0).unwrap().vertical_scale.is_none());
    }

    #[test]
    fn test_reset_clears_tree() {
        let mut assembler = LayoutAssembler::new(true);
        assembler.append(&run(0.0, 100.0, 50.0));
        assembler.reset();
        assert!(assembler.tree().is_empty());
        assert_eq!(assembler.classify(&run(0.0, 100.0, 50.0)), Placement::NewBlock);
    }
}
