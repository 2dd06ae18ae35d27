//! Layer tree model
//!
//! A page's text layer is a list of positioned blocks (line containers), each
//! holding spans, whitespace fillers and line breaks. Spans are also kept in a
//! flat list in creation order; that order matches the page's text content
//! items one-to-one, and match offsets are resolved against it.
//!
//! The tree is pure data. Putting it on screen is a separate step, see
//! [`crate::surface::materialize`].

use crate::geometry::{TextContentItem, TextDirection};
use crate::highlight::SpanContent;
use kurbo::{Affine, Point};

/// Index of a block in [`LayerTree::blocks`]
pub type BlockId = usize;

/// Index of a span in [`LayerTree::spans`]; equals its text content index
pub type SpanId = usize;

/// Pixel font size plus family
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    /// Font height in whole pixels
    pub size_px: f32,

    /// CSS family
    pub family: String,
}

impl FontSpec {
    /// Create a font spec
    pub fn new(size_px: f32, family: impl Into<String>) -> Self {
        Self {
            size_px,
            family: family.into(),
        }
    }

    /// Font description used for measuring, e.g. `"12px serif"`
    pub fn css(&self) -> String {
        format!("{}px {}", self.size_px, self.family)
    }
}

/// Child of a block
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node {
    /// A positioned line container
    Block(BlockId),
    /// Start of the next row inside a block
    Line,
    /// A text-bearing span
    Span(SpanId),
    /// Fixed-width gap between two runs on the same row
    Whitespace { width: f32 },
}

/// How a span sits in its block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanRole {
    /// The block's only run; the block element itself carries the text
    Block,
    /// One of several runs inside a block
    Inline,
}

/// Line-height correction for a multi-row block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalScale {
    /// Whole-pixel line height applied to the block
    pub line_height_px: f32,

    /// Vertical stretch that absorbs the rounding of `line_height_px`
    pub scale_y: f32,

    /// Top margin that centres glyphs in their line box
    pub margin_top: Option<f32>,
}

impl VerticalScale {
    /// Transform applied to the block, anchored at its top-left corner
    pub fn transform(&self) -> Affine {
        Affine::scale_non_uniform(1.0, self.scale_y as f64)
    }
}

/// Width correction computed by the render-alignment pass
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Alignment {
    /// Not measured yet, whitespace-only, or zero measured width
    #[default]
    Unaligned,
    /// Single character: the element is forced to the design width
    FixedWidth(f32),
    /// Width delta spread over the characters
    LetterSpacing(f32),
    /// Rotated block: rotate then stretch horizontally
    Transform { rotation_deg: f32, scale_x: f32 },
}

impl Alignment {
    /// Affine transform for [`Alignment::Transform`], anchored at the top-left
    pub fn transform(&self) -> Option<Affine> {
        match *self {
            Alignment::Transform {
                rotation_deg,
                scale_x,
            } => Some(
                Affine::rotate((rotation_deg as f64).to_radians())
                    * Affine::scale_non_uniform(scale_x as f64, 1.0),
            ),
            _ => None,
        }
    }
}

/// A block: one visually distinct run start and the rows that follow it
#[derive(Debug, Clone, PartialEq)]
pub struct LineContainer {
    /// Top-left corner on the overlay surface
    pub origin: Point,

    /// Rotation in degrees
    pub angle_deg: f32,

    /// Font of the run that opened the block
    pub font: FontSpec,

    /// Font identity of the run that opened the block
    pub font_name: String,

    /// Completed rows (line breaks) in the block
    pub row_count: usize,

    /// Observed distance between the first two rows
    pub line_height: f32,

    /// Spans, whitespace and line breaks in order
    pub children: Vec<Node>,

    /// Whether the block holds more than its opening run
    pub block_building: bool,

    /// Line-height correction, once the block has rows
    pub vertical_scale: Option<VerticalScale>,
}

impl LineContainer {
    /// Span children in order
    pub fn spans(&self) -> impl Iterator<Item = SpanId> + '_ {
        self.children.iter().filter_map(|node| match node {
            Node::Span(id) => Some(*id),
            _ => None,
        })
    }
}

/// A text-bearing leaf
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// Owning block
    pub block: BlockId,

    /// Whether the span stands in for its block
    pub role: SpanRole,

    /// Width of the run on the raster (`canvasWidth * |hScale|`)
    pub design_width: f32,

    /// Own font, when it differs from the block's
    pub font: Option<FontSpec>,

    /// Own font identity, when the font differs from the block's
    pub font_name: Option<String>,

    /// Left margin from the preceding node
    pub margin_left: Option<f32>,

    /// Laid out inline-block so its width can be corrected
    pub inline_block: bool,

    /// Attached text; `None` until content arrives
    pub text: Option<String>,

    /// Writing direction of the attached text
    pub dir: TextDirection,

    /// The text has no visible characters
    pub is_whitespace: bool,

    /// Current (possibly highlighted) content
    pub content: SpanContent,

    /// Result of the render-alignment pass
    pub alignment: Alignment,
}

impl TextSpan {
    /// Create an empty span
    pub fn new(block: BlockId, role: SpanRole, design_width: f32) -> Self {
        Self {
            block,
            role,
            design_width,
            font: None,
            font_name: None,
            margin_left: None,
            inline_block: false,
            text: None,
            dir: TextDirection::Ltr,
            is_whitespace: false,
            content: SpanContent::default(),
            alignment: Alignment::Unaligned,
        }
    }

    /// Attached text, or the empty string
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Length of the attached text in characters
    pub fn char_len(&self) -> usize {
        self.text().chars().count()
    }
}

/// Blocks and spans for one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerTree {
    blocks: Vec<LineContainer>,
    spans: Vec<TextSpan>,
}

impl LayerTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// All blocks in creation order
    pub fn blocks(&self) -> &[LineContainer] {
        &self.blocks
    }

    /// All spans in creation order
    pub fn spans(&self) -> &[TextSpan] {
        &self.spans
    }

    /// Mutable access to the spans, for highlighting
    pub fn spans_mut(&mut self) -> &mut [TextSpan] {
        &mut self.spans
    }

    /// Get a block
    pub fn block(&self, id: BlockId) -> Option<&LineContainer> {
        self.blocks.get(id)
    }

    /// Get a block mutably
    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut LineContainer> {
        self.blocks.get_mut(id)
    }

    /// Get a span
    pub fn span(&self, id: SpanId) -> Option<&TextSpan> {
        self.spans.get(id)
    }

    /// Get a span mutably
    pub fn span_mut(&mut self, id: SpanId) -> Option<&mut TextSpan> {
        self.spans.get_mut(id)
    }

    /// Number of spans
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Number of blocks
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the tree is empty
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub(crate) fn push_block(&mut self, block: LineContainer) -> BlockId {
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    /// Append `span` to the flat list and to its block's children
    pub(crate) fn push_span(&mut self, span: TextSpan) -> SpanId {
        let id = self.spans.len();
        if let Some(block) = self.blocks.get_mut(span.block) {
            block.children.push(Node::Span(id));
        }
        self.spans.push(span);
        id
    }

    /// Top-level nodes, one per block
    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        (0..self.blocks.len()).map(Node::Block)
    }

    /// Font the span's text is drawn with
    pub fn span_font(&self, id: SpanId) -> Option<&FontSpec> {
        let span = self.spans.get(id)?;
        match &span.font {
            Some(font) => Some(font),
            None => self.blocks.get(span.block).map(|block| &block.font),
        }
    }

    /// Attach text content to spans in order
    ///
    /// Items beyond the span count are ignored and spans beyond the item count
    /// stay empty. Returns the number of spans filled.
    pub fn attach_content(&mut self, items: &[TextContentItem]) -> usize {
        let mut filled = 0;
        for (span, item) in self.spans.iter_mut().zip(items) {
            span.is_whitespace = item.is_whitespace();
            span.dir = item.dir;
            span.content = SpanContent::plain(&item.text);
            span.text = Some(item.text.clone());
            filled += 1;
        }
        if items.len() != self.spans.len() {
            log::debug!(
                "text content has {} items for {} spans",
                items.len(),
                self.spans.len()
            );
        }
        filled
    }

    /// Concatenation of every span's text in span order
    pub fn text(&self) -> String {
        self.spans.iter().map(TextSpan::text).collect()
    }
}
