//! Rendering surface abstraction
//!
//! The layer tree is pure data. [`materialize`] walks it once and issues
//! element and style calls against a [`LayerSurface`]; afterwards only
//! highlight repaints and scrolling touch the surface.

use crate::alignment::TextMeasure;
use crate::config::ScrollOffset;
use crate::geometry::TextDirection;
use crate::highlight::SpanContent;
use crate::text_layer::{Alignment, FontSpec, LayerTree, Node, SpanId, SpanRole, TextSpan};
use kurbo::{Affine, Point};
use std::collections::BTreeSet;
use std::mem;

/// Kinds of element the layer creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Absolutely positioned block
    Block,
    /// Inline span inside a block
    Inline,
    /// Row separator inside a block
    LineBreak,
    /// Fixed-width gap between two spans
    Whitespace,
}

/// Style properties the layer sets
#[derive(Debug, Clone, PartialEq)]
pub enum StyleProperty {
    Left(f32),
    Top(f32),
    Width(f32),
    MarginLeft(f32),
    MarginTop(f32),
    LineHeight(f32),
    FontSize(f32),
    FontFamily(String),
    LetterSpacing(f32),
    /// 2D affine transform around `origin` (element-local)
    Transform { matrix: Affine, origin: Point },
    /// Lay the element out inline-block so its width applies
    InlineBlock,
    Direction(TextDirection),
}

/// Platform-agnostic interface to whatever displays the text layer
pub trait LayerSurface: TextMeasure {
    /// Handle to an element on the surface
    type Element: Clone;

    /// Create a detached element
    fn create_element(&mut self, kind: ElementKind) -> Self::Element;

    /// Append `child` to `parent`, or to the layer root when `parent` is `None`
    fn append_child(&mut self, parent: Option<&Self::Element>, child: &Self::Element);

    /// Detach `child` from `parent` (or the layer root)
    fn remove_child(&mut self, parent: Option<&Self::Element>, child: &Self::Element);

    /// Set one style property
    fn set_property(&mut self, element: &Self::Element, property: StyleProperty);

    /// Replace the element's text children and highlight class
    fn set_content(&mut self, element: &Self::Element, content: &SpanContent);

    /// Scroll the viewport so `element` is visible, biased by `offset`
    fn scroll_into_view(&mut self, element: &Self::Element, offset: ScrollOffset);
}

/// Surface handles for a materialized tree
#[derive(Debug, Clone)]
pub struct MaterializedLayer<E> {
    /// One element per block, in block order
    pub blocks: Vec<E>,

    /// One element per span, in span order; a block-role span shares its block's element
    pub spans: Vec<E>,
}

impl<E> Default for MaterializedLayer<E> {
    fn default() -> Self {
        Self {
            blocks: Vec::new(),
            spans: Vec::new(),
        }
    }
}

impl<E> MaterializedLayer<E> {
    /// Element of a span
    pub fn span_element(&self, id: SpanId) -> Option<&E> {
        self.spans.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

fn set_font<S: LayerSurface + ?Sized>(surface: &mut S, element: &S::Element, font: &FontSpec) {
    surface.set_property(element, StyleProperty::FontSize(font.size_px));
    surface.set_property(element, StyleProperty::FontFamily(font.family.clone()));
}

fn set_alignment<S: LayerSurface + ?Sized>(
    surface: &mut S,
    element: &S::Element,
    alignment: &Alignment,
) {
    match *alignment {
        Alignment::Unaligned => {}
        Alignment::FixedWidth(width) => surface.set_property(element, StyleProperty::Width(width)),
        Alignment::LetterSpacing(spacing) => {
            surface.set_property(element, StyleProperty::LetterSpacing(spacing))
        }
        Alignment::Transform { .. } => {
            if let Some(matrix) = alignment.transform() {
                surface.set_property(
                    element,
                    StyleProperty::Transform {
                        matrix,
                        origin: Point::ZERO,
                    },
                );
            }
        }
    }
}

fn set_span_style<S: LayerSurface + ?Sized>(surface: &mut S, element: &S::Element, span: &TextSpan) {
    if let Some(margin) = span.margin_left {
        surface.set_property(element, StyleProperty::MarginLeft(margin));
    }
    if let Some(font) = &span.font {
        set_font(surface, element, font);
    }
    if span.inline_block {
        surface.set_property(element, StyleProperty::InlineBlock);
    }
    if span.text.is_some() {
        surface.set_property(element, StyleProperty::Direction(span.dir));
    }
    set_alignment(surface, element, &span.alignment);
    surface.set_content(element, &span.content);
}

/// Create surface elements for every block, span and separator in `tree`
pub fn materialize<S: LayerSurface + ?Sized>(
    tree: &LayerTree,
    surface: &mut S,
) -> MaterializedLayer<S::Element> {
    let mut blocks = Vec::with_capacity(tree.block_count());
    let mut spans: Vec<Option<S::Element>> = vec![None; tree.span_count()];

    for block in tree.blocks() {
        let element = surface.create_element(ElementKind::Block);
        surface.set_property(&element, StyleProperty::Left(block.origin.x as f32));
        surface.set_property(&element, StyleProperty::Top(block.origin.y as f32));
        set_font(surface, &element, &block.font);

        if let Some(scale) = &block.vertical_scale {
            surface.set_property(&element, StyleProperty::LineHeight(scale.line_height_px));
            surface.set_property(
                &element,
                StyleProperty::Transform {
                    matrix: scale.transform(),
                    origin: Point::ZERO,
                },
            );
            if let Some(margin) = scale.margin_top {
                surface.set_property(&element, StyleProperty::MarginTop(margin));
            }
        }

        for node in &block.children {
            match *node {
                Node::Span(id) => {
                    let Some(span) = tree.span(id) else {
                        continue;
                    };
                    let child = match span.role {
                        SpanRole::Block => element.clone(),
                        SpanRole::Inline => {
                            let child = surface.create_element(ElementKind::Inline);
                            surface.append_child(Some(&element), &child);
                            child
                        }
                    };
                    set_span_style(surface, &child, span);
                    if let Some(slot) = spans.get_mut(id) {
                        *slot = Some(child);
                    }
                }
                Node::Line => {
                    let child = surface.create_element(ElementKind::LineBreak);
                    surface.append_child(Some(&element), &child);
                }
                Node::Whitespace { width } => {
                    let child = surface.create_element(ElementKind::Whitespace);
                    surface.set_property(&child, StyleProperty::InlineBlock);
                    surface.set_property(&child, StyleProperty::Width(width));
                    surface.set_content(&child, &SpanContent::plain(" "));
                    surface.append_child(Some(&element), &child);
                }
                Node::Block(_) => {}
            }
        }

        surface.append_child(None, &element);
        blocks.push(element);
    }

    MaterializedLayer {
        blocks,
        spans: spans.into_iter().flatten().collect(),
    }
}

/// Push the current content of the `dirty` spans to the surface
pub fn repaint<S: LayerSurface + ?Sized>(
    tree: &LayerTree,
    layer: &MaterializedLayer<S::Element>,
    surface: &mut S,
    dirty: &BTreeSet<SpanId>,
) -> usize {
    let mut painted = 0;
    for &id in dirty {
        let (Some(span), Some(element)) = (tree.span(id), layer.span_element(id)) else {
            continue;
        };
        surface.set_content(element, &span.content);
        painted += 1;
    }
    painted
}

/// Detach every block element from the layer root
pub fn detach<S: LayerSurface + ?Sized>(layer: &mut MaterializedLayer<S::Element>, surface: &mut S) {
    for element in mem::take(&mut layer.blocks) {
        surface.remove_child(None, &element);
    }
    layer.spans.clear();
}

/// Identifier of an element on a [`RecordingSurface`]
pub type ElementId = usize;

/// One element as recorded by [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedElement {
    pub kind: ElementKind,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub properties: Vec<StyleProperty>,
    pub content: SpanContent,

    /// Number of content writes
    pub content_writes: usize,
}

/// In-memory surface for headless layout inspection
///
/// Text is measured with a fixed advance per character (a fraction of the
/// font size); zero-width code points measure as nothing.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    elements: Vec<RecordedElement>,
    roots: Vec<ElementId>,
    scrolls: Vec<(ElementId, ScrollOffset)>,
    advance_em: f32,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    /// Create a surface that advances half an em per character
    pub fn new() -> Self {
        Self::with_advance(0.5)
    }

    /// Create a surface with a custom per-character advance, in ems
    pub fn with_advance(advance_em: f32) -> Self {
        Self {
            elements: Vec::new(),
            roots: Vec::new(),
            scrolls: Vec::new(),
            advance_em,
        }
    }

    pub fn element(&self, id: ElementId) -> Option<&RecordedElement> {
        self.elements.get(id)
    }

    /// Elements attached to the layer root
    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    /// Every scroll request so far
    pub fn scrolls(&self) -> &[(ElementId, ScrollOffset)] {
        &self.scrolls
    }

    /// Number of elements created
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Text of `element` followed by the text of its descendants, in tree order
    pub fn text_content(&self, element: ElementId) -> String {
        let Some(el) = self.elements.get(element) else {
            return String::new();
        };
        let mut text = el.content.text();
        for &child in &el.children {
            text.push_str(&self.text_content(child));
        }
        text
    }

    /// First property of `element` matching `pred`
    pub fn property(
        &self,
        element: ElementId,
        pred: impl Fn(&StyleProperty) -> bool,
    ) -> Option<&StyleProperty> {
        self.elements.get(element)?.properties.iter().find(|p| pred(p))
    }

    fn is_zero_width(c: char) -> bool {
        matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}')
    }
}

impl TextMeasure for RecordingSurface {
    fn measure_text(&mut self, text: &str, font: &FontSpec) -> f32 {
        let visible = text.chars().filter(|c| !Self::is_zero_width(*c)).count();
        visible as f32 * font.size_px * self.advance_em
    }
}

impl LayerSurface for RecordingSurface {
    type Element = ElementId;

    fn create_element(&mut self, kind: ElementKind) -> ElementId {
        self.elements.push(RecordedElement {
            kind,
            parent: None,
            children: Vec::new(),
            properties: Vec::new(),
            content: SpanContent::default(),
            content_writes: 0,
        });
        self.elements.len() - 1
    }

    fn append_child(&mut self, parent: Option<&ElementId>, child: &ElementId) {
        match parent {
            Some(&parent) => {
                if let Some(element) = self.elements.get_mut(parent) {
                    element.children.push(*child);
                }
                if let Some(element) = self.elements.get_mut(*child) {
                    element.parent = Some(parent);
                }
            }
            None => self.roots.push(*child),
        }
    }

    fn remove_child(&mut self, parent: Option<&ElementId>, child: &ElementId) {
        match parent {
            Some(&parent) => {
                if let Some(element) = self.elements.get_mut(parent) {
                    element.children.retain(|c| c != child);
                }
                if let Some(element) = self.elements.get_mut(*child) {
                    element.parent = None;
                }
            }
            None => self.roots.retain(|c| c != child),
        }
    }

    fn set_property(&mut self, element: &ElementId, property: StyleProperty) {
        let Some(element) = self.elements.get_mut(*element) else {
            return;
        };
        let kind = mem::discriminant(&property);
        match element.properties.iter_mut().find(|p| mem::discriminant(&**p) == kind) {
            Some(existing) => *existing = property,
            None => element.properties.push(property),
        }
    }

    fn set_content(&mut self, element: &ElementId, content: &SpanContent) {
        if let Some(element) = self.elements.get_mut(*element) {
            element.content = content.clone();
            element.content_writes += 1;
        }
    }

    fn scroll_into_view(&mut self, element: &ElementId, offset: ScrollOffset) {
        self.scrolls.push((*element, offset));
    }
}
