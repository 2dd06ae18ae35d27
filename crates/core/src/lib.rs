//! Text Layer Core Library
//!
//! Invisible, selectable text overlay for rendered PDF pages: layout of glyph
//! runs into blocks and spans, width alignment against the raster, and
//! search-match highlighting.

pub mod alignment;
pub mod builder;
pub mod config;
pub mod error;
pub mod find;
pub mod geometry;
pub mod highlight;
pub mod surface;
pub mod text_layer;
pub mod text_layout;

pub use alignment::{align_spans, compute_alignment, AlignmentStats, TextMeasure};
pub use builder::{LayerContext, TextLayerBuilder};
pub use config::{ConfigError, ScrollOffset, TextLayerConfig};
pub use error::{MappingFailure, TextLayerError, TextLayerResult};
pub use find::{find_offsets, FindController, FindState, SelectedMatch};
pub use geometry::{GlyphRunGeometry, TextContentItem, TextDirection};
pub use highlight::{
    char_slice, clear_matches, convert_matches, render_matches, Fragment, HighlightClass,
    HighlightKind, HighlightState, Match, MatchOverlay, MatchRequest, OverlayUpdate, SpanContent,
    SpanPosition,
};
pub use surface::{
    materialize, ElementId, ElementKind, LayerSurface, MaterializedLayer, RecordedElement,
    RecordingSurface, StyleProperty,
};
pub use text_layer::{
    Alignment, BlockId, FontSpec, LayerTree, LineContainer, Node, SpanId, SpanRole, TextSpan,
    VerticalScale,
};
pub use text_layout::{LayoutAssembler, Placement};
