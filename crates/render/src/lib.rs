//! Text Layer Render Library
//!
//! Offscreen raster helpers for the text layer: empirical font ascent probing.

pub mod font_metrics;
pub mod pixmap;

pub use font_metrics::{
    first_ink_row, AscentMeasurement, FontDescriptor, FontError, FontMetrics, ProbeSurface,
    TextBaseline, DEFAULT_PROBE_TEXT, PROBE_CANVAS_SIZE,
};
pub use pixmap::PixmapProbeSurface;
