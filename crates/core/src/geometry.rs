//! Input records from the page content interpreter
//!
//! Geometries arrive in overlay-surface pixel coordinates, one per glyph run,
//! in reading order. Text content arrives separately, one item per run.

use serde::{Deserialize, Serialize};

/// Position, scale and font identity of one glyph run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlyphRunGeometry {
    /// Baseline x in surface pixels
    pub x: f32,

    /// Baseline y in surface pixels
    pub y: f32,

    /// Nominal font size before scaling
    pub font_size: f32,

    /// Horizontal scale to pixel units
    pub h_scale: f32,

    /// Vertical scale to pixel units
    pub v_scale: f32,

    /// Rotation in radians
    #[serde(default)]
    pub angle: f32,

    /// Loaded font identity (e.g. `"g_font_3"`)
    pub font_name: String,

    /// CSS family used to render the overlay text
    pub font_family: String,

    /// Width of the run as drawn at scale 1
    pub canvas_width: f32,

    /// Ascent as a fraction of the font height
    #[serde(default)]
    pub ascent: Option<f32>,

    /// Descent as a (usually negative) fraction of the font height
    #[serde(default)]
    pub descent: Option<f32>,
}

impl GlyphRunGeometry {
    /// Create an unrotated, unit-scale run
    pub fn new(x: f32, y: f32, font_size: f32, canvas_width: f32) -> Self {
        Self {
            x,
            y,
            font_size,
            h_scale: 1.0,
            v_scale: 1.0,
            angle: 0.0,
            font_name: String::new(),
            font_family: "sans-serif".to_string(),
            canvas_width,
            ascent: None,
            descent: None,
        }
    }

    /// Set the font identity and family
    pub fn with_font(mut self, name: impl Into<String>, family: impl Into<String>) -> Self {
        self.font_name = name.into();
        self.font_family = family.into();
        self
    }

    /// Set the horizontal and vertical scale
    pub fn with_scale(mut self, h_scale: f32, v_scale: f32) -> Self {
        self.h_scale = h_scale;
        self.v_scale = v_scale;
        self
    }

    /// Set the rotation in radians
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    /// Set the ascent fraction
    pub fn with_ascent(mut self, ascent: f32) -> Self {
        self.ascent = Some(ascent);
        self
    }

    /// Set the descent fraction
    pub fn with_descent(mut self, descent: f32) -> Self {
        self.descent = Some(descent);
        self
    }

    /// Pixel font height, truncated to a whole pixel
    pub fn font_height(&self) -> f32 {
        (self.font_size * self.v_scale.abs()).trunc()
    }

    /// Width the run occupies on the raster
    pub fn design_width(&self) -> f32 {
        self.canvas_width * self.h_scale.abs()
    }

    /// Right edge of the run on the raster
    pub fn x_end(&self) -> f32 {
        self.x + self.design_width()
    }

    /// Distance from the baseline to the top of the run
    ///
    /// Uses the explicit ascent if present, then `1 + descent`, then the full
    /// font height.
    pub fn ascent_px(&self, font_height: f32) -> f32 {
        match (self.ascent, self.descent) {
            (Some(ascent), _) if ascent != 0.0 => ascent * font_height,
            (_, Some(descent)) if descent != 0.0 => (1.0 + descent) * font_height,
            _ => font_height,
        }
    }
}

/// Writing direction of a content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
    Ttb,
}

impl TextDirection {
    /// The attribute value used by the surface
    pub fn as_str(&self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
            TextDirection::Ttb => "ttb",
        }
    }
}

/// Printable string for one glyph run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContentItem {
    /// Resolved text of the run
    #[serde(rename = "str")]
    pub text: String,

    /// Writing direction
    #[serde(default)]
    pub dir: TextDirection,
}

impl TextContentItem {
    /// Create a left-to-right item
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            dir: TextDirection::Ltr,
        }
    }

    /// Create an item with an explicit direction
    pub fn with_dir(text: impl Into<String>, dir: TextDirection) -> Self {
        Self {
            text: text.into(),
            dir,
        }
    }

    /// Whether the text has no visible characters
    pub fn is_whitespace(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}
