//! Empirical font ascent measurement
//!
//! The text layer positions each block at the top of its first line, so it needs
//! the distance from the baseline to the top of the glyphs. When the glyph-run
//! producer does not supply an ascent, it can be measured by painting a probe
//! string onto a small offscreen raster twice (once with an alphabetic baseline,
//! once with a top baseline) and comparing the first painted row of each pass.

use std::collections::HashMap;
use std::fmt;

/// Text drawn when the caller does not supply a probe string
pub const DEFAULT_PROBE_TEXT: &str = "The quick brown fox jumps over the lazy dog";

/// Width and height of the offscreen probe raster in pixels
pub const PROBE_CANVAS_SIZE: u32 = 100;

/// Errors raised while preparing or painting a probe
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("invalid font descriptor: {0:?}")]
    InvalidDescriptor(String),

    #[error("font data could not be parsed: {0}")]
    Parse(String),

    #[error("no font registered for family {0:?}")]
    UnknownFamily(String),

    #[error("could not allocate a {width}x{height} probe raster")]
    PixmapAllocation { width: u32, height: u32 },
}

/// Vertical anchor used when painting probe text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    /// `y` is the alphabetic baseline
    Alphabetic,
    /// `y` is the top of the em box
    Top,
}

/// A parsed CSS-like font description such as `"12px sans-serif"`
#[derive(Debug, Clone, PartialEq)]
pub struct FontDescriptor {
    /// Font size in pixels
    pub size_px: f32,

    /// Family list as written after the size (e.g. `"Helvetica, sans-serif"`)
    pub family: String,
}

impl FontDescriptor {
    /// Create a descriptor from a size and family
    pub fn new(size_px: f32, family: impl Into<String>) -> Self {
        Self {
            size_px,
            family: family.into(),
        }
    }

    /// Parse a descriptor of the form `[style tokens] <size>px <family>`
    ///
    /// Leading tokens such as `bold` or `italic` are skipped; the first token
    /// ending in `px` supplies the size and everything after it is the family.
    pub fn parse(descriptor: &str) -> Result<Self, FontError> {
        let invalid = || FontError::InvalidDescriptor(descriptor.to_string());
        let mut rest = descriptor.trim();

        loop {
            let (token, tail) = match rest.split_once(char::is_whitespace) {
                Some((token, tail)) => (token, tail.trim_start()),
                None => (rest, ""),
            };
            if token.is_empty() {
                return Err(invalid());
            }

            if let Some(number) = token.strip_suffix("px") {
                let size_px: f32 = number.parse().map_err(|_| invalid())?;
                if !size_px.is_finite() || size_px <= 0.0 || tail.is_empty() {
                    return Err(invalid());
                }
                return Ok(Self::new(size_px, tail));
            }

            rest = tail;
        }
    }

    /// Candidate family names in preference order, with quotes stripped
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.family
            .split(',')
            .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\''))
            .filter(|name| !name.is_empty())
    }
}

impl fmt::Display for FontDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px {}", self.size_px, self.family)
    }
}

/// An offscreen raster that probe text can be painted onto
///
/// Implementations own the actual font rasterization; the probe only needs to
/// clear the surface, paint a string, and ask whether a row carries any ink.
pub trait ProbeSurface {
    /// Surface width in pixels
    fn width(&self) -> u32;

    /// Surface height in pixels
    fn height(&self) -> u32;

    /// Reset every pixel to the background colour
    fn clear(&mut self);

    /// Paint `text` at `(x, y)` using `baseline` as the vertical anchor
    fn fill_text(
        &mut self,
        font: &FontDescriptor,
        text: &str,
        x: f32,
        y: f32,
        baseline: TextBaseline,
    ) -> Result<(), FontError>;

    /// Whether row `y` contains any non-background pixel
    fn row_has_ink(&self, y: u32) -> bool;
}

/// Index of the first row with ink, or the surface height if nothing was painted
pub fn first_ink_row<S: ProbeSurface + ?Sized>(surface: &S) -> u32 {
    (0..surface.height())
        .find(|&y| surface.row_has_ink(y))
        .unwrap_or_else(|| surface.height())
}

/// Result of probing one font
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AscentMeasurement {
    /// Ascent in pixels, or the canvas height when the probe found no ink
    pub pixels: f32,

    /// True when the probe painted nothing and `pixels` is the sentinel
    pub degenerate: bool,
}

/// Ascent probe with a per-descriptor cache
///
/// The cache is never evicted; the number of distinct fonts on a document is
/// small and the probe lives as long as its page layer.
pub struct FontMetrics<S> {
    surface: S,
    cache: HashMap<String, AscentMeasurement>,
}

impl<S: ProbeSurface> FontMetrics<S> {
    /// Create a probe that paints onto `surface`
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            cache: HashMap::new(),
        }
    }

    /// Ascent in pixels for `font`, probing with `probe` or the default pangram
    ///
    /// A font that paints no ink yields the canvas height; callers treat that
    /// value as a low-confidence estimate.
    pub fn ascent(&mut self, font: &str, probe: Option<&str>) -> f32 {
        self.measure(font, probe).pixels
    }

    /// Same as [`FontMetrics::ascent`] but also reports whether the sentinel was hit
    pub fn measure(&mut self, font: &str, probe: Option<&str>) -> AscentMeasurement {
        if let Some(cached) = self.cache.get(font) {
            return *cached;
        }

        let measurement = self.probe(font, probe.unwrap_or(DEFAULT_PROBE_TEXT));
        if measurement.degenerate {
            log::warn!(
                "ascent probe found no ink for font {:?}, using canvas height {}",
                font,
                measurement.pixels
            );
        }
        self.cache.insert(font.to_string(), measurement);
        measurement
    }

    /// Number of cached descriptors
    pub fn cached_fonts(&self) -> usize {
        self.cache.len()
    }

    /// Borrow the underlying surface
    pub fn surface(&self) -> &S {
        &self.surface
    }

    fn probe(&mut self, font: &str, text: &str) -> AscentMeasurement {
        let sentinel = AscentMeasurement {
            pixels: self.surface.height() as f32,
            degenerate: true,
        };

        let descriptor = match FontDescriptor::parse(font) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                log::warn!("ascent probe skipped: {err}");
                return sentinel;
            }
        };

        let alphabetic = self.scan(&descriptor, text, TextBaseline::Alphabetic);
        let top = self.scan(&descriptor, text, TextBaseline::Top);
        if alphabetic >= self.surface.height() {
            return sentinel;
        }

        AscentMeasurement {
            pixels: top as f32 - alphabetic as f32,
            degenerate: false,
        }
    }

    fn scan(&mut self, font: &FontDescriptor, text: &str, baseline: TextBaseline) -> u32 {
        self.surface.clear();
        if let Err(err) = self
            .surface
            .fill_text(font, text, 0.0, font.size_px, baseline)
        {
            log::debug!("probe paint failed for {font}: {err}");
        }
        first_ink_row(&self.surface)
    }
}
