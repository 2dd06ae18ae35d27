//! Text layer configuration
//!
//! Settings can be built programmatically, deserialized from the viewer's
//! preferences, or overridden from environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default quiet window after the last scroll before the render pass runs
pub const DEFAULT_RENDER_DELAY_MS: u64 = 200;

/// Pages with more spans than this are left unaligned
pub const DEFAULT_MAX_SPANS_TO_RENDER: usize = 100_000;

/// Bias applied when scrolling the selected match into view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollOffset {
    /// Vertical bias in pixels (negative keeps the match below the top edge)
    pub top: f32,

    /// Horizontal bias in pixels
    pub left: f32,
}

impl Default for ScrollOffset {
    fn default() -> Self {
        Self {
            top: -50.0,
            left: -400.0,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable {0}")]
    InvalidValue(String),
}

/// Configuration for one page's text layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextLayerConfig {
    /// Group runs into multi-line blocks; when off every run is its own block
    pub enable_multiline: bool,

    /// Quiet window after scrolling, in milliseconds
    pub render_delay_ms: u64,

    /// Skip the render-alignment pass above this many spans
    pub max_spans_to_render: usize,

    /// Scroll bias for the selected match
    pub scroll_offset: ScrollOffset,

    /// Presentation mode never scrolls to matches
    pub presentation_mode: bool,
}

impl Default for TextLayerConfig {
    fn default() -> Self {
        Self {
            enable_multiline: true,
            render_delay_ms: DEFAULT_RENDER_DELAY_MS,
            max_spans_to_render: DEFAULT_MAX_SPANS_TO_RENDER,
            scroll_offset: ScrollOffset::default(),
            presentation_mode: false,
        }
    }
}

impl TextLayerConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable multi-line grouping
    pub fn with_multiline(mut self, enable: bool) -> Self {
        self.enable_multiline = enable;
        self
    }

    /// Set the quiet window after scrolling
    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the span ceiling for the render pass
    pub fn with_max_spans(mut self, max_spans: usize) -> Self {
        self.max_spans_to_render = max_spans;
        self
    }

    /// Set the scroll bias for the selected match
    pub fn with_scroll_offset(mut self, top: f32, left: f32) -> Self {
        self.scroll_offset = ScrollOffset { top, left };
        self
    }

    /// Set presentation mode
    pub fn with_presentation_mode(mut self, presentation_mode: bool) -> Self {
        self.presentation_mode = presentation_mode;
        self
    }

    /// Quiet window as a [`Duration`]
    pub fn render_delay(&self) -> Duration {
        Duration::from_millis(self.render_delay_ms)
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TEXT_LAYER_MULTILINE`: `1`/`true` or `0`/`false` (default: true)
    /// - `TEXT_LAYER_RENDER_DELAY_MS`: quiet window in ms (default: 200)
    /// - `TEXT_LAYER_MAX_SPANS`: render pass ceiling (default: 100000)
    ///
    /// # Errors
    /// Returns an error if any variable holds an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("TEXT_LAYER_MULTILINE") {
            config.enable_multiline = match val.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(ConfigError::InvalidValue("TEXT_LAYER_MULTILINE".to_string())),
            };
        }

        if let Ok(val) = std::env::var("TEXT_LAYER_RENDER_DELAY_MS") {
            config.render_delay_ms = val
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TEXT_LAYER_RENDER_DELAY_MS".to_string()))?;
        }

        if let Ok(val) = std::env::var("TEXT_LAYER_MAX_SPANS") {
            config.max_spans_to_render = val
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TEXT_LAYER_MAX_SPANS".to_string()))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var("TEXT_LAYER_MULTILINE");
        std::env::remove_var("TEXT_LAYER_RENDER_DELAY_MS");
        std::env::remove_var("TEXT_LAYER_MAX_SPANS");
    }

    #[test]
    fn test_default_config() {
        let config = TextLayerConfig::default();
        assert!(config.enable_multiline);
        assert_eq!(config.render_delay(), Duration::from_millis(200));
        assert_eq!(config.max_spans_to_render, 100_000);
        assert_eq!(config.scroll_offset.top, -50.0);
        assert_eq!(config.scroll_offset.left, -400.0);
        assert!(!config.presentation_mode);
    }

    #[test]
    fn test_builder_methods() {
        let config = TextLayerConfig::new()
            .with_multiline(false)
            .with_render_delay(Duration::from_millis(50))
            .with_max_spans(10)
            .with_scroll_offset(-10.0, -20.0)
            .with_presentation_mode(true);

        assert!(!config.enable_multiline);
        assert_eq!(config.render_delay_ms, 50);
        assert_eq!(config.max_spans_to_render, 10);
        assert_eq!(config.scroll_offset, ScrollOffset { top: -10.0, left: -20.0 });
        assert!(config.presentation_mode);
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let config: TextLayerConfig =
            serde_json::from_str(r#"{"enable_multiline": false}"#).unwrap();
        assert!(!config.enable_multiline);
        assert_eq!(config.render_delay_ms, DEFAULT_RENDER_DELAY_MS);
        assert_eq!(config.max_spans_to_render, DEFAULT_MAX_SPANS_TO_RENDER);
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        assert_eq!(TextLayerConfig::from_env().unwrap(), TextLayerConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("TEXT_LAYER_MULTILINE", "off");
        std::env::set_var("TEXT_LAYER_RENDER_DELAY_MS", "350");
        std::env::set_var("TEXT_LAYER_MAX_SPANS", "5000");

        let config = TextLayerConfig::from_env().unwrap();
        clear_env();

        assert!(!config.enable_multiline);
        assert_eq!(config.render_delay_ms, 350);
        assert_eq!(config.max_spans_to_render, 5000);
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_value() {
        clear_env();
        std::env::set_var("TEXT_LAYER_RENDER_DELAY_MS", "soon");

        let result = TextLayerConfig::from_env();
        clear_env();

        assert_eq!(
            result,
            Err(ConfigError::InvalidValue("TEXT_LAYER_RENDER_DELAY_MS".to_string()))
        );
    }
}
