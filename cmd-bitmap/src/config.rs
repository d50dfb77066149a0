//! Renderer and session configuration types
//!
//! Both structs deserialize from partial documents: every field has a
//! default, so an empty `[render]` or `[session]` table is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which row/bit label form is shown initially
///
/// Both forms are always emitted; this only picks the one visible first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStyle {
    /// Zero-based numeric row index
    #[default]
    Numeric,
    /// Bijective base-26 row index (A, B, ..., Z, AA, ...)
    Alpha,
}

/// Configuration for the renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Label form shown first
    #[serde(default)]
    pub index_style: IndexStyle,

    /// Show the formula text in legend entries
    #[serde(default = "default_true")]
    pub show_formula: bool,

    /// Show the computed min/max range in legend entries
    #[serde(default = "default_true")]
    pub show_range: bool,

    /// Show the suggested metric tag in legend entries
    #[serde(default = "default_true")]
    pub show_metric: bool,

    /// Background of bits no signal owns (any CSS hex, rgb() or hsl() color)
    #[serde(default = "default_empty_background")]
    pub empty_cell_background: String,

    /// Largest payload (in bytes) the grid will lay out
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            index_style: IndexStyle::default(),
            show_formula: true,
            show_range: true,
            show_metric: true,
            empty_cell_background: default_empty_background(),
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_empty_background() -> String {
    "#f3f3f3".to_string()
}

fn default_max_bytes() -> usize {
    4096
}

impl RenderConfig {
    /// Create a render configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the initial label form
    pub fn with_index_style(mut self, style: IndexStyle) -> Self {
        self.index_style = style;
        self
    }

    /// Builder method: toggle formula text
    pub fn with_formula(mut self, enabled: bool) -> Self {
        self.show_formula = enabled;
        self
    }

    /// Builder method: toggle range text
    pub fn with_range(mut self, enabled: bool) -> Self {
        self.show_range = enabled;
        self
    }

    /// Builder method: toggle metric tags
    pub fn with_metric(mut self, enabled: bool) -> Self {
        self.show_metric = enabled;
        self
    }

    /// Builder method: set the background for unowned bits
    pub fn with_empty_cell_background(mut self, color: impl Into<String>) -> Self {
        self.empty_cell_background = color.into();
        self
    }

    /// Builder method: set the largest payload size laid out
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

/// Configuration for the update session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Quiescence window before a requested update runs (default: 150ms)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    150
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the debounce window
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_config_builder() {
        let config = RenderConfig::new()
            .with_index_style(IndexStyle::Alpha)
            .with_formula(false)
            .with_empty_cell_background("#000")
            .with_max_bytes(16);

        assert_eq!(config.index_style, IndexStyle::Alpha);
        assert!(!config.show_formula);
        assert!(config.show_range);
        assert_eq!(config.empty_cell_background, "#000");
        assert_eq!(config.max_bytes, 16);
    }

    #[test]
    fn test_partial_deserialization() {
        let config: RenderConfig = serde_json::from_str(r#"{"index_style": "alpha"}"#).unwrap();
        assert_eq!(config.index_style, IndexStyle::Alpha);
        assert!(config.show_metric);
        assert_eq!(config.max_bytes, 4096);

        let session: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(session.debounce(), Duration::from_millis(150));
    }
}
