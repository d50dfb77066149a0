//! Bit map renderer
//!
//! The renderer is fail-soft: [`Renderer::render`] and friends always
//! return markup. A command without signals gets the "no signals"
//! placeholder; any failure along the way is reported to the
//! [`RenderObserver`] and replaced by the error placeholder.

pub mod html;
pub mod index;
pub mod layout;

pub use index::{alpha_bit_label, alpha_index};
pub use layout::{build_layout, BitmapLayout, ByteRow, Cell, CellOwner, LegendEntry};

use crate::color::Color;
use crate::config::RenderConfig;
use crate::signals::{derive_command_id, extract};
use crate::types::{BitmapError, Result, SamplePayload, Signal};
use serde_json::Value;
use std::sync::Arc;

/// Receives render failures that were turned into placeholders
pub trait RenderObserver: Send + Sync {
    fn render_failed(&self, error: &BitmapError);
}

/// Reports render failures through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl RenderObserver for LogObserver {
    fn render_failed(&self, error: &BitmapError) {
        log::error!("Bit map render failed: {}", error);
    }
}

/// Stateless renderer: configuration plus the failure observer
#[derive(Clone)]
pub struct Renderer {
    config: RenderConfig,
    observer: Arc<dyn RenderObserver>,
}

impl Renderer {
    /// Create a renderer that logs failures
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            observer: Arc::new(LogObserver),
        }
    }

    /// Builder method: report failures to a custom observer
    pub fn with_observer(mut self, observer: Arc<dyn RenderObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Structured layout for a signal list
    pub fn layout(&self, signals: &[Signal]) -> Result<BitmapLayout> {
        build_layout(signals, self.config.max_bytes)
    }

    /// Markup for an already extracted signal list
    ///
    /// The document only supplies the header (its derived command id).
    pub fn render(&self, document: &Value, signals: &[Signal]) -> String {
        self.render_with_samples(document, signals, &[])
    }

    /// Markup including a sample-response section
    pub fn render_with_samples(
        &self,
        document: &Value,
        signals: &[Signal],
        samples: &[SamplePayload],
    ) -> String {
        if signals.is_empty() {
            log::debug!("No signals to render");
            return html::no_signals_placeholder();
        }

        let header = derive_command_id(document);
        match self.try_render(signals, header.as_deref(), samples) {
            Ok(markup) => markup,
            Err(e) => self.fail(&e),
        }
    }

    /// Extract and render in one step
    pub fn render_document(&self, document: &Value) -> String {
        match extract(document) {
            Ok(signals) => self.render(document, &signals),
            Err(e) => self.fail(&e),
        }
    }

    /// Error placeholder for a failure, reported to the observer
    pub fn fail(&self, error: &BitmapError) -> String {
        self.observer.render_failed(error);
        html::error_placeholder(&error.to_string())
    }

    fn try_render(
        &self,
        signals: &[Signal],
        header: Option<&str>,
        samples: &[SamplePayload],
    ) -> Result<String> {
        let empty_background: Color = self.config.empty_cell_background.parse()?;
        let layout = self.layout(signals)?;

        log::debug!(
            "Rendering {} byte row(s), {} legend entr(ies), {} sample(s)",
            layout.byte_count(),
            layout.legend.len(),
            samples.len()
        );

        Ok(html::write_layout(
            &layout,
            &self.config,
            &empty_background,
            header,
            samples,
        ))
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
