//! Core types for the command bit map renderer
//!
//! This module defines the canonical signal record every component works on,
//! the linear formula attached to it, the sample payloads used for display
//! enrichment, and the library error type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used for sample payloads
pub type Timestamp = DateTime<Utc>;

/// Result type for bit map operations
pub type Result<T> = std::result::Result<T, BitmapError>;

/// Sentinel id for signals that do not declare one
pub const UNKNOWN_ID: &str = "unknown";

/// Sentinel name for signals that declare neither a name nor an id
pub const UNKNOWN_NAME: &str = "Unknown";

/// A named bit range within a command's payload
///
/// Signals are derived fresh from a command document on every extraction
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Stable identifier, unique within a command (`"unknown"` if absent)
    pub id: String,
    /// Display label (falls back to the id, then `"Unknown"`)
    pub name: String,
    /// Zero-based index of the first bit, counted from the start of the payload
    pub bit_offset: usize,
    /// Number of consecutive bits starting at `bit_offset`
    pub bit_length: usize,
    /// Bit length exactly as declared; `None` when the document omitted it
    pub declared_length: Option<usize>,
    /// Free-text classification tag, display only
    pub suggested_metric: Option<String>,
    /// Linear transform from raw value to displayed value
    pub formula: Formula,
}

impl Signal {
    /// Create a signal with default formula and no metric tag
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        bit_offset: usize,
        bit_length: usize,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bit_offset,
            bit_length,
            declared_length: Some(bit_length),
            suggested_metric: None,
            formula: Formula::default(),
        }
    }

    /// Builder method: set the linear formula
    pub fn with_formula(mut self, formula: Formula) -> Self {
        self.formula = formula;
        self
    }

    /// Builder method: set the suggested metric tag
    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.suggested_metric = Some(metric.into());
        self
    }

    /// Exclusive end bit (`bit_offset + bit_length`), `None` on overflow
    pub fn end_bit(&self) -> Option<usize> {
        self.bit_offset.checked_add(self.bit_length)
    }

    /// Bit range label: `"start-end"` for multi-bit signals, `"start"` otherwise
    pub fn bit_range_label(&self) -> String {
        if self.bit_length > 1 {
            let last = self.bit_offset.saturating_add(self.bit_length - 1);
            format!("{}-{}", self.bit_offset, last)
        } else {
            self.bit_offset.to_string()
        }
    }
}

/// Linear formula `x = raw * mul / div + add`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub mul: f64,
    pub div: f64,
    pub add: f64,
}

impl Default for Formula {
    fn default() -> Self {
        Self {
            mul: 1.0,
            div: 1.0,
            add: 0.0,
        }
    }
}

impl Formula {
    /// Create a formula from its three parameters
    pub fn new(mul: f64, div: f64, add: f64) -> Self {
        Self { mul, div, add }
    }

    /// True if all three parameters are at their defaults
    pub fn is_identity(&self) -> bool {
        self.mul == 1.0 && self.div == 1.0 && self.add == 0.0
    }

    /// Apply the formula to a raw value
    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.mul / self.div + self.add
    }
}

/// An example raw payload returned by a sample fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePayload {
    /// When the sample was captured (if known)
    pub received_at: Option<Timestamp>,
    /// Raw payload bytes
    pub bytes: Vec<u8>,
}

impl SamplePayload {
    /// Create a sample without a capture time
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            received_at: None,
            bytes,
        }
    }

    /// Parse a hex string such as `"41 0D 32"` or `"410D32"`
    pub fn from_hex(text: &str) -> Result<Self> {
        let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.len() % 2 != 0 {
            return Err(BitmapError::InvalidInput(format!(
                "odd number of hex digits in sample: {:?}",
                text
            )));
        }

        let mut bytes = Vec::with_capacity(digits.len() / 2);
        for pair in digits.chunks(2) {
            let hi = pair[0].to_digit(16);
            let lo = pair[1].to_digit(16);
            match (hi, lo) {
                (Some(hi), Some(lo)) => bytes.push((hi * 16 + lo) as u8),
                _ => {
                    return Err(BitmapError::InvalidInput(format!(
                        "invalid hex digits {}{} in sample",
                        pair[0], pair[1]
                    )))
                }
            }
        }

        Ok(Self::new(bytes))
    }

    /// Builder method: set the capture time
    pub fn with_timestamp(mut self, received_at: Timestamp) -> Self {
        self.received_at = Some(received_at);
        self
    }

    /// Uppercase hex bytes separated by spaces
    pub fn to_hex(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for SamplePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.received_at {
            Some(ts) => write!(f, "{} {}", ts.to_rfc3339(), self.to_hex()),
            None => write!(f, "{}", self.to_hex()),
        }
    }
}

/// Errors that can occur while extracting, rendering, or updating
#[derive(Debug, thiserror::Error)]
pub enum BitmapError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Sample fetch failed: {0}")]
    Fetch(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl BitmapError {
    /// True for expected supersession, as opposed to a real failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BitmapError::Cancelled)
    }
}
