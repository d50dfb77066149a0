//! Rendering-agnostic layout
//!
//! A [`BitmapLayout`] carries everything a front end needs to draw the
//! grid and legend: per-cell ownership and colors, both label forms for
//! every row and bit, and the legend entries in unique-signal order.

use super::index::{alpha_bit_label, alpha_index};
use crate::bitmap::{build_bit_map, unique_signals};
use crate::color::{assign_colors, contrast_text, Color, TextColor};
use crate::formula::{compute_range, describe, ValueRange};
use crate::types::{BitmapError, Result, Signal};
use serde::Serialize;

/// Bits per grid row
pub const BITS_PER_BYTE: usize = 8;

/// Longest id used verbatim as the legend short label
pub const SHORT_LABEL_MAX: usize = 10;

/// The full grid + legend description of one command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BitmapLayout {
    pub rows: Vec<ByteRow>,
    pub legend: Vec<LegendEntry>,
}

impl BitmapLayout {
    /// Number of byte rows in the grid
    pub fn byte_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell for an absolute bit index
    pub fn cell(&self, bit: usize) -> Option<&Cell> {
        self.rows
            .get(bit / BITS_PER_BYTE)
            .and_then(|row| row.cells.get(bit % BITS_PER_BYTE))
    }
}

/// One byte of the payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ByteRow {
    /// Zero-based byte index
    pub index: usize,
    /// Numeric label form (`"0"`, `"1"`, ...)
    pub numeric_label: String,
    /// Alphabetic label form (`"A"`, `"B"`, ...)
    pub alpha_label: String,
    /// Eight cells, column 0 to 7 left to right
    pub cells: Vec<Cell>,
}

/// One bit of the payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    /// Absolute bit index (`byte * 8 + column`)
    pub bit: usize,
    /// Column within the byte, 0..=7
    pub column: usize,
    /// Alphabetic bit label (row letters + column)
    pub alpha_label: String,
    /// Owning signal, `None` for unowned bits
    pub owner: Option<CellOwner>,
}

/// Ownership and styling of an owned cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellOwner {
    pub signal_id: String,
    #[serde(serialize_with = "serialize_display")]
    pub color: Color,
    #[serde(serialize_with = "serialize_display")]
    pub text: TextColor,
}

/// One legend line per unique signal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub id: String,
    /// Id-derived label shown on the color swatch
    pub short_label: String,
    /// Full display name (unescaped)
    pub name: String,
    /// `"start-end"` or `"start"`
    pub bit_range: String,
    /// Formula text, `None` for the identity formula
    pub formula: Option<String>,
    /// Displayed value range, `None` when it cannot be computed
    #[serde(serialize_with = "serialize_opt_display")]
    pub range: Option<ValueRange>,
    /// Suggested metric tag (unescaped)
    pub metric: Option<String>,
    #[serde(serialize_with = "serialize_display")]
    pub color: Color,
    #[serde(serialize_with = "serialize_display")]
    pub text: TextColor,
}

/// Lay out the grid and legend for a signal list
///
/// Fails with [`BitmapError::Render`] when a signal's range overflows or the
/// payload would exceed `max_bytes`.
pub fn build_layout(signals: &[Signal], max_bytes: usize) -> Result<BitmapLayout> {
    let mut max_bit_range = 0usize;
    for signal in signals {
        let end = signal.end_bit().ok_or_else(|| {
            BitmapError::Render(format!(
                "signal '{}' range {}+{} overflows",
                signal.id, signal.bit_offset, signal.bit_length
            ))
        })?;
        max_bit_range = max_bit_range.max(end);
    }

    let byte_count = max_bit_range.div_ceil(BITS_PER_BYTE).max(1);
    if byte_count > max_bytes {
        return Err(BitmapError::Render(format!(
            "payload spans {} bytes, limit is {}",
            byte_count, max_bytes
        )));
    }

    let bit_map = build_bit_map(signals);
    let colors = assign_colors(signals);
    let style_of = |id: &str| -> Result<(Color, TextColor)> {
        let color = *colors
            .get(id)
            .ok_or_else(|| BitmapError::Render(format!("no color assigned to signal '{}'", id)))?;
        Ok((color, contrast_text(&color)))
    };

    let mut rows = Vec::with_capacity(byte_count);
    for byte in 0..byte_count {
        let mut cells = Vec::with_capacity(BITS_PER_BYTE);
        for column in 0..BITS_PER_BYTE {
            let bit = byte * BITS_PER_BYTE + column;
            let owner = match bit_map.owner(bit) {
                Some(index) => {
                    let signal_id = signals[index].id.clone();
                    let (color, text) = style_of(&signal_id)?;
                    Some(CellOwner {
                        signal_id,
                        color,
                        text,
                    })
                }
                None => None,
            };
            cells.push(Cell {
                bit,
                column,
                alpha_label: alpha_bit_label(byte, column),
                owner,
            });
        }
        rows.push(ByteRow {
            index: byte,
            numeric_label: byte.to_string(),
            alpha_label: alpha_index(byte),
            cells,
        });
    }

    let legend = unique_signals(signals)
        .into_iter()
        .map(|signal| {
            let (color, text) = style_of(&signal.id)?;
            Ok(LegendEntry {
                id: signal.id.clone(),
                short_label: short_label(&signal.id),
                name: signal.name.clone(),
                bit_range: signal.bit_range_label(),
                formula: describe(&signal.formula),
                range: compute_range(signal),
                metric: signal.suggested_metric.clone(),
                color,
                text,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(BitmapLayout { rows, legend })
}

/// The id itself when short, otherwise its head with an ellipsis
pub fn short_label(id: &str) -> String {
    if id.chars().count() <= SHORT_LABEL_MAX {
        id.to_string()
    } else {
        let head: String = id.chars().take(SHORT_LABEL_MAX - 1).collect();
        format!("{}\u{2026}", head)
    }
}

fn serialize_display<T, S>(value: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    T: std::fmt::Display,
    S: serde::Serializer,
{
    serializer.collect_str(value)
}

fn serialize_opt_display<T, S>(
    value: &Option<T>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    T: std::fmt::Display,
    S: serde::Serializer,
{
    match value {
        Some(v) => serializer.collect_str(v),
        None => serializer.serialize_none(),
    }
}
