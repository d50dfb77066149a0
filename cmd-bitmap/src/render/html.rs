//! Markup output
//!
//! Writes a [`BitmapLayout`] as an HTML fragment with inline styles. Row
//! and bit labels carry both forms in `data-numeric`/`data-alpha`
//! attributes so a host can switch between them without re-rendering.

use super::layout::{BitmapLayout, Cell, LegendEntry};
use crate::color::Color;
use crate::config::{IndexStyle, RenderConfig};
use crate::types::SamplePayload;
use std::fmt::Write;

const CELL_STYLE: &str = "width:2.2em;height:2.2em;text-align:center;font-family:monospace;border:1px solid #ccc;";

/// Escape text for use in element content and quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Placeholder for a command without signals
pub fn no_signals_placeholder() -> String {
    "<div class=\"bitmap bitmap-empty\" style=\"padding:1em;color:#666;font-style:italic;\">No signals defined for this command.</div>".to_string()
}

/// Placeholder shown in place of a failed render
pub fn error_placeholder(message: &str) -> String {
    format!(
        "<div class=\"bitmap bitmap-error\" style=\"padding:1em;color:#b00020;\">Unable to render bit map: {}</div>",
        escape(message)
    )
}

/// Write the full fragment: header, grid, legend and optional samples
pub fn write_layout(
    layout: &BitmapLayout,
    config: &RenderConfig,
    empty_background: &Color,
    header: Option<&str>,
    samples: &[SamplePayload],
) -> String {
    let mut out = String::new();
    let style = match config.index_style {
        IndexStyle::Numeric => "numeric",
        IndexStyle::Alpha => "alpha",
    };

    // Writing into a String cannot fail
    let _ = writeln!(out, "<div class=\"bitmap\" data-index-style=\"{}\">", style);
    if let Some(header) = header {
        let _ = writeln!(
            out,
            "<div class=\"bitmap-header\" style=\"font-weight:bold;margin-bottom:0.5em;\">{}</div>",
            escape(header)
        );
    }

    write_grid(&mut out, layout, config.index_style, empty_background);
    write_legend(&mut out, layout, config);
    if !samples.is_empty() {
        write_samples(&mut out, samples);
    }

    out.push_str("</div>\n");
    out
}

fn write_grid(
    out: &mut String,
    layout: &BitmapLayout,
    style: IndexStyle,
    empty_background: &Color,
) {
    out.push_str("<table class=\"bitmap-grid\" style=\"border-collapse:collapse;\">\n");
    for row in &layout.rows {
        let shown = match style {
            IndexStyle::Numeric => &row.numeric_label,
            IndexStyle::Alpha => &row.alpha_label,
        };
        let _ = write!(
            out,
            "<tr><th class=\"byte-label\" data-numeric=\"{}\" data-alpha=\"{}\" style=\"padding:0 0.5em;font-family:monospace;\">{}</th>",
            row.numeric_label, row.alpha_label, shown
        );
        for cell in &row.cells {
            write_cell(out, cell, style, empty_background);
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
}

fn write_cell(out: &mut String, cell: &Cell, style: IndexStyle, empty_background: &Color) {
    let shown = match style {
        IndexStyle::Numeric => cell.bit.to_string(),
        IndexStyle::Alpha => cell.alpha_label.clone(),
    };
    match &cell.owner {
        Some(owner) => {
            let _ = write!(
                out,
                "<td class=\"bit owned\" data-numeric=\"{}\" data-alpha=\"{}\" data-signal=\"{}\" style=\"{}background-color:{};color:{};\">{}</td>",
                cell.bit,
                cell.alpha_label,
                escape(&owner.signal_id),
                CELL_STYLE,
                owner.color,
                owner.text,
                shown
            );
        }
        None => {
            let _ = write!(
                out,
                "<td class=\"bit\" data-numeric=\"{}\" data-alpha=\"{}\" style=\"{}background-color:{};color:#999;\">{}</td>",
                cell.bit, cell.alpha_label, CELL_STYLE, empty_background, shown
            );
        }
    }
}

fn write_legend(out: &mut String, layout: &BitmapLayout, config: &RenderConfig) {
    out.push_str("<ul class=\"bitmap-legend\" style=\"list-style:none;padding:0;\">\n");
    for entry in &layout.legend {
        write_legend_entry(out, entry, config);
    }
    out.push_str("</ul>\n");
}

fn write_legend_entry(out: &mut String, entry: &LegendEntry, config: &RenderConfig) {
    let _ = write!(
        out,
        "<li class=\"legend-entry\" data-signal=\"{}\" style=\"margin:0.25em 0;\">",
        escape(&entry.id)
    );
    let _ = write!(
        out,
        "<span class=\"legend-swatch\" style=\"display:inline-block;padding:0 0.4em;margin-right:0.5em;font-family:monospace;background-color:{};color:{};\">{}</span>",
        entry.color,
        entry.text,
        escape(&entry.short_label)
    );
    let _ = write!(out, "<span class=\"legend-name\">{}</span> ", escape(&entry.name));
    let _ = write!(
        out,
        "<span class=\"legend-bits\" style=\"color:#666;\">bits {}</span>",
        entry.bit_range
    );

    if config.show_formula {
        if let Some(formula) = &entry.formula {
            let _ = write!(
                out,
                " <span class=\"legend-formula\" style=\"font-family:monospace;\">{}</span>",
                escape(formula)
            );
        }
    }
    if config.show_range {
        if let Some(range) = &entry.range {
            let _ = write!(out, " <span class=\"legend-range\">({})</span>", range);
        }
    }
    if config.show_metric {
        if let Some(metric) = &entry.metric {
            let _ = write!(
                out,
                " <span class=\"legend-metric\" style=\"font-size:0.85em;color:#666;\">[{}]</span>",
                escape(metric)
            );
        }
    }

    out.push_str("</li>\n");
}

fn write_samples(out: &mut String, samples: &[SamplePayload]) {
    out.push_str("<div class=\"bitmap-samples\">\n<div class=\"samples-title\" style=\"font-weight:bold;\">Sample responses</div>\n");
    for sample in samples {
        let _ = writeln!(
            out,
            "<code class=\"sample\" style=\"display:block;\">{}</code>",
            escape(&sample.to_string())
        );
    }
    out.push_str("</div>\n");
}
