//! HTML page output
//!
//! `PageSurface` is the CLI's display surface. It keeps one section per
//! display id, so an enriched render replaces the base render of the same
//! command, and writes them all out as a standalone page.

use chrono::Utc;
use cmd_bitmap::render::html::escape;
use cmd_bitmap::{DisplayMeta, DisplaySurface};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::io::Write;

#[derive(Default)]
pub struct PageSurface {
    sections: Mutex<IndexMap<String, (DisplayMeta, String)>>,
}

impl PageSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed sections in first-shown order
    pub fn sections(&self) -> Vec<(DisplayMeta, String)> {
        self.sections.lock().values().cloned().collect()
    }

    /// Write the standalone page
    pub fn write_page<W: Write>(&self, out: &mut W, title: &str) -> std::io::Result<()> {
        writeln!(out, "<!DOCTYPE html>")?;
        writeln!(
            out,
            "<html><head><meta charset=\"utf-8\"><title>{}</title></head>",
            escape(title)
        )?;
        writeln!(out, "<body style=\"font-family:sans-serif;\">")?;
        writeln!(out, "<h1>{}</h1>", escape(title))?;

        for (meta, markup) in self.sections() {
            writeln!(out, "<section id=\"{}\">", escape(&meta.id))?;
            writeln!(out, "<h2>{}</h2>", escape(&meta.title))?;
            out.write_all(markup.as_bytes())?;
            writeln!(out, "</section>")?;
        }

        writeln!(
            out,
            "<footer style=\"color:#888;font-size:0.8em;\">Generated {} by cmd-bitmap v{}</footer>",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
            cmd_bitmap::VERSION
        )?;
        writeln!(out, "</body></html>")
    }
}

impl DisplaySurface for PageSurface {
    fn show(&self, markup: &str, meta: &DisplayMeta) {
        self.sections
            .lock()
            .insert(meta.id.clone(), (meta.clone(), markup.to_string()));
    }
}
