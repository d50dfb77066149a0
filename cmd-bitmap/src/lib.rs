//! Command Bit Map Library
//!
//! Renders the byte/bit layout of a binary command: which bits belong to
//! which signal, one distinct color per signal, and a legend annotated with
//! linear-formula ranges (`value = raw * mul / div + add`).
//!
//! # Architecture
//!
//! The engine is synchronous and stateless:
//! - Extracts signals from a loosely-typed command document (JSON)
//! - Builds a bit index → signal lookup (overlaps resolve last-write-wins)
//! - Assigns golden-angle HSL colors per unique signal id
//! - Computes formula ranges and formula text
//! - Produces a structured layout and an HTML fragment from it
//!
//! The library does NOT:
//! - Decode payload bytes against the signal map
//! - Validate command definitions
//! - Persist anything between calls
//!
//! [`session::UpdateSession`] adds the host-facing coordination on top:
//! debounced re-renders, sample payload enrichment and supersession of
//! stale updates.
//!
//! # Example Usage
//!
//! ```
//! use cmd_bitmap::{extract, RenderConfig, Renderer};
//! use serde_json::json;
//!
//! let command = json!({
//!     "hdr": "7E0",
//!     "cmd": {"01": "0D"},
//!     "signals": [
//!         {"id": "SPEED", "name": "Vehicle speed", "fmt": {"bix": 0, "len": 8}}
//!     ]
//! });
//!
//! let signals = extract(&command).unwrap();
//! let renderer = Renderer::new(RenderConfig::new());
//!
//! let layout = renderer.layout(&signals).unwrap();
//! assert_eq!(layout.byte_count(), 1);
//!
//! let html = renderer.render(&command, &signals);
//! assert!(html.contains("Vehicle speed"));
//! ```

// Public modules
pub mod bitmap;
pub mod color;
pub mod config;
pub mod formula;
pub mod locate;
pub mod render;
pub mod session;
pub mod signals;
pub mod types;

// Re-export main types for convenience
pub use bitmap::{build_bit_map, unique_signals, BitMap};
pub use color::{assign_colors, contrast_text, Color, ColorAssignment, Rgb, TextColor};
pub use config::{IndexStyle, RenderConfig, SessionConfig};
pub use formula::{compute_range, describe, ValueRange};
pub use locate::{locate_command, CommandLookup};
pub use render::{alpha_index, BitmapLayout, LogObserver, RenderObserver, Renderer};
pub use session::{
    CancelTicket, DisplayMeta, DisplaySurface, NoSamples, SampleFetcher, UpdateOutcome,
    UpdateSession, UpdateTarget,
};
pub use signals::{derive_command_id, extract, CommandDocument};
pub use types::{BitmapError, Formula, Result, SamplePayload, Signal, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
