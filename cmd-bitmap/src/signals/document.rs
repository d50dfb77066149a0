//! Command document shapes
//!
//! A command document arrives as loosely-typed JSON. It is resolved once,
//! here, into one of the accepted shapes; everything downstream works on
//! the canonical [`Signal`](crate::types::Signal) list instead.

use crate::types::{BitmapError, Result};
use serde_json::{Map, Value};

/// The accepted shapes of a command document
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandDocument<'a> {
    /// `signals` array, each entry carrying a `fmt` descriptor
    Signals(&'a [Value]),
    /// Legacy `parameters` array with `bitOffset`/`bitLength` on each entry
    Parameters(&'a [Value]),
    /// Neither array is present
    Empty,
}

impl<'a> CommandDocument<'a> {
    /// Resolve the shape of a command document
    ///
    /// `signals` wins when both arrays are present. Only a non-object input
    /// is rejected.
    pub fn classify(value: &'a Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            BitmapError::InvalidInput(format!(
                "command document must be an object, got {}",
                json_kind(value)
            ))
        })?;

        if let Some(signals) = object.get("signals").and_then(Value::as_array) {
            Ok(CommandDocument::Signals(signals))
        } else if let Some(parameters) = object.get("parameters").and_then(Value::as_array) {
            Ok(CommandDocument::Parameters(parameters))
        } else {
            Ok(CommandDocument::Empty)
        }
    }

    /// Number of raw entries in the document
    pub fn len(&self) -> usize {
        match self {
            CommandDocument::Signals(entries) | CommandDocument::Parameters(entries) => {
                entries.len()
            }
            CommandDocument::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Derive the id used to look up sample payloads for a command
///
/// Joins the request header, the optional response header and the
/// concatenated `cmd` service/PID pairs with dots, uppercased:
/// `{"hdr": "7E0", "cmd": {"22": "1e1c"}}` becomes `7E0.221E1C`.
/// Returns `None` when `hdr` or `cmd` is missing.
pub fn derive_command_id(document: &Value) -> Option<String> {
    let object = document.as_object()?;
    let hdr = scalar_text(object.get("hdr")?)?;

    let cmd = match object.get("cmd")? {
        Value::Object(pairs) => command_pairs(pairs),
        other => scalar_text(other)?,
    };
    if cmd.is_empty() {
        return None;
    }

    let mut parts = vec![hdr];
    if let Some(rax) = object.get("rax").and_then(scalar_text) {
        parts.push(rax);
    }
    parts.push(cmd);

    Some(parts.join(".").to_uppercase())
}

fn command_pairs(pairs: &Map<String, Value>) -> String {
    pairs
        .iter()
        .filter_map(|(service, pid)| scalar_text(pid).map(|pid| format!("{}{}", service, pid)))
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
