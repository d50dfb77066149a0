//! Signal extraction
//!
//! Normalizes either document shape into [`Signal`] records. Missing or
//! malformed fields fall back to defaults instead of failing: offset 0,
//! length 8, `mul` 1, `div` 1, `add` 0.

use super::document::CommandDocument;
use crate::types::{Formula, Result, Signal, UNKNOWN_ID, UNKNOWN_NAME};
use serde_json::Value;

/// Default bit offset when none is declared
pub const DEFAULT_BIT_OFFSET: usize = 0;

/// Default bit length when none is declared
pub const DEFAULT_BIT_LENGTH: usize = 8;

/// Extract the signal list from a command document
///
/// # Returns
/// * `Ok(signals)` in document order (empty if the document has neither
///   `signals` nor `parameters`)
/// * `Err(BitmapError::InvalidInput)` if the document is not a JSON object
pub fn extract(document: &Value) -> Result<Vec<Signal>> {
    let signals: Vec<Signal> = match CommandDocument::classify(document)? {
        CommandDocument::Signals(entries) => entries.iter().map(signal_from_fmt).collect(),
        CommandDocument::Parameters(entries) => entries.iter().map(signal_from_parameter).collect(),
        CommandDocument::Empty => Vec::new(),
    };

    log::debug!("Extracted {} signal(s) from command document", signals.len());
    Ok(signals)
}

/// `signals` entry: offsets and formula live under `fmt`
fn signal_from_fmt(entry: &Value) -> Signal {
    let fmt = entry.get("fmt");
    let field = |key: &str| fmt.and_then(|f| f.get(key));

    let declared_length = field("len").and_then(as_index);
    let formula = Formula {
        mul: field("mul").and_then(as_number).unwrap_or(1.0),
        div: field("div").and_then(as_number).unwrap_or(1.0),
        add: field("add").and_then(as_number).unwrap_or(0.0),
    };

    let (id, name) = identity(entry);
    Signal {
        id,
        name,
        bit_offset: field("bix").and_then(as_index).unwrap_or(DEFAULT_BIT_OFFSET),
        bit_length: declared_length.unwrap_or(DEFAULT_BIT_LENGTH),
        declared_length,
        suggested_metric: entry.get("suggestedMetric").and_then(as_text),
        formula,
    }
}

/// Legacy `parameters` entry: offsets on the entry itself
fn signal_from_parameter(entry: &Value) -> Signal {
    let declared_length = entry.get("bitLength").and_then(as_index);

    let (id, name) = identity(entry);
    Signal {
        id,
        name,
        bit_offset: entry
            .get("bitOffset")
            .and_then(as_index)
            .unwrap_or(DEFAULT_BIT_OFFSET),
        bit_length: declared_length.unwrap_or(DEFAULT_BIT_LENGTH),
        declared_length,
        suggested_metric: entry.get("suggestedMetric").and_then(as_text),
        formula: Formula::default(),
    }
}

/// Id falls back to `"unknown"`; name falls back to the id, then `"Unknown"`
fn identity(entry: &Value) -> (String, String) {
    let id = entry.get("id").and_then(as_text);
    let name = entry
        .get("name")
        .and_then(as_text)
        .or_else(|| id.clone())
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());

    (id.unwrap_or_else(|| UNKNOWN_ID.to_string()), name)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-negative integer, as a JSON number or numeric string
fn as_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| usize::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    }
}

/// Finite number, as a JSON number or numeric string
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BitmapError;
    use serde_json::json;

    #[test]
    fn test_extract_signals_shape() {
        let doc = json!({
            "signals": [
                {"id": "SPD", "name": "Speed", "suggestedMetric": "speed",
                 "fmt": {"bix": 8, "len": 16, "mul": 0.1, "div": 2, "add": -40}},
                {"id": "FLAG", "fmt": {"bix": 3, "len": 1}}
            ]
        });

        let signals = extract(&doc).unwrap();
        assert_eq!(signals.len(), 2);

        let speed = &signals[0];
        assert_eq!(speed.id, "SPD");
        assert_eq!(speed.name, "Speed");
        assert_eq!(speed.bit_offset, 8);
        assert_eq!(speed.bit_length, 16);
        assert_eq!(speed.declared_length, Some(16));
        assert_eq!(speed.suggested_metric.as_deref(), Some("speed"));
        assert_eq!(speed.formula, Formula::new(0.1, 2.0, -40.0));

        let flag = &signals[1];
        assert_eq!(flag.name, "FLAG");
        assert_eq!(flag.bit_length, 1);
        assert!(flag.formula.is_identity());
    }

    #[test]
    fn test_missing_fields_default() {
        let doc = json!({"signals": [{}, {"fmt": {"bix": -3, "len": "x", "mul": "2.5"}}]});
        let signals = extract(&doc).unwrap();

        assert_eq!(signals[0].id, "unknown");
        assert_eq!(signals[0].name, "Unknown");
        assert_eq!(signals[0].bit_offset, 0);
        assert_eq!(signals[0].bit_length, 8);
        assert_eq!(signals[0].declared_length, None);

        assert_eq!(signals[1].bit_offset, 0);
        assert_eq!(signals[1].bit_length, 8);
        assert_eq!(signals[1].formula.mul, 2.5);
    }

    #[test]
    fn test_name_falls_back_to_unknown_without_id() {
        let doc = json!({"parameters": [{"name": ""}]});
        let signals = extract(&doc).unwrap();
        assert_eq!(signals[0].id, "unknown");
        assert_eq!(signals[0].name, "Unknown");
    }

    #[test]
    fn test_extract_parameters_shape() {
        let doc = json!({
            "parameters": [
                {"id": "p1", "name": "Mode", "bitOffset": 4, "bitLength": 4},
                {"id": "p2", "bitOffset": "12"}
            ]
        });

        let signals = extract(&doc).unwrap();
        assert_eq!(signals[0].bit_offset, 4);
        assert_eq!(signals[0].bit_length, 4);
        assert_eq!(signals[1].bit_offset, 12);
        assert_eq!(signals[1].bit_length, 8);
        assert_eq!(signals[1].declared_length, None);
    }

    #[test]
    fn test_extract_empty_and_invalid() {
        assert!(extract(&json!({"hdr": "7E0"})).unwrap().is_empty());
        assert!(matches!(
            extract(&json!("not a command")),
            Err(BitmapError::InvalidInput(_))
        ));
    }
}
