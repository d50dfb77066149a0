//! Command locator
//!
//! Given the text of a JSON signal-set file and a byte offset into it,
//! finds the innermost enclosing object that is a command definition (an
//! object with a `signals` or `parameters` array).

use serde_json::Value;

/// Result of looking up the command under a text position
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandLookup {
    pub is_command: bool,
    /// The parsed command object when `is_command` is true
    pub command: Option<Value>,
    /// Byte span of the command object in the text
    pub span: Option<(usize, usize)>,
}

impl CommandLookup {
    fn found(command: Value, span: (usize, usize)) -> Self {
        Self {
            is_command: true,
            command: Some(command),
            span: Some(span),
        }
    }
}

/// Find the command definition enclosing `offset`
pub fn locate_command(text: &str, offset: usize) -> CommandLookup {
    let mut spans: Vec<(usize, usize)> = object_spans(text)
        .into_iter()
        .filter(|(start, end)| *start <= offset && offset < *end)
        .collect();

    // Innermost first
    spans.sort_by(|a, b| b.0.cmp(&a.0));

    for (start, end) in spans {
        let Ok(value) = serde_json::from_str::<Value>(&text[start..end]) else {
            continue;
        };
        if is_command(&value) {
            log::debug!("Command found at {}..{} for offset {}", start, end, offset);
            return CommandLookup::found(value, (start, end));
        }
    }

    CommandLookup::default()
}

/// True for objects carrying a `signals` or `parameters` array
pub fn is_command(value: &Value) -> bool {
    ["signals", "parameters"]
        .iter()
        .any(|key| value.get(key).map_or(false, Value::is_array))
}

/// Byte spans `[start, end)` of every balanced `{...}` outside strings
fn object_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, byte) in text.bytes().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => open.push(i),
            b'}' => {
                if let Some(start) = open.pop() {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }

    spans
}
