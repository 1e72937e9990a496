//! Structured Output Recovery
//!
//! Models are asked for raw JSON but routinely wrap it in prose or Markdown
//! fences, or trail off mid-object. `recover` runs an ordered list of pure
//! `text -> Option<Value>` attempts and stops at the first one that yields a
//! value of the expected shape:
//!
//! 1. `direct` - the whole (trimmed) text parses as JSON
//! 2. `fenced` - the body of a ```` ``` ```` block parses as JSON
//! 3. `balanced_span` - the first delimiter-balanced `{...}` / `[...]` span parses as JSON
//!
//! Recovery never fails loudly: total failure is reported as
//! [`Recovered::Unrecovered`] carrying the original text.

use serde_json::Value;
use tracing::debug;

/// Expected top-level JSON shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Object,
    Array,
}

impl JsonShape {
    fn open(self) -> u8 {
        match self {
            JsonShape::Object => b'{',
            JsonShape::Array => b'[',
        }
    }

    /// Whether a parsed value has this shape.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            JsonShape::Object => value.is_object(),
            JsonShape::Array => value.is_array(),
        }
    }
}

/// Outcome of a recovery run.
#[derive(Debug, Clone, PartialEq)]
pub enum Recovered {
    /// A value of the requested shape was found.
    Parsed(Value),
    /// Every stage failed; the raw text is kept for diagnostics.
    Unrecovered(String),
}

impl Recovered {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Recovered::Parsed(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Recovered::Parsed(value) => Some(value),
            Recovered::Unrecovered(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Recovered::Parsed(value) => Some(value),
            Recovered::Unrecovered(_) => None,
        }
    }
}

type Attempt = fn(&str, JsonShape) -> Option<Value>;

const STAGES: [(&str, Attempt); 3] = [
    ("direct", parse_direct),
    ("fenced", parse_fenced),
    ("balanced_span", parse_balanced_span),
];

/// Recover a JSON value of the given shape from raw model text.
pub fn recover(raw: &str, shape: JsonShape) -> Recovered {
    for (stage, attempt) in STAGES {
        if let Some(value) = attempt(raw, shape) {
            debug!(stage, ?shape, len = raw.len(), "structured_output: recovered value");
            return Recovered::Parsed(value);
        }
    }
    debug!(?shape, len = raw.len(), "structured_output: no stage recovered a value");
    Recovered::Unrecovered(raw.to_string())
}

fn parse_direct(text: &str, shape: JsonShape) -> Option<Value> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    shape.matches(&value).then_some(value)
}

fn parse_fenced(text: &str, shape: JsonShape) -> Option<Value> {
    fenced_blocks(text)
        .into_iter()
        .find_map(|body| parse_direct(body, shape))
}

fn parse_balanced_span(text: &str, shape: JsonShape) -> Option<Value> {
    balanced_spans(text, shape).find_map(|span| parse_direct(span, shape))
}

/// Bodies of the Markdown code fences in `text`, without the optional
/// language tag. An unterminated fence yields everything after the opener.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("```") {
        let after_fence = &rest[start + 3..];
        let body_start = match after_fence.find('\n') {
            Some(nl) if is_language_tag(&after_fence[..nl]) => nl + 1,
            _ => 0,
        };
        let body = &after_fence[body_start..];
        match body.find("```") {
            Some(end) => {
                blocks.push(body[..end].trim());
                rest = &body[end + 3..];
            }
            None => {
                blocks.push(body.trim());
                break;
            }
        }
    }

    blocks
}

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
}

/// Delimiter-balanced spans that open with the shape's delimiter (`{` or
/// `[`), in order of their start. Nested delimiters and string literals
/// (including escaped quotes) are tracked so braces inside strings do not
/// count.
fn balanced_spans(text: &str, shape: JsonShape) -> impl Iterator<Item = &str> {
    let open = shape.open();
    text.bytes()
        .enumerate()
        .filter(move |(_, b)| *b == open)
        .filter_map(move |(start, _)| span_end(text, start).map(|end| &text[start..=end]))
}

/// Scan forward from an opening delimiter and return the byte index of its
/// matching close. Mismatched closers abandon the candidate.
fn span_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }

    None
}
