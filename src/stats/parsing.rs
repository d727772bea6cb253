use serde_json::Value;

use crate::gateway::RawDocument;

/// Best-effort numeric parse of an upstream field.
///
/// Accepts JSON numbers and strings such as `"1,25"`, `" 48 %"` or
/// `"0.93"`. Anything else, including non-finite results, is `None`.
pub fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_numeric_str(s),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Like `parse_number`, but values outside 0-100 are rejected
pub fn parse_percent(value: &Value) -> Option<f64> {
    parse_number(value).filter(|v| (0.0..=100.0).contains(v))
}

fn parse_numeric_str(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Typed, alias-aware lookups over a loosely shaped document
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    document: &'a RawDocument,
}

impl<'a> FieldReader<'a> {
    pub fn new(document: &'a RawDocument) -> Self {
        Self { document }
    }

    /// Reader over `document[key]` when it is an object
    pub fn nested(&self, key: &str) -> Option<FieldReader<'a>> {
        match self.document.get(key) {
            Some(Value::Object(inner)) => Some(FieldReader::new(inner)),
            _ => None,
        }
    }

    /// Follows a chain of object keys
    pub fn path(&self, keys: &[&str]) -> Option<FieldReader<'a>> {
        keys.iter()
            .try_fold(*self, |reader, key| reader.nested(key))
    }

    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.document.get(key)
    }

    /// First alias that parses as a number
    pub fn number(&self, aliases: &[&str]) -> Option<f64> {
        aliases
            .iter()
            .find_map(|key| self.document.get(*key).and_then(parse_number))
    }

    /// First alias that parses as a percentage within 0-100
    pub fn percent(&self, aliases: &[&str]) -> Option<f64> {
        aliases
            .iter()
            .find_map(|key| self.document.get(*key).and_then(parse_percent))
    }

    /// First alias holding a non-empty string (numbers are stringified)
    pub fn text(&self, aliases: &[&str]) -> Option<String> {
        aliases.iter().find_map(|key| match self.document.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }
}
